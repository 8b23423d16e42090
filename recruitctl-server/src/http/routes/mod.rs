//! Route handlers organized by resource

pub mod contacts;
pub mod crud;
pub mod entities;
pub mod health;
pub mod import_jobs;
pub mod leads;
