//! Database layer: connection pool, generic entity repository, per-entity repos
//!
//! - Connection pool (max 5 connections by default)
//! - List and get read through one JOINed SELECT per entity, no N+1
//! - Multi-step writes and their invariant checks share one transaction
//! - Soft-deleted rows are invisible to every read and update

pub mod entity;
pub mod pool;
pub mod query;
pub mod repos;

pub use entity::{
    require_live, DbError, Entity, EntityRepo, EntityWrite, Payload, SqlValue, Values,
};
pub use pool::{create_pool, create_pool_with_options, migrate, DEFAULT_MAX_CONNECTIONS};
