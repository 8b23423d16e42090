//! recruitctl-server: HTTP API and Postgres layer for the recruiting back office
//!
//! - `db`: pool, migrations, generic entity repository, per-entity repos
//! - `http`: axum routes, extractors, JSON errors, server lifecycle
//! - `models`: pagination, patch fields, validation
//! - `worker`: coach spreadsheet import worker

pub mod db;
pub mod http;
pub mod models;
pub mod worker;

/// Bundled schema migrations
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../migrations");

pub use db::{create_pool, create_pool_with_options, migrate, DbError};
pub use http::{run_server, ApiError, AppState, ServerConfig, ServerError};
pub use worker::{ImportWorker, JobOutcome, WorkerError};
