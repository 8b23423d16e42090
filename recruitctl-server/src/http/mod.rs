//! HTTP server layer
//!
//! Axum server with:
//! - Generic CRUD, query and facet routes per entity
//! - CORS (localhost only by default)
//! - Request tracing
//! - Graceful shutdown
//! - JSON error responses

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{app, run_server, shutdown_signal, AppState, ServerConfig, ServerError};
