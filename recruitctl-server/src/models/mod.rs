//! Request payload helpers with validation at construction
//!
//! Create and patch payloads are plain serde structs; each one turns itself
//! into column values through the helpers in `fields`, returning
//! `ValidationError` for bad input.

pub mod fields;
pub mod pagination;
pub mod patch;
pub mod validation;

pub use pagination::{Paginated, Pagination};
pub use patch::nullable;
pub use validation::ValidationError;
