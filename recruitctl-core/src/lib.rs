//! recruitctl-core: domain logic shared by the server, bot and CLI
//!
//! - `filters`: column registry, filter descriptors, sort specs
//! - `facets`: facet requests and results
//! - `import`: spreadsheet row normalization
//! - `config`: file + environment configuration

pub mod config;
pub mod error;
pub mod facets;
pub mod filters;
pub mod import;

pub use config::RecruitConfig;
pub use error::{RecruitError, Result};
pub use facets::{Facet, FacetMap, FacetRequest, FacetStrategy};
pub use filters::{
    ColumnDef, ColumnKind, FilterDescriptor, FilterError, FilterOperator, ListQuery, Predicate,
    SortSpec,
};
