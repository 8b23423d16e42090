//! Faceted filtering model shared by every list view
//!
//! The dashboard sends `{columnId, operator, values}` descriptors plus sort
//! and pagination. Each entity registers its filterable columns once; the
//! same compiler validates descriptors for all of them.

mod column;
mod compile;
mod operator;
mod sort;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use column::{find_column, ColumnDef, ColumnKind};
pub use compile::{compile, without_column, Comparison, FilterDescriptor, FilterValue, Predicate};
pub use operator::FilterOperator;
pub use sort::{compile_sort, parse_sort_param, SortKey, SortSpec};

/// Rejected filter, sort or facet request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("operator '{operator}' does not apply to {kind} column '{column}'")]
    OperatorMismatch {
        column: String,
        operator: FilterOperator,
        kind: ColumnKind,
    },

    #[error("operator '{operator}' on column '{column}' expects {expected} value(s), got {got}")]
    Arity {
        column: String,
        operator: FilterOperator,
        expected: &'static str,
        got: usize,
    },

    #[error("invalid value for column '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("column '{0}' is not sortable")]
    NotSortable(String),

    #[error("column '{0}' has no facet")]
    NotFacetable(String),

    #[error("invalid sort '{0}' (expected column or column.asc/column.desc)")]
    InvalidSort(String),
}

/// Body of `POST /{entity}/query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    pub filters: Vec<FilterDescriptor>,
    pub sort: Vec<SortSpec>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListQuery {
    /// Search term with surrounding whitespace removed, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
