//! Facet model: value counts and ranges that populate filter dropdowns
//!
//! Each facet is computed with every active filter except the facet's own
//! column, so a dropdown keeps showing the alternatives to what is selected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filters::{find_column, ColumnDef, ColumnKind, FilterDescriptor, FilterError};

/// Body of `POST /{entity}/facets`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacetRequest {
    pub filters: Vec<FilterDescriptor>,
    pub search: Option<String>,
    /// Column ids to facet; empty means every facetable column
    pub columns: Vec<String>,
}

/// How a column's facet is aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetStrategy {
    /// `GROUP BY expr`
    Counts,
    /// `GROUP BY unnest(expr)`
    UnnestCounts,
    /// `MIN(expr), MAX(expr)`
    Range,
}

impl FacetStrategy {
    pub fn for_kind(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::MultiSelect => Self::UnnestCounts,
            ColumnKind::Number | ColumnKind::Date => Self::Range,
            ColumnKind::Text | ColumnKind::Select | ColumnKind::Boolean => Self::Counts,
        }
    }
}

/// One column's facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Counts(BTreeMap<String, i64>),
    Range {
        min: Option<serde_json::Value>,
        max: Option<serde_json::Value>,
    },
}

impl Facet {
    /// Build a counts facet from `(value, count)` rows, ignoring NULL values.
    pub fn from_counts<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (Option<String>, i64)>,
    {
        let mut counts = BTreeMap::new();
        for (value, count) in rows {
            if let Some(value) = value {
                *counts.entry(value).or_insert(0) += count;
            }
        }
        Self::Counts(counts)
    }
}

/// Facets keyed by column id.
pub type FacetMap = BTreeMap<String, Facet>;

/// Resolve the requested facet columns against an entity's registry.
pub fn facet_columns(
    columns: &[ColumnDef],
    requested: &[String],
) -> Result<Vec<ColumnDef>, FilterError> {
    if requested.is_empty() {
        return Ok(columns.iter().filter(|c| c.facetable).copied().collect());
    }

    requested
        .iter()
        .map(|id| {
            let column =
                find_column(columns, id).ok_or_else(|| FilterError::UnknownColumn(id.clone()))?;
            if !column.facetable {
                return Err(FilterError::NotFacetable(id.clone()));
            }
            Ok(*column)
        })
        .collect()
}
