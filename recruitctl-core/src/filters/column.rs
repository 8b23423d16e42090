//! Column registry entries for filterable entities

use serde::Serialize;
use std::fmt;

/// Data kind of a filterable column. Decides which operators apply
/// and how values are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "date")]
    Date,
    /// Single-valued enumerated column (`status`, `division`, ...)
    #[serde(rename = "option")]
    Select,
    /// Array column (`events`, `tags`, ...)
    #[serde(rename = "multiOption")]
    MultiSelect,
    #[serde(rename = "boolean")]
    Boolean,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Select => "option",
            Self::MultiSelect => "multiOption",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column exposed to list filters, sorting, search and facets.
///
/// `expr` is a trusted SQL expression written against the entity's FROM
/// clause (e.g. `t.status`, `u.name`). It never comes from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub id: &'static str,
    pub expr: &'static str,
    pub kind: ColumnKind,
    pub sortable: bool,
    pub facetable: bool,
    pub searchable: bool,
}

impl ColumnDef {
    const fn new(id: &'static str, expr: &'static str, kind: ColumnKind) -> Self {
        Self {
            id,
            expr,
            kind,
            sortable: true,
            facetable: false,
            searchable: false,
        }
    }

    /// Free text, included in the global search box.
    pub const fn text(id: &'static str, expr: &'static str) -> Self {
        let mut col = Self::new(id, expr, ColumnKind::Text);
        col.searchable = true;
        col
    }

    pub const fn number(id: &'static str, expr: &'static str) -> Self {
        let mut col = Self::new(id, expr, ColumnKind::Number);
        col.facetable = true;
        col
    }

    pub const fn date(id: &'static str, expr: &'static str) -> Self {
        let mut col = Self::new(id, expr, ColumnKind::Date);
        col.facetable = true;
        col
    }

    pub const fn select(id: &'static str, expr: &'static str) -> Self {
        let mut col = Self::new(id, expr, ColumnKind::Select);
        col.facetable = true;
        col
    }

    pub const fn multi_select(id: &'static str, expr: &'static str) -> Self {
        let mut col = Self::new(id, expr, ColumnKind::MultiSelect);
        col.facetable = true;
        col.sortable = false;
        col
    }

    pub const fn boolean(id: &'static str, expr: &'static str) -> Self {
        let mut col = Self::new(id, expr, ColumnKind::Boolean);
        col.facetable = true;
        col
    }

    /// Exclude from the global search box.
    pub const fn unsearchable(mut self) -> Self {
        self.searchable = false;
        self
    }

    /// Text columns that are also worth a value-count facet (e.g. `state`).
    pub const fn with_facet(mut self) -> Self {
        self.facetable = true;
        self
    }
}

/// Look up a column by its public id.
pub fn find_column<'a>(columns: &'a [ColumnDef], id: &str) -> Option<&'a ColumnDef> {
    columns.iter().find(|c| c.id == id)
}
