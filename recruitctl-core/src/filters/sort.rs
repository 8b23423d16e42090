//! Sort specs for list queries

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{find_column, ColumnDef, FilterError};

/// Requested ordering: JSON `{ columnId, desc }` or query-string `column.desc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub column_id: String,
    #[serde(default)]
    pub desc: bool,
}

impl FromStr for SortSpec {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (column, direction) = match s.rsplit_once('.') {
            Some((column, direction)) => (column, Some(direction)),
            None => (s, None),
        };
        let desc = match direction {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(_) => return Err(FilterError::InvalidSort(s.to_string())),
        };
        if column.is_empty() {
            return Err(FilterError::InvalidSort(s.to_string()));
        }
        Ok(Self {
            column_id: column.to_string(),
            desc,
        })
    }
}

/// Parse a comma-separated query-string sort (`graduation_year.desc,full_name`).
pub fn parse_sort_param(param: &str) -> Result<Vec<SortSpec>, FilterError> {
    param
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(SortSpec::from_str)
        .collect()
}

/// A validated ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: ColumnDef,
    pub desc: bool,
}

pub fn compile_sort(columns: &[ColumnDef], specs: &[SortSpec]) -> Result<Vec<SortKey>, FilterError> {
    specs
        .iter()
        .map(|spec| {
            let column = find_column(columns, &spec.column_id)
                .ok_or_else(|| FilterError::UnknownColumn(spec.column_id.clone()))?;
            if !column.sortable {
                return Err(FilterError::NotSortable(column.id.to_string()));
            }
            Ok(SortKey {
                column: *column,
                desc: spec.desc,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::text("full_name", "t.full_name"),
        ColumnDef::number("graduation_year", "t.graduation_year"),
        ColumnDef::multi_select("events", "t.events"),
    ];

    #[test]
    fn parses_query_param() {
        let specs = parse_sort_param("graduation_year.desc,full_name").unwrap();
        assert_eq!(
            specs,
            vec![
                SortSpec { column_id: "graduation_year".into(), desc: true },
                SortSpec { column_id: "full_name".into(), desc: false },
            ]
        );
    }

    #[test]
    fn rejects_bad_direction() {
        assert!(matches!(
            "full_name.sideways".parse::<SortSpec>(),
            Err(FilterError::InvalidSort(_))
        ));
    }

    #[test]
    fn rejects_unsortable_column() {
        let specs = vec![SortSpec { column_id: "events".into(), desc: false }];
        assert_eq!(
            compile_sort(COLUMNS, &specs).unwrap_err(),
            FilterError::NotSortable("events".into())
        );
    }

    #[test]
    fn compiles_known_columns() {
        let specs = parse_sort_param("full_name.desc").unwrap();
        let keys = compile_sort(COLUMNS, &specs).unwrap();
        assert_eq!(keys[0].column.expr, "t.full_name");
        assert!(keys[0].desc);
    }
}
