//! Predicate, search and sort rendering onto `QueryBuilder`
//!
//! Column expressions come from the entity's static registry; every user
//! value is bound, never interpolated.

use recruitctl_core::filters::{Comparison, FilterValue, Predicate, SortKey};
use recruitctl_core::{ColumnDef, ColumnKind};
use sqlx::{Postgres, QueryBuilder};

/// ` WHERE t.is_deleted = FALSE [AND predicate ...] [AND (search)]`
pub fn push_where(
    builder: &mut QueryBuilder<'_, Postgres>,
    predicates: &[Predicate],
    columns: &[ColumnDef],
    search: Option<&str>,
) {
    builder.push(" WHERE t.is_deleted = FALSE");
    push_predicates(builder, predicates);
    if let Some(term) = search {
        push_search(builder, columns, term);
    }
}

/// ` AND <predicate>` for each predicate.
pub fn push_predicates(builder: &mut QueryBuilder<'_, Postgres>, predicates: &[Predicate]) {
    for predicate in predicates {
        builder.push(" AND ");
        push_predicate(builder, predicate);
    }
}

fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    let expr = typed_expr(&predicate.column);
    let values = &predicate.values;

    match predicate.comparison {
        Comparison::Contains => {
            builder.push(format!("{} ILIKE ", expr));
            builder.push_bind(like_pattern(values));
        }
        Comparison::NotContains => {
            builder.push(format!("({expr} IS NULL OR {expr} NOT ILIKE ", expr = expr));
            builder.push_bind(like_pattern(values));
            builder.push(")");
        }
        Comparison::TextEq => {
            builder.push(format!("LOWER({}) = LOWER(", expr));
            push_value(builder, &values[0]);
            builder.push(")");
        }
        Comparison::TextNe => {
            builder.push(format!("LOWER({}) IS DISTINCT FROM LOWER(", expr));
            push_value(builder, &values[0]);
            builder.push(")");
        }
        Comparison::Eq => push_binary(builder, &expr, "=", &values[0]),
        Comparison::Ne => push_binary(builder, &expr, "IS DISTINCT FROM", &values[0]),
        Comparison::Lt => push_binary(builder, &expr, "<", &values[0]),
        Comparison::Le => push_binary(builder, &expr, "<=", &values[0]),
        Comparison::Gt => push_binary(builder, &expr, ">", &values[0]),
        Comparison::Ge => push_binary(builder, &expr, ">=", &values[0]),
        Comparison::Between => {
            builder.push(format!("{} BETWEEN ", expr));
            push_value(builder, &values[0]);
            builder.push(" AND ");
            push_value(builder, &values[1]);
        }
        Comparison::NotBetween => {
            builder.push(format!("({expr} IS NULL OR {expr} NOT BETWEEN ", expr = expr));
            push_value(builder, &values[0]);
            builder.push(" AND ");
            push_value(builder, &values[1]);
            builder.push(")");
        }
        Comparison::AnyOf => {
            builder.push(format!("{} = ANY(", expr));
            builder.push_bind(text_values(values));
            builder.push(")");
        }
        Comparison::NoneOf => {
            builder.push(format!("({expr} IS NULL OR {expr} <> ALL(", expr = expr));
            builder.push_bind(text_values(values));
            builder.push("))");
        }
        Comparison::Overlaps => {
            builder.push(format!("{} && ", expr));
            builder.push_bind(text_values(values));
        }
        Comparison::ContainsAll => {
            builder.push(format!("{} @> ", expr));
            builder.push_bind(text_values(values));
        }
        Comparison::NotOverlaps => {
            builder.push(format!("NOT COALESCE({} && ", expr));
            builder.push_bind(text_values(values));
            builder.push(", FALSE)");
        }
        Comparison::NotContainsAll => {
            builder.push(format!("NOT COALESCE({} @> ", expr));
            builder.push_bind(text_values(values));
            builder.push(", FALSE)");
        }
    }
}

/// Column expression cast to the type its operands bind as.
fn typed_expr(column: &ColumnDef) -> String {
    match column.kind {
        ColumnKind::Number => format!("({})::float8", column.expr),
        ColumnKind::Date => format!("({})::date", column.expr),
        ColumnKind::Select | ColumnKind::Text => format!("({})::text", column.expr),
        ColumnKind::MultiSelect => format!("({})::text[]", column.expr),
        ColumnKind::Boolean => format!("({})", column.expr),
    }
}

fn push_binary(
    builder: &mut QueryBuilder<'_, Postgres>,
    expr: &str,
    op: &str,
    value: &FilterValue,
) {
    builder.push(format!("{} {} ", expr, op));
    push_value(builder, value);
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Text(s) => builder.push_bind(s.clone()),
        FilterValue::Number(n) => builder.push_bind(*n),
        FilterValue::Date(d) => builder.push_bind(*d),
        FilterValue::Bool(b) => builder.push_bind(*b),
    };
}

fn text_values(values: &[FilterValue]) -> Vec<String> {
    values
        .iter()
        .map(|v| match v {
            FilterValue::Text(s) => s.clone(),
            FilterValue::Number(n) => n.to_string(),
            FilterValue::Date(d) => d.to_string(),
            FilterValue::Bool(b) => b.to_string(),
        })
        .collect()
}

fn like_pattern(values: &[FilterValue]) -> String {
    let needle = text_values(values).into_iter().next().unwrap_or_default();
    format!("%{}%", escape_like(&needle))
}

/// Escape `\`, `%` and `_` for a LIKE pattern.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// ` AND (col1 ILIKE $n OR col2 ILIKE $m ...)` over searchable columns.
pub fn push_search(builder: &mut QueryBuilder<'_, Postgres>, columns: &[ColumnDef], term: &str) {
    let pattern = format!("%{}%", escape_like(term));
    let mut searchable = columns.iter().filter(|c| c.searchable).peekable();
    if searchable.peek().is_none() {
        return;
    }

    builder.push(" AND (");
    let mut first = true;
    for column in searchable {
        if !first {
            builder.push(" OR ");
        }
        first = false;
        builder.push(format!("({})::text ILIKE ", column.expr));
        builder.push_bind(pattern.clone());
    }
    builder.push(")");
}

/// ` ORDER BY <requested...>, <default>, t.id`
pub fn push_order_by(builder: &mut QueryBuilder<'_, Postgres>, sort: &[SortKey], default: &str) {
    builder.push(" ORDER BY ");
    for key in sort {
        builder.push(format!(
            "{} {} NULLS LAST, ",
            key.column.expr,
            if key.desc { "DESC" } else { "ASC" }
        ));
    }
    builder.push(default);
    builder.push(", t.id");
}

#[cfg(test)]
mod tests {
    use super::*;
    use recruitctl_core::filters::{compile, compile_sort, FilterDescriptor, SortSpec};
    use recruitctl_core::FilterOperator;
    use serde_json::json;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::text("full_name", "t.full_name"),
        ColumnDef::text("email", "t.email"),
        ColumnDef::select("status", "t.status"),
        ColumnDef::number("gpa", "t.gpa"),
        ColumnDef::date("created_at", "t.created_at"),
        ColumnDef::multi_select("events", "t.events"),
        ColumnDef::boolean("is_active", "t.is_active"),
    ];

    fn render(filters: Vec<FilterDescriptor>, search: Option<&str>) -> String {
        let predicates = compile(COLUMNS, &filters).unwrap();
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT 1 FROM athletes t");
        push_where(&mut builder, &predicates, COLUMNS, search);
        builder.sql().to_string()
    }

    #[test]
    fn always_excludes_deleted() {
        assert_eq!(
            render(vec![], None),
            "SELECT 1 FROM athletes t WHERE t.is_deleted = FALSE"
        );
    }

    #[test]
    fn text_contains_is_bound_ilike() {
        let sql = render(
            vec![FilterDescriptor::new(
                "full_name",
                FilterOperator::Contains,
                vec![json!("o'brien")],
            )],
            None,
        );
        assert!(sql.ends_with("AND (t.full_name)::text ILIKE $1"), "{}", sql);
        assert!(!sql.contains("o'brien"));
    }

    #[test]
    fn option_none_of_keeps_nulls() {
        let sql = render(
            vec![FilterDescriptor::new(
                "status",
                FilterOperator::IsNoneOf,
                vec![json!("inactive"), json!("signed")],
            )],
            None,
        );
        assert!(sql.contains("((t.status)::text IS NULL OR (t.status)::text <> ALL($1))"));
    }

    #[test]
    fn number_between() {
        let sql = render(
            vec![FilterDescriptor::new(
                "gpa",
                FilterOperator::IsBetween,
                vec![json!(4.0), json!(3.0)],
            )],
            None,
        );
        assert!(sql.contains("(t.gpa)::float8 BETWEEN $1 AND $2"));
    }

    #[test]
    fn date_before() {
        let sql = render(
            vec![FilterDescriptor::new(
                "created_at",
                FilterOperator::IsBefore,
                vec![json!("2024-06-01")],
            )],
            None,
        );
        assert!(sql.contains("(t.created_at)::date < $1"));
    }

    #[test]
    fn multi_option_operators() {
        let sql = render(
            vec![
                FilterDescriptor::new("events", FilterOperator::IncludeAnyOf, vec![json!("100m")]),
                FilterDescriptor::new(
                    "events",
                    FilterOperator::ExcludeIfAll,
                    vec![json!("800m"), json!("1500m")],
                ),
            ],
            None,
        );
        assert!(sql.contains("(t.events)::text[] && $1"));
        assert!(sql.contains("NOT COALESCE((t.events)::text[] @> $2, FALSE)"));
    }

    #[test]
    fn search_spans_searchable_columns() {
        let sql = render(vec![], Some("lee"));
        assert!(sql.ends_with(
            " AND ((t.full_name)::text ILIKE $1 OR (t.email)::text ILIKE $2)"
        ));
    }

    #[test]
    fn empty_values_are_skipped() {
        let sql = render(
            vec![FilterDescriptor::new("status", FilterOperator::IsAnyOf, vec![])],
            None,
        );
        assert!(!sql.contains("status"));
    }

    #[test]
    fn order_by_appends_default_and_id() {
        let sort = compile_sort(
            COLUMNS,
            &[SortSpec {
                column_id: "gpa".into(),
                desc: true,
            }],
        )
        .unwrap();
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT 1");
        push_order_by(&mut builder, &sort, "t.full_name ASC");
        assert_eq!(
            builder.sql(),
            "SELECT 1 ORDER BY t.gpa DESC NULLS LAST, t.full_name ASC, t.id"
        );
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
