//! Descriptor → predicate compilation
//!
//! Type-checks every descriptor against the entity's column registry so
//! the SQL layer only ever renders well-formed, bound comparisons.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{find_column, ColumnDef, ColumnKind, FilterError, FilterOperator};

/// One filter as sent by the UI: `{ columnId, operator, values }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub column_id: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub values: Vec<Value>,
}

impl FilterDescriptor {
    pub fn new(column_id: impl Into<String>, operator: FilterOperator, values: Vec<Value>) -> Self {
        Self {
            column_id: column_id.into(),
            operator,
            values,
        }
    }
}

/// Typed filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

/// Normalized comparison independent of the UI's operator wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Case-insensitive substring match
    Contains,
    NotContains,
    /// Case-insensitive text equality
    TextEq,
    TextNe,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Between,
    NotBetween,
    AnyOf,
    NoneOf,
    /// Array shares at least one element
    Overlaps,
    /// Array contains every element
    ContainsAll,
    NotOverlaps,
    NotContainsAll,
}

/// A compiled, type-checked filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: ColumnDef,
    pub comparison: Comparison,
    pub values: Vec<FilterValue>,
}

enum Arity {
    One,
    Two,
    AtLeastOne,
}

impl Arity {
    fn describe(&self) -> &'static str {
        match self {
            Self::One => "exactly 1",
            Self::Two => "exactly 2",
            Self::AtLeastOne => "at least 1",
        }
    }

    fn accepts(&self, n: usize) -> bool {
        match self {
            Self::One => n == 1,
            Self::Two => n == 2,
            Self::AtLeastOne => n >= 1,
        }
    }
}

fn comparison_for(kind: ColumnKind, op: FilterOperator) -> (Comparison, Arity) {
    use FilterOperator::*;
    match (kind, op) {
        (ColumnKind::Text, Contains) => (Comparison::Contains, Arity::One),
        (ColumnKind::Text, DoesNotContain) => (Comparison::NotContains, Arity::One),
        (ColumnKind::Text, Is) => (Comparison::TextEq, Arity::One),
        (ColumnKind::Text, IsNot) => (Comparison::TextNe, Arity::One),

        (ColumnKind::Select, Is | IsAnyOf) => (Comparison::AnyOf, Arity::AtLeastOne),
        (ColumnKind::Select, IsNot | IsNoneOf) => (Comparison::NoneOf, Arity::AtLeastOne),

        (ColumnKind::MultiSelect, Include | IncludeAnyOf) => {
            (Comparison::Overlaps, Arity::AtLeastOne)
        }
        (ColumnKind::MultiSelect, IncludeAllOf) => (Comparison::ContainsAll, Arity::AtLeastOne),
        (ColumnKind::MultiSelect, Exclude | ExcludeIfAnyOf) => {
            (Comparison::NotOverlaps, Arity::AtLeastOne)
        }
        (ColumnKind::MultiSelect, ExcludeIfAll) => {
            (Comparison::NotContainsAll, Arity::AtLeastOne)
        }

        (_, Is) => (Comparison::Eq, Arity::One),
        (_, IsNot) => (Comparison::Ne, Arity::One),
        (_, IsLessThan | IsBefore) => (Comparison::Lt, Arity::One),
        (_, IsLessThanOrEqualTo | IsOnOrBefore) => (Comparison::Le, Arity::One),
        (_, IsGreaterThan | IsAfter) => (Comparison::Gt, Arity::One),
        (_, IsGreaterThanOrEqualTo | IsOnOrAfter) => (Comparison::Ge, Arity::One),
        (_, IsBetween) => (Comparison::Between, Arity::Two),
        (_, IsNotBetween) => (Comparison::NotBetween, Arity::Two),

        // applies_to() has already rejected every other pairing
        (_, _) => (Comparison::Eq, Arity::One),
    }
}

/// Compile UI descriptors into predicates for one entity.
///
/// Descriptors with no values are skipped: the filter UI emits them while
/// a filter is still being edited.
pub fn compile(
    columns: &[ColumnDef],
    descriptors: &[FilterDescriptor],
) -> Result<Vec<Predicate>, FilterError> {
    let mut predicates = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        let column = find_column(columns, &descriptor.column_id)
            .ok_or_else(|| FilterError::UnknownColumn(descriptor.column_id.clone()))?;

        if !descriptor.operator.applies_to(column.kind) {
            return Err(FilterError::OperatorMismatch {
                column: column.id.to_string(),
                operator: descriptor.operator,
                kind: column.kind,
            });
        }

        let raw: Vec<&Value> = descriptor
            .values
            .iter()
            .filter(|v| !is_blank(v))
            .collect();
        if raw.is_empty() {
            tracing::trace!(column = column.id, "skipping filter without values");
            continue;
        }

        let (comparison, arity) = comparison_for(column.kind, descriptor.operator);
        if !arity.accepts(raw.len()) {
            return Err(FilterError::Arity {
                column: column.id.to_string(),
                operator: descriptor.operator,
                expected: arity.describe(),
                got: raw.len(),
            });
        }

        let mut values = raw
            .into_iter()
            .map(|v| parse_value(column, v))
            .collect::<Result<Vec<_>, _>>()?;

        if matches!(comparison, Comparison::Between | Comparison::NotBetween) {
            order_range(&mut values);
        }

        predicates.push(Predicate {
            column: *column,
            comparison,
            values,
        });
    }

    Ok(predicates)
}

/// Drop the predicates on `column_id` (facet counts ignore their own filter).
pub fn without_column(predicates: &[Predicate], column_id: &str) -> Vec<Predicate> {
    predicates
        .iter()
        .filter(|p| p.column.id != column_id)
        .cloned()
        .collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn invalid(column: &ColumnDef, reason: impl Into<String>) -> FilterError {
    FilterError::InvalidValue {
        column: column.id.to_string(),
        reason: reason.into(),
    }
}

fn parse_value(column: &ColumnDef, value: &Value) -> Result<FilterValue, FilterError> {
    match column.kind {
        ColumnKind::Text | ColumnKind::Select | ColumnKind::MultiSelect => match value {
            Value::String(s) => Ok(FilterValue::Text(s.trim().to_string())),
            Value::Number(n) => Ok(FilterValue::Text(n.to_string())),
            Value::Bool(b) => Ok(FilterValue::Text(b.to_string())),
            other => Err(invalid(column, format!("expected text, got {}", other))),
        },
        ColumnKind::Number => {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .filter(|n| n.is_finite())
                .map(FilterValue::Number)
                .ok_or_else(|| invalid(column, format!("expected a number, got {}", value)))
        }
        ColumnKind::Date => match value {
            Value::String(s) => parse_date(s)
                .map(FilterValue::Date)
                .ok_or_else(|| invalid(column, format!("expected a date, got '{}'", s))),
            other => Err(invalid(column, format!("expected a date string, got {}", other))),
        },
        ColumnKind::Boolean => match value {
            Value::Bool(b) => Ok(FilterValue::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(FilterValue::Bool(true)),
                "false" | "no" | "0" => Ok(FilterValue::Bool(false)),
                _ => Err(invalid(column, format!("expected a boolean, got '{}'", s))),
            },
            other => Err(invalid(column, format!("expected a boolean, got {}", other))),
        },
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (the UI serializes JS dates).
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn order_range(values: &mut [FilterValue]) {
    if let [a, b] = values {
        let swap = match (&*a, &*b) {
            (FilterValue::Number(x), FilterValue::Number(y)) => x > y,
            (FilterValue::Date(x), FilterValue::Date(y)) => x > y,
            _ => false,
        };
        if swap {
            std::mem::swap(a, b);
        }
    }
}
