//! Filter operators as sent by the dashboard's data-table filter UI

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ColumnKind;

/// Operator names mirror the filter UI's wording so descriptors can be
/// forwarded as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "is not")]
    IsNot,
    #[serde(rename = "is any of")]
    IsAnyOf,
    #[serde(rename = "is none of")]
    IsNoneOf,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "does not contain")]
    DoesNotContain,
    #[serde(rename = "is less than", alias = "less than")]
    IsLessThan,
    #[serde(rename = "is less than or equal to")]
    IsLessThanOrEqualTo,
    #[serde(rename = "is greater than", alias = "greater than")]
    IsGreaterThan,
    #[serde(rename = "is greater than or equal to")]
    IsGreaterThanOrEqualTo,
    #[serde(rename = "is between")]
    IsBetween,
    #[serde(rename = "is not between")]
    IsNotBetween,
    #[serde(rename = "is before")]
    IsBefore,
    #[serde(rename = "is on or before")]
    IsOnOrBefore,
    #[serde(rename = "is after")]
    IsAfter,
    #[serde(rename = "is on or after")]
    IsOnOrAfter,
    #[serde(rename = "include")]
    Include,
    #[serde(rename = "exclude")]
    Exclude,
    #[serde(rename = "include any of")]
    IncludeAnyOf,
    #[serde(rename = "include all of")]
    IncludeAllOf,
    #[serde(rename = "exclude if any of")]
    ExcludeIfAnyOf,
    #[serde(rename = "exclude if all")]
    ExcludeIfAll,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::IsAnyOf => "is any of",
            Self::IsNoneOf => "is none of",
            Self::Contains => "contains",
            Self::DoesNotContain => "does not contain",
            Self::IsLessThan => "is less than",
            Self::IsLessThanOrEqualTo => "is less than or equal to",
            Self::IsGreaterThan => "is greater than",
            Self::IsGreaterThanOrEqualTo => "is greater than or equal to",
            Self::IsBetween => "is between",
            Self::IsNotBetween => "is not between",
            Self::IsBefore => "is before",
            Self::IsOnOrBefore => "is on or before",
            Self::IsAfter => "is after",
            Self::IsOnOrAfter => "is on or after",
            Self::Include => "include",
            Self::Exclude => "exclude",
            Self::IncludeAnyOf => "include any of",
            Self::IncludeAllOf => "include all of",
            Self::ExcludeIfAnyOf => "exclude if any of",
            Self::ExcludeIfAll => "exclude if all",
        }
    }

    /// Whether this operator is meaningful for a column of `kind`.
    pub fn applies_to(&self, kind: ColumnKind) -> bool {
        use FilterOperator::*;
        match kind {
            ColumnKind::Text => matches!(self, Is | IsNot | Contains | DoesNotContain),
            ColumnKind::Number => matches!(
                self,
                Is | IsNot
                    | IsLessThan
                    | IsLessThanOrEqualTo
                    | IsGreaterThan
                    | IsGreaterThanOrEqualTo
                    | IsBetween
                    | IsNotBetween
            ),
            ColumnKind::Date => matches!(
                self,
                Is | IsNot
                    | IsBefore
                    | IsOnOrBefore
                    | IsAfter
                    | IsOnOrAfter
                    | IsBetween
                    | IsNotBetween
            ),
            ColumnKind::Select => matches!(self, Is | IsNot | IsAnyOf | IsNoneOf),
            ColumnKind::MultiSelect => matches!(
                self,
                Include | Exclude | IncludeAnyOf | IncludeAllOf | ExcludeIfAnyOf | ExcludeIfAll
            ),
            ColumnKind::Boolean => matches!(self, Is | IsNot),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
