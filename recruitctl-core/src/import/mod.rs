//! Spreadsheet row normalization for coach and athlete imports
//!
//! Rows that cannot be normalized are reported with their 1-based data row
//! number and never abort the rest of the sheet. Only an unreadable sheet
//! or a missing name column is an `ImportError`.

mod athlete;
mod coach;
mod headers;
mod numeric;
mod responsibilities;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use athlete::{parse_athlete_rows, NormalizedAthlete};
pub use coach::{parse_coach_rows, NormalizedCoach};
pub use headers::{normalize_header, AliasTable, HeaderMap};
pub use numeric::{
    parse_graduation_year, parse_integer, parse_number, parse_percentage, split_list,
};
pub use responsibilities::{classify_responsibilities, EventGroup, ResponsibilityProfile};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{column}' (found: {})", .found.join(", "))]
    MissingColumn {
        column: &'static str,
        found: Vec<String>,
    },
}

/// A row that could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based data row (header excluded)
    pub row: usize,
    pub message: String,
}

/// Outcome of parsing one sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport<T> {
    pub rows: Vec<T>,
    pub errors: Vec<RowError>,
    /// Non-blank data rows seen
    pub total_rows: usize,
}

impl<T> Default for ImportReport<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            errors: Vec::new(),
            total_rows: 0,
        }
    }
}

impl<T> ImportReport<T> {
    fn reject(&mut self, row: usize, message: impl Into<String>) {
        self.errors.push(RowError {
            row,
            message: message.into(),
        });
    }
}

/// `"Men's"`, `"M"`, `"boys"` → `"men"`; the women's equivalents → `"women"`.
pub fn normalize_gender(s: &str) -> Option<&'static str> {
    let lower = s.trim().to_ascii_lowercase();
    let lower = lower.trim_end_matches("'s").trim_end_matches('s');
    match lower {
        "m" | "male" | "man" | "men" | "boy" => Some("men"),
        "f" | "w" | "female" | "woman" | "women" | "girl" => Some("women"),
        _ => None,
    }
}

/// Lowercased email if it looks deliverable.
pub fn normalize_email(s: &str) -> Option<String> {
    let email = s.trim().trim_start_matches("mailto:").to_ascii_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || email.contains(' ') {
        return None;
    }
    Some(email)
}

/// Social handle from `@handle`, a bare handle, or a profile URL.
pub fn normalize_handle(s: &str) -> Option<String> {
    let trimmed = s.trim().trim_end_matches('/');
    let handle = trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .split('?')
        .next()
        .unwrap_or_default()
        .trim_start_matches('@');
    (!handle.is_empty()).then(|| handle.to_string())
}
