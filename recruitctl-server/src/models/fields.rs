//! Field-level validators shared by entity payloads

use chrono::NaiveDate;
use recruitctl_core::import::{normalize_email, normalize_handle};

use super::ValidationError;

/// Default length cap for short text columns
pub const MAX_TEXT: usize = 255;

/// Length cap for notes and long-form content
pub const MAX_LONG_TEXT: usize = 20_000;

/// Trimmed, non-empty text within `max` characters.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Trimmed text; blank becomes `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        Some(text) => Ok(Some(text.to_string())),
    }
}

pub fn required_email(field: &'static str, value: &str) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    normalize_email(value).ok_or(ValidationError::InvalidFormat {
        field,
        reason: "invalid email address",
    })
}

/// Lowercased email; blank becomes `None`.
pub fn optional_email(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<String>, ValidationError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => required_email(field, raw).map(Some),
    }
}

/// Social handle without `@` or profile URL.
pub fn optional_handle(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(normalize_handle)
}

/// One of a fixed set of lowercase values.
pub fn one_of(
    field: &'static str,
    value: &str,
    allowed: &[&str],
) -> Result<String, ValidationError> {
    let normalized = value.trim().to_ascii_lowercase();
    if allowed.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(ValidationError::InvalidVariant {
            field,
            value: value.to_string(),
        })
    }
}

pub fn optional_one_of(
    field: &'static str,
    value: Option<String>,
    allowed: &[&str],
) -> Result<Option<String>, ValidationError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => one_of(field, raw, allowed).map(Some),
    }
}

pub fn in_range<T>(field: &'static str, value: T, min: T, max: T) -> Result<T, ValidationError>
where
    T: PartialOrd + Copy + Into<f64>,
{
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min: min.into(),
            max: max.into(),
        });
    }
    Ok(value)
}

pub fn optional_in_range<T>(
    field: &'static str,
    value: Option<T>,
    min: T,
    max: T,
) -> Result<Option<T>, ValidationError>
where
    T: PartialOrd + Copy + Into<f64>,
{
    value.map(|v| in_range(field, v, min, max)).transpose()
}

/// Trimmed, de-duplicated list without blanks; order preserved.
pub fn text_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let trimmed = value.trim();
        if !trimmed.is_empty() && !out.iter().any(|v| v.eq_ignore_ascii_case(trimmed)) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// `end` may not precede `start` when both are set.
pub fn date_order(
    field: &'static str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ValidationError::InvalidFormat {
            field,
            reason: "end date is before start date",
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_caps() {
        assert_eq!(required_text("name", "  Ada ", 10).unwrap(), "Ada");
        assert_eq!(
            required_text("name", "   ", 10),
            Err(ValidationError::Empty { field: "name" })
        );
        assert!(matches!(
            required_text("name", "abcdefghijk", 10),
            Err(ValidationError::TooLong { max: 10, .. })
        ));
    }

    #[test]
    fn optional_text_blank_is_none() {
        assert_eq!(optional_text("city", Some("  ".into()), 10).unwrap(), None);
        assert_eq!(optional_text("city", None, 10).unwrap(), None);
        assert_eq!(
            optional_text("city", Some(" Austin ".into()), 10).unwrap(),
            Some("Austin".into())
        );
    }

    #[test]
    fn emails() {
        assert_eq!(
            optional_email("email", Some("Coach@U.EDU".into())).unwrap(),
            Some("coach@u.edu".into())
        );
        assert!(optional_email("email", Some("nope".into())).is_err());
        assert_eq!(optional_email("email", Some("".into())).unwrap(), None);
        assert!(matches!(
            required_email("email", " "),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn variants() {
        assert_eq!(one_of("role", "Admin", &["admin", "member"]).unwrap(), "admin");
        assert!(matches!(
            one_of("role", "owner", &["admin", "member"]),
            Err(ValidationError::InvalidVariant { field: "role", .. })
        ));
    }

    #[test]
    fn ranges() {
        assert_eq!(in_range("gpa", 3.5, 0.0, 5.0).unwrap(), 3.5);
        assert!(in_range("act", 40, 1, 36).is_err());
        assert_eq!(optional_in_range::<i32>("sat", None, 400, 1600).unwrap(), None);
    }

    #[test]
    fn lists_dedupe() {
        assert_eq!(
            text_list(vec![" 100m".into(), "".into(), "100M".into(), "200m".into()]),
            vec!["100m", "200m"]
        );
    }

    #[test]
    fn dates_ordered() {
        let d = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert!(date_order("end_date", Some(d("2024-01-02")), Some(d("2024-01-01"))).is_err());
        assert!(date_order("end_date", Some(d("2024-01-01")), None).is_ok());
    }
}
