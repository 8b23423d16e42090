//! Numeric field cleanup for spreadsheet cells
//!
//! Sheets arrive hand-edited: currency symbols, thousands separators,
//! percentages written three different ways, and placeholder text.

const PLACEHOLDERS: &[&str] = &["-", "--", "n/a", "na", "none", "tbd", "?", "unknown"];

fn is_placeholder(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.is_empty() || PLACEHOLDERS.contains(&lower.as_str())
}

fn strip_decorations(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '\u{a0}'))
        .collect()
}

/// Parse a decimal cell: `"$12,500.50"` → 12500.5. Placeholders → `None`.
pub fn parse_number(s: &str) -> Option<f64> {
    if is_placeholder(s) {
        return None;
    }
    strip_decorations(s)
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Parse a whole-number cell: `"2,000"` → 2000. Fractions are rejected.
pub fn parse_integer(s: &str) -> Option<i64> {
    let n = parse_number(s)?;
    if n.fract() != 0.0 || n.abs() > i64::MAX as f64 {
        return None;
    }
    Some(n as i64)
}

/// Parse a percentage into the 0..=100 scale.
///
/// `"45%"` → 45, `"45"` → 45, and a bare fraction `"0.45"` → 45.
/// Values outside 0..=100 after scaling are rejected.
pub fn parse_percentage(s: &str) -> Option<f64> {
    if is_placeholder(s) {
        return None;
    }
    let trimmed = s.trim();
    let (body, explicit) = match trimmed.strip_suffix('%') {
        Some(body) => (body, true),
        None => (trimmed, false),
    };
    let mut value = parse_number(body)?;
    if !explicit && value > 0.0 && value <= 1.0 && body.contains('.') {
        value *= 100.0;
    }
    (0.0..=100.0).contains(&value).then_some(value)
}

/// Parse a graduation/class year: `"2026"`, `"'26"`, `"Class of 2026"`.
pub fn parse_graduation_year(s: &str) -> Option<i32> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    let year = match digits.len() {
        4 => digits.parse::<i32>().ok()?,
        2 => 2000 + digits.parse::<i32>().ok()?,
        _ => return None,
    };
    (1990..=2100).contains(&year).then_some(year)
}

/// Split a multi-valued cell on `,` `;` `/` `|`, trimming and dropping blanks.
pub fn split_list(s: &str) -> Vec<String> {
    s.split([',', ';', '/', '|'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
