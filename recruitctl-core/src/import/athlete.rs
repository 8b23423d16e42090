//! Athlete sheet normalization

use serde::{Deserialize, Serialize};
use std::io::Read;

use super::headers::{AliasTable, HeaderMap};
use super::numeric::{parse_graduation_year, parse_integer, parse_number, split_list};
use super::{normalize_email, normalize_gender, normalize_handle, ImportError, ImportReport};

const ATHLETE_ALIASES: AliasTable = &[
    ("full_name", &["name", "full_name", "athlete_name", "athlete", "student_name"]),
    ("first_name", &["first_name", "first", "firstname"]),
    ("last_name", &["last_name", "last", "lastname", "surname"]),
    ("email", &["email", "e_mail", "email_address", "athlete_email"]),
    ("phone", &["phone", "phone_number", "cell", "mobile"]),
    ("gender", &["gender", "sex"]),
    (
        "graduation_year",
        &["graduation_year", "grad_year", "class", "class_of", "hs_grad_year", "year"],
    ),
    ("events", &["events", "event", "primary_events", "event_group"]),
    ("high_school", &["high_school", "school", "hs"]),
    ("city", &["city", "hometown"]),
    ("state", &["state", "home_state"]),
    ("country", &["country", "nationality"]),
    ("gpa", &["gpa", "gpa_unweighted", "unweighted_gpa", "cumulative_gpa"]),
    ("sat_score", &["sat", "sat_score"]),
    ("act_score", &["act", "act_score"]),
    ("instagram", &["instagram", "ig", "instagram_handle"]),
];

/// An athlete row ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAthlete {
    pub row: usize,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub graduation_year: Option<i32>,
    pub events: Vec<String>,
    pub high_school: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub gpa: Option<f64>,
    pub sat_score: Option<i32>,
    pub act_score: Option<i32>,
    pub instagram: Option<String>,
}

/// Parse an athlete sheet (CSV with a header row).
///
/// Out-of-range academic scores reject the row rather than being dropped
/// silently, so the sheet owner can correct them.
pub fn parse_athlete_rows<R: Read>(
    reader: R,
) -> Result<ImportReport<NormalizedAthlete>, ImportError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = HeaderMap::new(csv.headers()?, ATHLETE_ALIASES);
    if !headers.has("full_name") && !(headers.has("first_name") && headers.has("last_name")) {
        return Err(ImportError::MissingColumn {
            column: "name",
            found: headers.headers().to_vec(),
        });
    }

    let mut report = ImportReport::default();
    for (index, record) in csv.records().enumerate() {
        let row = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                report.total_rows += 1;
                report.reject(row, format!("unreadable row: {}", err));
                continue;
            }
        };
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        report.total_rows += 1;

        let full_name = match headers.get(&record, "full_name") {
            Some(name) => name.split_whitespace().collect::<Vec<_>>().join(" "),
            None => {
                let first = headers.get(&record, "first_name").unwrap_or_default();
                let last = headers.get(&record, "last_name").unwrap_or_default();
                format!("{} {}", first, last).trim().to_string()
            }
        };
        if full_name.is_empty() {
            report.reject(row, "missing athlete name");
            continue;
        }

        match normalize_athlete(&headers, &record, row, full_name) {
            Ok(athlete) => report.rows.push(athlete),
            Err(message) => report.reject(row, message),
        }
    }

    tracing::debug!(
        total = report.total_rows,
        parsed = report.rows.len(),
        rejected = report.errors.len(),
        "parsed athlete sheet"
    );
    Ok(report)
}

fn normalize_athlete(
    headers: &HeaderMap,
    record: &csv::StringRecord,
    row: usize,
    full_name: String,
) -> Result<NormalizedAthlete, String> {
    let cell = |field: &str| headers.get(record, field);

    let email = cell("email")
        .map(|raw| normalize_email(raw).ok_or_else(|| format!("invalid email '{}'", raw)))
        .transpose()?;

    let graduation_year = cell("graduation_year")
        .map(|raw| {
            parse_graduation_year(raw).ok_or_else(|| format!("invalid graduation year '{}'", raw))
        })
        .transpose()?;

    let gpa = match cell("gpa") {
        Some(raw) => match parse_number(raw) {
            Some(gpa) if (0.0..=5.0).contains(&gpa) => Some(gpa),
            None if is_placeholder_score(raw) => None,
            _ => return Err(format!("GPA out of range '{}'", raw)),
        },
        None => None,
    };

    let sat_score = score(cell("sat_score"), "SAT", 400..=1600)?;
    let act_score = score(cell("act_score"), "ACT", 1..=36)?;

    Ok(NormalizedAthlete {
        row,
        full_name,
        email,
        phone: cell("phone").map(str::to_string),
        gender: cell("gender").and_then(normalize_gender).map(str::to_string),
        graduation_year,
        events: cell("events").map(split_list).unwrap_or_default(),
        high_school: cell("high_school").map(str::to_string),
        city: cell("city").map(str::to_string),
        state: cell("state").map(str::to_string),
        country: cell("country").map(str::to_string),
        gpa,
        sat_score,
        act_score,
        instagram: cell("instagram").and_then(normalize_handle),
    })
}

fn is_placeholder_score(raw: &str) -> bool {
    parse_number(raw).is_none() && !raw.chars().any(|c| c.is_ascii_digit())
}

fn score(
    raw: Option<&str>,
    label: &str,
    range: std::ops::RangeInclusive<i64>,
) -> Result<Option<i32>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match parse_integer(raw) {
        Some(n) if range.contains(&n) => Ok(Some(n as i32)),
        None if is_placeholder_score(raw) => Ok(None),
        _ => Err(format!("{} score out of range '{}'", label, raw)),
    }
}
