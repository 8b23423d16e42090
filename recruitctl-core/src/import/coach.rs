//! Coach sheet normalization

use serde::{Deserialize, Serialize};
use std::io::Read;

use super::headers::{AliasTable, HeaderMap};
use super::responsibilities::{classify_responsibilities, EventGroup};
use super::{normalize_email, normalize_gender, normalize_handle, ImportError, ImportReport};

const COACH_ALIASES: AliasTable = &[
    ("full_name", &["name", "full_name", "coach_name", "coach"]),
    ("first_name", &["first_name", "first", "firstname"]),
    ("last_name", &["last_name", "last", "lastname", "surname"]),
    ("email", &["email", "e_mail", "email_address", "coach_email"]),
    ("phone", &["phone", "phone_number", "office_phone", "telephone"]),
    ("title", &["title", "position", "job_title", "role"]),
    (
        "responsibilities",
        &["responsibilities", "responsibility", "duties", "event_group", "events", "specialty"],
    ),
    ("university", &["university", "school", "college", "institution", "university_name"]),
    ("division", &["division", "ncaa_division", "level"]),
    ("state", &["state", "school_state"]),
    ("twitter", &["twitter", "x", "twitter_handle", "x_handle"]),
    ("gender", &["gender", "program", "team", "men_women"]),
];

/// A coach row ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCoach {
    /// 1-based data row this came from
    pub row: usize,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub responsibilities: Option<String>,
    pub event_groups: Vec<EventGroup>,
    pub is_head_coach: bool,
    pub is_recruiting_coordinator: bool,
    pub university_name: Option<String>,
    pub division: Option<String>,
    pub state: Option<String>,
    pub twitter: Option<String>,
    /// `men` / `women` when the sheet names the program
    pub program_gender: Option<String>,
}

/// Parse a coach sheet (CSV with a header row).
pub fn parse_coach_rows<R: Read>(reader: R) -> Result<ImportReport<NormalizedCoach>, ImportError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = HeaderMap::new(csv.headers()?, COACH_ALIASES);
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
            Some(name) => collapse_whitespace(name),
            None => {
                let first = headers.get(&record, "first_name").unwrap_or_default();
                let last = headers.get(&record, "last_name").unwrap_or_default();
                collapse_whitespace(&format!("{} {}", first, last))
            }
        };
        if full_name.is_empty() {
            report.reject(row, "missing coach name");
            continue;
        }

        let email = match headers.get(&record, "email") {
            Some(raw) => match normalize_email(raw) {
                Some(email) => Some(email),
                None => {
                    report.reject(row, format!("invalid email '{}'", raw));
                    continue;
                }
            },
            None => None,
        };

        let title = headers.get(&record, "title").map(str::to_string);
        let responsibilities = headers.get(&record, "responsibilities").map(str::to_string);

        // Titles often carry the duties ("Assistant Coach - Throws")
        let duty_text = [title.as_deref(), responsibilities.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ; ");
        let profile = classify_responsibilities(&duty_text);

        report.rows.push(NormalizedCoach {
            row,
            full_name,
            email,
            phone: headers.get(&record, "phone").map(str::to_string),
            title,
            responsibilities,
            event_groups: profile.event_groups.into_iter().collect(),
            is_head_coach: profile.head_coach,
            is_recruiting_coordinator: profile.recruiting_coordinator,
            university_name: headers.get(&record, "university").map(collapse_whitespace),
            division: headers.get(&record, "division").map(str::to_string),
            state: headers.get(&record, "state").map(str::to_string),
            twitter: headers.get(&record, "twitter").and_then(normalize_handle),
            program_gender: headers
                .get(&record, "gender")
                .and_then(normalize_gender)
                .map(str::to_string),
        });
    }

    tracing::debug!(
        total = report.total_rows,
        parsed = report.rows.len(),
        rejected = report.errors.len(),
        "parsed coach sheet"
    );
    Ok(report)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
