//! Coaches
//!
//! Event groups and the head-coach / recruiting-coordinator flags are
//! derived from the title and responsibilities text when the payload
//! doesn't set them explicitly.

use chrono::{DateTime, Utc};
use recruitctl_core::import::{classify_responsibilities, EventGroup, NormalizedCoach};
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::db::{DbError, Entity, EntityRepo, EntityWrite, Payload, Values};
use crate::models::fields::{self, MAX_LONG_TEXT, MAX_TEXT};
use crate::models::{nullable, ValidationError};

pub struct Coaches;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Coach {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub twitter: Option<String>,
    pub title: Option<String>,
    pub responsibilities: Option<String>,
    pub event_groups: Vec<String>,
    pub is_head_coach: bool,
    pub is_recruiting_coordinator: bool,
    pub university_id: Option<Uuid>,
    pub university_name: Option<String>,
    pub division: Option<String>,
    pub program_id: Option<Uuid>,
    pub program_gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Coaches {
    type Row = Coach;

    const TABLE: &'static str = "coaches";
    const RESOURCE: &'static str = "coach";
    const FROM: &'static str = "coaches t \
        LEFT JOIN universities u ON u.id = t.university_id \
        LEFT JOIN programs p ON p.id = t.program_id";
    const SELECT: &'static str = "t.id, t.full_name, t.email, t.phone, t.twitter, t.title, \
        t.responsibilities, t.event_groups, t.is_head_coach, t.is_recruiting_coordinator, \
        t.university_id, u.name AS university_name, u.division, t.program_id, \
        p.gender AS program_gender, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("full_name", "t.full_name"),
        ColumnDef::text("email", "t.email"),
        ColumnDef::text("title", "t.title"),
        ColumnDef::text("responsibilities", "t.responsibilities"),
        ColumnDef::text("university_name", "u.name"),
        ColumnDef::select("division", "u.division"),
        ColumnDef::select("state", "u.state"),
        ColumnDef::select("program_gender", "p.gender"),
        ColumnDef::multi_select("event_groups", "t.event_groups"),
        ColumnDef::boolean("is_head_coach", "t.is_head_coach"),
        ColumnDef::boolean("is_recruiting_coordinator", "t.is_recruiting_coordinator"),
        ColumnDef::date("created_at", "t.created_at"),
    ];
    const DEFAULT_SORT: &'static str = "t.full_name ASC";
    const REFERENCES: &'static [(&'static str, &'static str)] = &[
        ("university_id", "universities"),
        ("program_id", "programs"),
    ];
}

fn event_groups(groups: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let mut out = Vec::with_capacity(groups.len());
    for group in fields::text_list(groups) {
        let normalized = group.to_ascii_lowercase().replace([' ', '-'], "_");
        let known = EventGroup::ALL
            .iter()
            .find(|g| g.as_str() == normalized)
            .ok_or(ValidationError::InvalidVariant {
                field: "event_groups",
                value: group,
            })?;
        out.push(known.as_str().to_string());
    }
    Ok(out)
}

fn groups_to_strings(groups: impl IntoIterator<Item = EventGroup>) -> Vec<String> {
    groups.into_iter().map(|g| g.as_str().to_string()).collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCoach {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub twitter: Option<String>,
    pub title: Option<String>,
    pub responsibilities: Option<String>,
    pub event_groups: Option<Vec<String>>,
    pub is_head_coach: Option<bool>,
    pub is_recruiting_coordinator: Option<bool>,
    pub university_id: Option<Uuid>,
    pub program_id: Option<Uuid>,
}

impl Payload for NewCoach {
    fn into_values(self) -> Result<Values, ValidationError> {
        let title = fields::optional_text("title", self.title, MAX_TEXT)?;
        let responsibilities =
            fields::optional_text("responsibilities", self.responsibilities, MAX_LONG_TEXT)?;
        let duties = [title.as_deref(), responsibilities.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ; ");
        let profile = classify_responsibilities(&duties);

        let groups = match self.event_groups {
            Some(groups) => event_groups(groups)?,
            None => groups_to_strings(profile.event_groups),
        };

        let mut values = Values::new();
        values
            .set("full_name", fields::required_text("full_name", &self.full_name, MAX_TEXT)?)
            .set("email", fields::optional_email("email", self.email)?)
            .set("phone", fields::optional_text("phone", self.phone, 64)?)
            .set("twitter", fields::optional_handle(self.twitter))
            .set("title", title)
            .set("responsibilities", responsibilities)
            .set("event_groups", groups)
            .set("is_head_coach", self.is_head_coach.unwrap_or(profile.head_coach))
            .set(
                "is_recruiting_coordinator",
                self.is_recruiting_coordinator
                    .unwrap_or(profile.recruiting_coordinator),
            )
            .set("university_id", self.university_id)
            .set("program_id", self.program_id);
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoachPatch {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub twitter: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub responsibilities: Option<Option<String>>,
    pub event_groups: Option<Vec<String>>,
    pub is_head_coach: Option<bool>,
    pub is_recruiting_coordinator: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub university_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub program_id: Option<Option<Uuid>>,
}

impl Payload for CoachPatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        values
            .set_some(
                "full_name",
                self.full_name
                    .map(|n| fields::required_text("full_name", &n, MAX_TEXT))
                    .transpose()?,
            )
            .set_some(
                "email",
                self.email
                    .map(|e| fields::optional_email("email", e))
                    .transpose()?,
            )
            .set_some(
                "phone",
                self.phone
                    .map(|v| fields::optional_text("phone", v, 64))
                    .transpose()?,
            )
            .set_some("twitter", self.twitter.map(fields::optional_handle))
            .set_some(
                "title",
                self.title
                    .map(|v| fields::optional_text("title", v, MAX_TEXT))
                    .transpose()?,
            )
            .set_some(
                "responsibilities",
                self.responsibilities
                    .map(|v| fields::optional_text("responsibilities", v, MAX_LONG_TEXT))
                    .transpose()?,
            )
            .set_some("event_groups", self.event_groups.map(event_groups).transpose()?)
            .set_some("is_head_coach", self.is_head_coach)
            .set_some("is_recruiting_coordinator", self.is_recruiting_coordinator)
            .set_some("university_id", self.university_id)
            .set_some("program_id", self.program_id);
        Ok(values)
    }
}

impl EntityWrite for Coaches {
    type New = NewCoach;
    type Patch = CoachPatch;
}

/// Outcome of importing one coach row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted(Uuid),
    Updated(Uuid),
}

/// Insert a normalized sheet row, or update the live coach with the same
/// email. Blank sheet cells never clear stored values.
pub async fn upsert_imported(
    conn: &mut PgConnection,
    coach: &NormalizedCoach,
    university_id: Option<Uuid>,
    program_id: Option<Uuid>,
) -> Result<Upserted, DbError> {
    let existing = match &coach.email {
        Some(email) => {
            let row: Option<(Uuid,)> = sqlx::query_as(
                r#"
                SELECT id FROM coaches
                WHERE LOWER(email) = LOWER($1) AND is_deleted = FALSE
                ORDER BY created_at
                LIMIT 1
                "#,
            )
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;
            row.map(|(id,)| id)
        }
        None => None,
    };

    let mut values = Values::new();
    values
        .set("full_name", coach.full_name.clone())
        .set_some("email", coach.email.clone())
        .set_some("phone", coach.phone.clone())
        .set_some("twitter", coach.twitter.clone())
        .set_some("title", coach.title.clone())
        .set_some("responsibilities", coach.responsibilities.clone())
        .set_some("university_id", university_id)
        .set_some("program_id", program_id);

    match existing {
        Some(id) => {
            set_derived_duties(&mut values, coach);
            EntityRepo::<Coaches>::update_in(conn, id, values).await?;
            Ok(Upserted::Updated(id))
        }
        None => {
            values
                .set("event_groups", groups_to_strings(coach.event_groups.iter().copied()))
                .set("is_head_coach", coach.is_head_coach)
                .set("is_recruiting_coordinator", coach.is_recruiting_coordinator);
            let id = EntityRepo::<Coaches>::insert_in(conn, values).await?;
            Ok(Upserted::Inserted(id))
        }
    }
}

/// Duties derived from title and responsibilities text, for an update.
///
/// Only positive findings are written: an empty group list or a false flag
/// leaves the stored value alone.
fn set_derived_duties(values: &mut Values, coach: &NormalizedCoach) {
    let groups = groups_to_strings(coach.event_groups.iter().copied());
    values
        .set_some("event_groups", (!groups.is_empty()).then_some(groups))
        .set_some("is_head_coach", coach.is_head_coach.then_some(true))
        .set_some(
            "is_recruiting_coordinator",
            coach.is_recruiting_coordinator.then_some(true),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;

    #[test]
    fn derives_flags_from_title() {
        let new = NewCoach {
            full_name: "Jordan Lee".into(),
            title: Some("Head Coach".into()),
            responsibilities: Some("Sprints/Hurdles, Recruiting Coordinator".into()),
            ..Default::default()
        };
        let values = new.into_values().unwrap();
        assert_eq!(values.get("is_head_coach"), Some(&SqlValue::Bool(Some(true))));
        assert_eq!(
            values.get("is_recruiting_coordinator"),
            Some(&SqlValue::Bool(Some(true)))
        );
        assert_eq!(
            values.get("event_groups"),
            Some(&SqlValue::TextArray(vec!["sprints".into(), "hurdles".into()]))
        );
    }

    #[test]
    fn explicit_groups_are_validated() {
        assert_eq!(
            event_groups(vec!["Middle Distance".into(), "throws".into()]).unwrap(),
            vec!["middle_distance", "throws"]
        );
        assert!(matches!(
            event_groups(vec!["swimming".into()]),
            Err(ValidationError::InvalidVariant { field: "event_groups", .. })
        ));
    }

    #[test]
    fn explicit_flags_win() {
        let new = NewCoach {
            full_name: "Sam".into(),
            title: Some("Head Coach".into()),
            is_head_coach: Some(false),
            ..Default::default()
        };
        let values = new.into_values().unwrap();
        assert_eq!(values.get("is_head_coach"), Some(&SqlValue::Bool(Some(false))));
    }

    fn sheet_coach(title: Option<&str>, groups: Vec<EventGroup>, head: bool) -> NormalizedCoach {
        NormalizedCoach {
            row: 1,
            full_name: "Jo Lee".into(),
            email: Some("jo@u.edu".into()),
            phone: None,
            title: title.map(str::to_string),
            responsibilities: None,
            event_groups: groups,
            is_head_coach: head,
            is_recruiting_coordinator: false,
            university_name: None,
            division: None,
            state: None,
            twitter: None,
            program_gender: None,
        }
    }

    #[test]
    fn blank_duties_leave_stored_values() {
        let mut values = Values::new();
        set_derived_duties(&mut values, &sheet_coach(None, vec![], false));
        assert!(values.get("event_groups").is_none());
        assert!(values.get("is_head_coach").is_none());
        assert!(values.get("is_recruiting_coordinator").is_none());
    }

    #[test]
    fn derived_duties_only_add() {
        let mut values = Values::new();
        set_derived_duties(
            &mut values,
            &sheet_coach(Some("Head Coach"), vec![EventGroup::Sprints], true),
        );
        assert_eq!(
            values.get("event_groups"),
            Some(&SqlValue::TextArray(vec!["sprints".into()]))
        );
        assert_eq!(values.get("is_head_coach"), Some(&SqlValue::Bool(Some(true))));
        assert!(values.get("is_recruiting_coordinator").is_none());
    }
}
