//! Programs: a university's men's or women's team

use chrono::{DateTime, Utc};
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::db::{DbError, Entity, EntityWrite, Payload, Values};
use crate::models::fields::{self, MAX_TEXT};
use crate::models::{nullable, ValidationError};

pub const GENDERS: &[&str] = &["men", "women"];

pub struct Programs;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub university_id: Uuid,
    pub university_name: String,
    pub gender: String,
    pub team_url: Option<String>,
    pub conference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Programs {
    type Row = Program;

    const TABLE: &'static str = "programs";
    const RESOURCE: &'static str = "program";
    const FROM: &'static str = "programs t JOIN universities u ON u.id = t.university_id";
    const SELECT: &'static str = "t.id, t.university_id, u.name AS university_name, t.gender, \
        t.team_url, t.conference, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("university_name", "u.name"),
        ColumnDef::select("gender", "t.gender"),
        ColumnDef::select("conference", "t.conference"),
        ColumnDef::select("division", "u.division"),
        ColumnDef::date("created_at", "t.created_at"),
    ];
    const DEFAULT_SORT: &'static str = "u.name ASC, t.gender ASC";
    const REFERENCES: &'static [(&'static str, &'static str)] =
        &[("university_id", "universities")];
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProgram {
    pub university_id: Uuid,
    pub gender: String,
    pub team_url: Option<String>,
    pub conference: Option<String>,
}

impl Payload for NewProgram {
    fn into_values(self) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        values
            .set("university_id", self.university_id)
            .set("gender", fields::one_of("gender", &self.gender, GENDERS)?)
            .set("team_url", fields::optional_text("team_url", self.team_url, MAX_TEXT)?)
            .set("conference", fields::optional_text("conference", self.conference, MAX_TEXT)?);
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgramPatch {
    pub university_id: Option<Uuid>,
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub team_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub conference: Option<Option<String>>,
}

impl Payload for ProgramPatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        values
            .set_some("university_id", self.university_id)
            .set_some(
                "gender",
                self.gender
                    .map(|g| fields::one_of("gender", &g, GENDERS))
                    .transpose()?,
            )
            .set_some(
                "team_url",
                self.team_url
                    .map(|v| fields::optional_text("team_url", v, MAX_TEXT))
                    .transpose()?,
            )
            .set_some(
                "conference",
                self.conference
                    .map(|v| fields::optional_text("conference", v, MAX_TEXT))
                    .transpose()?,
            );
        Ok(values)
    }
}

impl EntityWrite for Programs {
    type New = NewProgram;
    type Patch = ProgramPatch;
}

/// Require `program_id` to be a live program of `university_id`.
///
/// Shared by applications and campaign leads.
pub async fn require_program_of(
    conn: &mut PgConnection,
    program_id: Uuid,
    university_id: Uuid,
) -> Result<(), DbError> {
    let owner: Option<(Uuid,)> = sqlx::query_as(
        "SELECT university_id FROM programs WHERE id = $1 AND is_deleted = FALSE",
    )
    .bind(program_id)
    .fetch_optional(&mut *conn)
    .await?;

    match owner {
        None => Err(ValidationError::UnknownReference {
            field: "program_id",
            id: program_id,
        }
        .into()),
        Some((owner,)) if owner != university_id => Err(ValidationError::InvalidFormat {
            field: "program_id",
            reason: "program does not belong to the given university",
        }
        .into()),
        Some(_) => Ok(()),
    }
}

/// Live program of a university by gender.
pub async fn find_for_university(
    conn: &mut PgConnection,
    university_id: Uuid,
    gender: &str,
) -> Result<Option<Uuid>, DbError> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id FROM programs
        WHERE university_id = $1 AND gender = $2 AND is_deleted = FALSE
        ORDER BY created_at
        LIMIT 1
        "#,
    )
    .bind(university_id)
    .bind(gender)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(|(id,)| id))
}
