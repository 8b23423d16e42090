//! Athletes
//!
//! Invite codes tie a Discord join back to the athlete it was issued to,
//! so no two live athletes may share one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::programs::GENDERS;
use crate::db::{DbError, Entity, EntityRepo, EntityWrite, Payload, SqlValue, Values};
use crate::models::fields::{self, MAX_TEXT};
use crate::models::{nullable, ValidationError};

pub const STATUSES: &[&str] = &["prospect", "active", "committed", "signed", "inactive"];

pub struct Athletes;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Athlete {
    pub id: Uuid,
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
    pub discord_username: Option<String>,
    pub discord_user_id: Option<String>,
    pub invite_code: Option<String>,
    pub status: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Athletes {
    type Row = Athlete;

    const TABLE: &'static str = "athletes";
    const RESOURCE: &'static str = "athlete";
    const FROM: &'static str = "athletes t";
    const SELECT: &'static str = "t.id, t.full_name, t.email, t.phone, t.gender, \
        t.graduation_year, t.events, t.high_school, t.city, t.state, t.country, t.gpa, \
        t.sat_score, t.act_score, t.instagram, t.discord_username, t.discord_user_id, \
        t.invite_code, t.status, t.tags, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("full_name", "t.full_name"),
        ColumnDef::text("email", "t.email"),
        ColumnDef::text("phone", "t.phone"),
        ColumnDef::select("gender", "t.gender"),
        ColumnDef::number("graduation_year", "t.graduation_year"),
        ColumnDef::multi_select("events", "t.events"),
        ColumnDef::text("high_school", "t.high_school"),
        ColumnDef::text("city", "t.city"),
        ColumnDef::select("state", "t.state"),
        ColumnDef::select("country", "t.country"),
        ColumnDef::number("gpa", "t.gpa"),
        ColumnDef::number("sat_score", "t.sat_score"),
        ColumnDef::number("act_score", "t.act_score"),
        ColumnDef::text("instagram", "t.instagram").unsearchable(),
        ColumnDef::text("discord_username", "t.discord_username"),
        ColumnDef::text("invite_code", "t.invite_code").unsearchable(),
        ColumnDef::select("status", "t.status"),
        ColumnDef::multi_select("tags", "t.tags"),
        ColumnDef::date("created_at", "t.created_at"),
    ];
    const DEFAULT_SORT: &'static str = "t.full_name ASC";
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAthlete {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub events: Vec<String>,
    pub high_school: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub gpa: Option<f64>,
    pub sat_score: Option<i32>,
    pub act_score: Option<i32>,
    pub instagram: Option<String>,
    pub discord_username: Option<String>,
    pub invite_code: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn graduation_year(v: Option<i32>) -> Result<Option<i32>, ValidationError> {
    fields::optional_in_range("graduation_year", v, 1990, 2100)
}

fn gpa(v: Option<f64>) -> Result<Option<f64>, ValidationError> {
    fields::optional_in_range("gpa", v, 0.0, 5.0)
}

fn sat(v: Option<i32>) -> Result<Option<i32>, ValidationError> {
    fields::optional_in_range("sat_score", v, 400, 1600)
}

fn act(v: Option<i32>) -> Result<Option<i32>, ValidationError> {
    fields::optional_in_range("act_score", v, 1, 36)
}

fn invite_code(v: Option<String>) -> Result<Option<String>, ValidationError> {
    let code = fields::optional_text("invite_code", v, 64)?;
    if let Some(code) = &code {
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ValidationError::InvalidFormat {
                field: "invite_code",
                reason: "invite codes are letters, digits, '-' and '_'",
            });
        }
    }
    Ok(code)
}

impl Payload for NewAthlete {
    fn into_values(self) -> Result<Values, ValidationError> {
        let status = match self.status {
            Some(s) => fields::one_of("status", &s, STATUSES)?,
            None => STATUSES[0].to_string(),
        };

        let mut values = Values::new();
        values
            .set("full_name", fields::required_text("full_name", &self.full_name, MAX_TEXT)?)
            .set("email", fields::optional_email("email", self.email)?)
            .set("phone", fields::optional_text("phone", self.phone, 64)?)
            .set("gender", fields::optional_one_of("gender", self.gender, GENDERS)?)
            .set("graduation_year", graduation_year(self.graduation_year)?)
            .set("events", fields::text_list(self.events))
            .set("high_school", fields::optional_text("high_school", self.high_school, MAX_TEXT)?)
            .set("city", fields::optional_text("city", self.city, MAX_TEXT)?)
            .set("state", fields::optional_text("state", self.state, MAX_TEXT)?)
            .set("country", fields::optional_text("country", self.country, MAX_TEXT)?)
            .set("gpa", gpa(self.gpa)?)
            .set("sat_score", sat(self.sat_score)?)
            .set("act_score", act(self.act_score)?)
            .set("instagram", fields::optional_handle(self.instagram))
            .set(
                "discord_username",
                fields::optional_text("discord_username", self.discord_username, MAX_TEXT)?,
            )
            .set("invite_code", invite_code(self.invite_code)?)
            .set("status", status)
            .set("tags", fields::text_list(self.tags));
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AthletePatch {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub graduation_year: Option<Option<i32>>,
    pub events: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub high_school: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub country: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub gpa: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub sat_score: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub act_score: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub instagram: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub discord_username: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub invite_code: Option<Option<String>>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Payload for AthletePatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        let text = |field, v: Option<Option<String>>, max| {
            v.map(|v| fields::optional_text(field, v, max)).transpose()
        };

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
            .set_some("phone", text("phone", self.phone, 64)?)
            .set_some(
                "gender",
                self.gender
                    .map(|g| fields::optional_one_of("gender", g, GENDERS))
                    .transpose()?,
            )
            .set_some(
                "graduation_year",
                self.graduation_year.map(graduation_year).transpose()?,
            )
            .set_some("events", self.events.map(fields::text_list))
            .set_some("high_school", text("high_school", self.high_school, MAX_TEXT)?)
            .set_some("city", text("city", self.city, MAX_TEXT)?)
            .set_some("state", text("state", self.state, MAX_TEXT)?)
            .set_some("country", text("country", self.country, MAX_TEXT)?)
            .set_some("gpa", self.gpa.map(gpa).transpose()?)
            .set_some("sat_score", self.sat_score.map(sat).transpose()?)
            .set_some("act_score", self.act_score.map(act).transpose()?)
            .set_some("instagram", self.instagram.map(fields::optional_handle))
            .set_some(
                "discord_username",
                text("discord_username", self.discord_username, MAX_TEXT)?,
            )
            .set_some(
                "invite_code",
                self.invite_code.map(invite_code).transpose()?,
            )
            .set_some(
                "status",
                self.status
                    .map(|s| fields::one_of("status", &s, STATUSES))
                    .transpose()?,
            )
            .set_some("tags", self.tags.map(fields::text_list));
        Ok(values)
    }
}

/// Reject an invite code already held by another live athlete.
async fn ensure_invite_code_free(
    conn: &mut PgConnection,
    values: &Values,
    exclude: Option<Uuid>,
) -> Result<(), DbError> {
    let Some(SqlValue::Text(Some(code))) = values.get("invite_code") else {
        return Ok(());
    };

    let (taken,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM athletes
            WHERE invite_code = $1
              AND is_deleted = FALSE
              AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(code)
    .bind(exclude)
    .fetch_one(&mut *conn)
    .await?;

    if taken {
        return Err(ValidationError::Duplicate {
            resource: "an athlete",
            fields: &["invite_code"],
        }
        .into());
    }
    Ok(())
}

#[async_trait]
impl EntityWrite for Athletes {
    type New = NewAthlete;
    type Patch = AthletePatch;

    async fn create(repo: &EntityRepo<'_, Self>, new: NewAthlete) -> Result<Athlete, DbError> {
        let values = new.into_values()?;
        let mut tx = repo.pool().begin().await?;
        ensure_invite_code_free(&mut tx, &values, None).await?;
        let id = EntityRepo::<Self>::insert_in(&mut tx, values).await?;
        let athlete = EntityRepo::<Self>::fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(athlete)
    }

    async fn update(
        repo: &EntityRepo<'_, Self>,
        id: Uuid,
        patch: AthletePatch,
    ) -> Result<Athlete, DbError> {
        let values = patch.into_values()?;
        let mut tx = repo.pool().begin().await?;
        ensure_invite_code_free(&mut tx, &values, Some(id)).await?;
        EntityRepo::<Self>::update_in(&mut tx, id, values).await?;
        let athlete = EntityRepo::<Self>::fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(athlete)
    }
}

/// Athlete lookups used by the invite matcher
pub struct AthleteRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> AthleteRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Live athlete holding `code`.
    pub async fn find_by_invite_code(&self, code: &str) -> Result<Option<Athlete>, DbError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE t.is_deleted = FALSE AND t.invite_code = $1",
            Athletes::SELECT,
            Athletes::FROM
        );
        let athlete = sqlx::query_as::<_, Athlete>(&sql)
            .bind(code.trim())
            .fetch_optional(self.pool)
            .await?;
        Ok(athlete)
    }

    /// Store the Discord account that joined through the athlete's invite.
    pub async fn record_discord_identity(
        &self,
        athlete_id: Uuid,
        discord_user_id: &str,
        discord_username: &str,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE athletes
            SET discord_user_id = $2, discord_username = $3, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(athlete_id)
        .bind(discord_user_id)
        .bind(discord_username)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Athletes::RESOURCE, athlete_id));
        }
        tracing::info!(%athlete_id, discord_user_id, "recorded discord identity");
        Ok(())
    }
}
