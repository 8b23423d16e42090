//! Athlete applications: an athlete's standing with one university program
//!
//! Writes enforce two invariants against the merged row (patch over stored
//! values): at most one live application per athlete, university and
//! program, and the program must belong to the university.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::programs::require_program_of;
use crate::db::{DbError, Entity, EntityRepo, EntityWrite, Payload, SqlValue, Values};
use crate::models::fields::{self, MAX_LONG_TEXT};
use crate::models::{nullable, ValidationError};

pub const STAGES: &[&str] = &[
    "interested",
    "contacted",
    "in_conversation",
    "visit",
    "offer",
    "committed",
    "declined",
    "dropped",
];

pub struct Applications;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub athlete_name: String,
    pub university_id: Uuid,
    pub university_name: String,
    pub program_id: Option<Uuid>,
    pub program_gender: Option<String>,
    pub stage: String,
    pub scholarship_amount: Option<f64>,
    pub scholarship_percent: Option<f64>,
    pub offer_date: Option<NaiveDate>,
    pub commitment_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Applications {
    type Row = Application;

    const TABLE: &'static str = "athlete_applications";
    const RESOURCE: &'static str = "application";
    const FROM: &'static str = "athlete_applications t \
        JOIN athletes a ON a.id = t.athlete_id \
        JOIN universities u ON u.id = t.university_id \
        LEFT JOIN programs p ON p.id = t.program_id";
    const SELECT: &'static str = "t.id, t.athlete_id, a.full_name AS athlete_name, \
        t.university_id, u.name AS university_name, t.program_id, p.gender AS program_gender, \
        t.stage, t.scholarship_amount, t.scholarship_percent, t.offer_date, \
        t.commitment_date, t.notes, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("athlete_name", "a.full_name"),
        ColumnDef::text("university_name", "u.name"),
        ColumnDef::select("division", "u.division"),
        ColumnDef::select("stage", "t.stage"),
        ColumnDef::number("scholarship_amount", "t.scholarship_amount"),
        ColumnDef::number("scholarship_percent", "t.scholarship_percent"),
        ColumnDef::date("offer_date", "t.offer_date"),
        ColumnDef::date("commitment_date", "t.commitment_date"),
        ColumnDef::date("created_at", "t.created_at"),
    ];
    const REFERENCES: &'static [(&'static str, &'static str)] = &[
        ("athlete_id", "athletes"),
        ("university_id", "universities"),
    ];
}

fn scholarship_amount(v: Option<f64>) -> Result<Option<f64>, ValidationError> {
    fields::optional_in_range("scholarship_amount", v, 0.0, f64::MAX)
}

/// Accepts a fraction (`0.5`) or a percentage (`50`).
fn scholarship_percent(v: Option<f64>) -> Result<Option<f64>, ValidationError> {
    let v = v.map(|p| if p > 0.0 && p <= 1.0 { p * 100.0 } else { p });
    fields::optional_in_range("scholarship_percent", v, 0.0, 100.0)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewApplication {
    pub athlete_id: Uuid,
    pub university_id: Uuid,
    pub program_id: Option<Uuid>,
    pub stage: Option<String>,
    pub scholarship_amount: Option<f64>,
    pub scholarship_percent: Option<f64>,
    pub offer_date: Option<NaiveDate>,
    pub commitment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Payload for NewApplication {
    fn into_values(self) -> Result<Values, ValidationError> {
        let stage = match self.stage {
            Some(stage) => fields::one_of("stage", &stage, STAGES)?,
            None => STAGES[0].to_string(),
        };
        let mut values = Values::new();
        values
            .set("athlete_id", self.athlete_id)
            .set("university_id", self.university_id)
            .set("program_id", self.program_id)
            .set("stage", stage)
            .set("scholarship_amount", scholarship_amount(self.scholarship_amount)?)
            .set("scholarship_percent", scholarship_percent(self.scholarship_percent)?)
            .set("offer_date", self.offer_date)
            .set("commitment_date", self.commitment_date)
            .set("notes", fields::optional_text("notes", self.notes, MAX_LONG_TEXT)?);
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationPatch {
    pub athlete_id: Option<Uuid>,
    pub university_id: Option<Uuid>,
    #[serde(default, deserialize_with = "nullable")]
    pub program_id: Option<Option<Uuid>>,
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub scholarship_amount: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub scholarship_percent: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub offer_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub commitment_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl Payload for ApplicationPatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        values
            .set_some("athlete_id", self.athlete_id)
            .set_some("university_id", self.university_id)
            .set_some("program_id", self.program_id)
            .set_some(
                "stage",
                self.stage
                    .map(|s| fields::one_of("stage", &s, STAGES))
                    .transpose()?,
            )
            .set_some(
                "scholarship_amount",
                self.scholarship_amount.map(scholarship_amount).transpose()?,
            )
            .set_some(
                "scholarship_percent",
                self.scholarship_percent.map(scholarship_percent).transpose()?,
            )
            .set_some("offer_date", self.offer_date)
            .set_some("commitment_date", self.commitment_date)
            .set_some(
                "notes",
                self.notes
                    .map(|v| fields::optional_text("notes", v, MAX_LONG_TEXT))
                    .transpose()?,
            );
        Ok(values)
    }
}

/// The columns that identify an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationKey {
    pub athlete_id: Uuid,
    pub university_id: Uuid,
    pub program_id: Option<Uuid>,
}

impl ApplicationKey {
    /// Overlay the key columns present in `values`.
    pub fn merged(self, values: &Values) -> Self {
        let uuid = |column| match values.get(column) {
            Some(SqlValue::Uuid(id)) => Some(*id),
            _ => None,
        };
        Self {
            athlete_id: uuid("athlete_id").flatten().unwrap_or(self.athlete_id),
            university_id: uuid("university_id")
                .flatten()
                .unwrap_or(self.university_id),
            program_id: uuid("program_id").unwrap_or(self.program_id),
        }
    }

    fn from_values(values: &Values) -> Option<Self> {
        Some(Self {
            athlete_id: values.get("athlete_id")?.as_uuid()?,
            university_id: values.get("university_id")?.as_uuid()?,
            program_id: values.get("program_id").and_then(SqlValue::as_uuid),
        })
    }
}

async fn check_invariants(
    conn: &mut PgConnection,
    key: ApplicationKey,
    exclude: Option<Uuid>,
) -> Result<(), DbError> {
    if let Some(program_id) = key.program_id {
        require_program_of(conn, program_id, key.university_id).await?;
    }

    let (duplicate,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM athlete_applications
            WHERE athlete_id = $1
              AND university_id = $2
              AND program_id IS NOT DISTINCT FROM $3
              AND is_deleted = FALSE
              AND ($4::uuid IS NULL OR id <> $4)
        )
        "#,
    )
    .bind(key.athlete_id)
    .bind(key.university_id)
    .bind(key.program_id)
    .bind(exclude)
    .fetch_one(&mut *conn)
    .await?;

    if duplicate {
        return Err(ValidationError::Duplicate {
            resource: "an application",
            fields: &["athlete_id", "university_id", "program_id"],
        }
        .into());
    }
    Ok(())
}

#[async_trait]
impl EntityWrite for Applications {
    type New = NewApplication;
    type Patch = ApplicationPatch;

    async fn create(
        repo: &EntityRepo<'_, Self>,
        new: NewApplication,
    ) -> Result<Application, DbError> {
        let values = new.into_values()?;
        let key = ApplicationKey::from_values(&values).ok_or(ValidationError::Empty {
            field: "athlete_id",
        })?;

        let mut tx = repo.pool().begin().await?;
        check_invariants(&mut tx, key, None).await?;
        let id = EntityRepo::<Self>::insert_in(&mut tx, values).await?;
        let application = EntityRepo::<Self>::fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(application)
    }

    async fn update(
        repo: &EntityRepo<'_, Self>,
        id: Uuid,
        patch: ApplicationPatch,
    ) -> Result<Application, DbError> {
        let values = patch.into_values()?;
        let mut tx = repo.pool().begin().await?;

        let stored: Option<(Uuid, Uuid, Option<Uuid>)> = sqlx::query_as(
            r#"
            SELECT athlete_id, university_id, program_id
            FROM athlete_applications
            WHERE id = $1 AND is_deleted = FALSE
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let (athlete_id, university_id, program_id) =
            stored.ok_or_else(|| DbError::not_found(Self::RESOURCE, id))?;

        let key = ApplicationKey {
            athlete_id,
            university_id,
            program_id,
        }
        .merged(&values);
        check_invariants(&mut tx, key, Some(id)).await?;

        EntityRepo::<Self>::update_in(&mut tx, id, values).await?;
        let application = EntityRepo::<Self>::fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_defaults_to_interested() {
        let new: NewApplication = serde_json::from_value(json!({
            "athlete_id": Uuid::new_v4(),
            "university_id": Uuid::new_v4()
        }))
        .unwrap();
        let values = new.into_values().unwrap();
        assert_eq!(
            values.get("stage"),
            Some(&SqlValue::Text(Some("interested".into())))
        );
    }

    #[test]
    fn scholarship_fraction_scaled() {
        assert_eq!(scholarship_percent(Some(0.5)).unwrap(), Some(50.0));
        assert_eq!(scholarship_percent(Some(75.0)).unwrap(), Some(75.0));
        assert!(scholarship_percent(Some(120.0)).is_err());
    }

    #[test]
    fn key_merges_patch_over_stored() {
        let stored = ApplicationKey {
            athlete_id: Uuid::new_v4(),
            university_id: Uuid::new_v4(),
            program_id: Some(Uuid::new_v4()),
        };

        let untouched = stored.merged(&Values::new());
        assert_eq!(untouched, stored);

        let new_university = Uuid::new_v4();
        let mut values = Values::new();
        values
            .set("university_id", new_university)
            .set("program_id", None::<Uuid>);
        let merged = stored.merged(&values);
        assert_eq!(merged.athlete_id, stored.athlete_id);
        assert_eq!(merged.university_id, new_university);
        assert_eq!(merged.program_id, None);
    }

    #[test]
    fn unknown_stage_rejected() {
        let patch: ApplicationPatch = serde_json::from_value(json!({"stage": "ghosted"})).unwrap();
        assert!(matches!(
            patch.into_values(),
            Err(ValidationError::InvalidVariant { field: "stage", .. })
        ));
    }
}
