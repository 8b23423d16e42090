//! University jobs: a coach's employment history
//!
//! At most one job per coach is current. Marking a job current clears the
//! flag on the coach's other jobs and moves the coach to the job's
//! university and program, all in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use recruitctl_core::{ColumnDef, ColumnKind};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::programs::require_program_of;
use crate::db::{DbError, Entity, EntityRepo, EntityWrite, Payload, Values};
use crate::models::fields::{self, MAX_TEXT};
use crate::models::{nullable, ValidationError};

pub struct UniversityJobs;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UniversityJob {
    pub id: Uuid,
    pub coach_id: Uuid,
    pub coach_name: String,
    pub university_id: Uuid,
    pub university_name: String,
    pub program_id: Option<Uuid>,
    pub title: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for UniversityJobs {
    type Row = UniversityJob;

    const TABLE: &'static str = "university_jobs";
    const RESOURCE: &'static str = "university job";
    const FROM: &'static str = "university_jobs t \
        JOIN coaches c ON c.id = t.coach_id \
        JOIN universities u ON u.id = t.university_id";
    const SELECT: &'static str = "t.id, t.coach_id, c.full_name AS coach_name, t.university_id, \
        u.name AS university_name, t.program_id, t.title, t.start_date, t.end_date, \
        t.is_current, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("coach_name", "c.full_name"),
        ColumnDef::text("university_name", "u.name"),
        ColumnDef::text("title", "t.title"),
        ColumnDef::date("start_date", "t.start_date"),
        ColumnDef::date("end_date", "t.end_date"),
        ColumnDef::boolean("is_current", "t.is_current"),
        // filter-only: the coach detail page lists its jobs
        ColumnDef {
            id: "coach_id",
            expr: "t.coach_id",
            kind: ColumnKind::Select,
            sortable: false,
            facetable: false,
            searchable: false,
        },
    ];
    const DEFAULT_SORT: &'static str = "t.start_date DESC NULLS LAST";
    const REFERENCES: &'static [(&'static str, &'static str)] = &[
        ("coach_id", "coaches"),
        ("university_id", "universities"),
        ("program_id", "programs"),
    ];
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUniversityJob {
    pub coach_id: Uuid,
    pub university_id: Uuid,
    pub program_id: Option<Uuid>,
    pub title: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
}

impl Payload for NewUniversityJob {
    fn into_values(self) -> Result<Values, ValidationError> {
        fields::date_order("end_date", self.start_date, self.end_date)?;
        let mut values = Values::new();
        values
            .set("coach_id", self.coach_id)
            .set("university_id", self.university_id)
            .set("program_id", self.program_id)
            .set("title", fields::optional_text("title", self.title, MAX_TEXT)?)
            .set("start_date", self.start_date)
            .set("end_date", self.end_date)
            .set("is_current", self.is_current);
        Ok(values)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UniversityJobPatch {
    pub university_id: Option<Uuid>,
    #[serde(default, deserialize_with = "nullable")]
    pub program_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<NaiveDate>>,
    pub is_current: Option<bool>,
}

impl Payload for UniversityJobPatch {
    fn into_values(self) -> Result<Values, ValidationError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            fields::date_order("end_date", start, end)?;
        }
        let mut values = Values::new();
        values
            .set_some("university_id", self.university_id)
            .set_some("program_id", self.program_id)
            .set_some(
                "title",
                self.title
                    .map(|v| fields::optional_text("title", v, MAX_TEXT))
                    .transpose()?,
            )
            .set_some("start_date", self.start_date)
            .set_some("end_date", self.end_date)
            .set_some("is_current", self.is_current);
        Ok(values)
    }
}

/// The job's program, when set, must belong to the job's university.
async fn require_job_program(conn: &mut PgConnection, job: &UniversityJob) -> Result<(), DbError> {
    match job.program_id {
        Some(program_id) => require_program_of(conn, program_id, job.university_id).await,
        None => Ok(()),
    }
}

/// Make `job` the coach's only current job and move the coach with it.
async fn promote_current(conn: &mut PgConnection, job: &UniversityJob) -> Result<(), DbError> {
    sqlx::query(
        r#"
        UPDATE university_jobs
        SET is_current = FALSE, updated_at = NOW()
        WHERE coach_id = $1 AND id <> $2 AND is_current AND is_deleted = FALSE
        "#,
    )
    .bind(job.coach_id)
    .bind(job.id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE coaches
        SET university_id = $2, program_id = $3, updated_at = NOW()
        WHERE id = $1 AND is_deleted = FALSE
        "#,
    )
    .bind(job.coach_id)
    .bind(job.university_id)
    .bind(job.program_id)
    .execute(&mut *conn)
    .await?;

    tracing::info!(job_id = %job.id, coach_id = %job.coach_id, "promoted current job");
    Ok(())
}

#[async_trait]
impl EntityWrite for UniversityJobs {
    type New = NewUniversityJob;
    type Patch = UniversityJobPatch;

    async fn create(
        repo: &EntityRepo<'_, Self>,
        new: NewUniversityJob,
    ) -> Result<UniversityJob, DbError> {
        let values = new.into_values()?;
        let mut tx = repo.pool().begin().await?;
        let id = EntityRepo::<Self>::insert_in(&mut tx, values).await?;
        let job = EntityRepo::<Self>::fetch_in(&mut tx, id).await?;
        require_job_program(&mut tx, &job).await?;
        if job.is_current {
            promote_current(&mut tx, &job).await?;
        }
        tx.commit().await?;
        Ok(job)
    }

    async fn update(
        repo: &EntityRepo<'_, Self>,
        id: Uuid,
        patch: UniversityJobPatch,
    ) -> Result<UniversityJob, DbError> {
        let values = patch.into_values()?;
        let moves_coach = ["is_current", "university_id", "program_id"]
            .iter()
            .any(|c| values.contains(c));
        let mut tx = repo.pool().begin().await?;
        EntityRepo::<Self>::update_in(&mut tx, id, values).await?;
        let job = EntityRepo::<Self>::fetch_in(&mut tx, id).await?;
        if let Some(end) = job.end_date {
            fields::date_order("end_date", job.start_date, Some(end))?;
        }
        require_job_program(&mut tx, &job).await?;
        if job.is_current && moves_coach {
            promote_current(&mut tx, &job).await?;
        }
        tx.commit().await?;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn end_before_start_rejected() {
        let new: NewUniversityJob = serde_json::from_value(json!({
            "coach_id": Uuid::new_v4(),
            "university_id": Uuid::new_v4(),
            "start_date": "2023-08-01",
            "end_date": "2021-05-01"
        }))
        .unwrap();
        assert!(matches!(
            new.into_values(),
            Err(ValidationError::InvalidFormat { field: "end_date", .. })
        ));
    }

    #[test]
    fn is_current_defaults_false() {
        let new: NewUniversityJob = serde_json::from_value(json!({
            "coach_id": Uuid::new_v4(),
            "university_id": Uuid::new_v4()
        }))
        .unwrap();
        assert!(!new.is_current);
    }

    #[test]
    fn patch_can_clear_program() {
        let patch: UniversityJobPatch =
            serde_json::from_value(json!({"program_id": null, "is_current": true})).unwrap();
        let values = patch.into_values().unwrap();
        assert_eq!(values.len(), 2);
    }
}
