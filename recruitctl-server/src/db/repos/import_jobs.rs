//! Coach import jobs
//!
//! The dashboard uploads a spreadsheet and creates a `pending` job; the
//! import worker claims it, reports progress, and finishes it as
//! `completed` (row errors kept in `errors`) or `failed`.

use chrono::{DateTime, Utc};
use recruitctl_core::import::RowError;
use recruitctl_core::ColumnDef;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::{DbError, Entity};
use crate::models::fields::{self, MAX_TEXT};
use crate::models::ValidationError;

pub struct CoachImportJobs;

/// Lifecycle of an import job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CoachImportJob {
    pub id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub status: String,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub success_rows: i32,
    pub error_rows: i32,
    pub errors: serde_json::Value,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CoachImportJobs {
    type Row = CoachImportJob;

    const TABLE: &'static str = "coach_import_jobs";
    const RESOURCE: &'static str = "coach import job";
    const FROM: &'static str = "coach_import_jobs t";
    const SELECT: &'static str = "t.id, t.file_name, t.file_url, t.status, t.total_rows, \
        t.processed_rows, t.success_rows, t.error_rows, t.errors, t.error_message, \
        t.started_at, t.completed_at, t.created_at, t.updated_at";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::text("file_name", "t.file_name"),
        ColumnDef::select("status", "t.status"),
        ColumnDef::number("total_rows", "t.total_rows"),
        ColumnDef::number("error_rows", "t.error_rows"),
        ColumnDef::date("created_at", "t.created_at"),
        ColumnDef::date("completed_at", "t.completed_at"),
    ];
}

/// Body of `POST /coach-import-jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewImportJob {
    pub file_name: String,
    pub file_url: String,
}

impl NewImportJob {
    fn validate(self) -> Result<(String, String), ValidationError> {
        let file_name = fields::required_text("file_name", &self.file_name, MAX_TEXT)?;
        let file_url = fields::required_text("file_url", &self.file_url, 2048)?;
        if !(file_url.starts_with("https://") || file_url.starts_with("http://")) {
            return Err(ValidationError::InvalidFormat {
                field: "file_url",
                reason: "must be an http(s) URL",
            });
        }
        Ok((file_name, file_url))
    }
}

/// Counters written while a job is processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobProgress {
    pub total_rows: usize,
    pub processed_rows: usize,
    pub success_rows: usize,
    pub error_rows: usize,
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

pub struct CoachImportJobRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CoachImportJobRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Queue a job for the worker.
    pub async fn create(&self, new: NewImportJob) -> Result<CoachImportJob, DbError> {
        let (file_name, file_url) = new.validate()?;
        let sql = format!(
            "INSERT INTO coach_import_jobs (file_name, file_url) VALUES ($1, $2) RETURNING {}",
            CoachImportJobs::SELECT.replace("t.", "")
        );
        let job = sqlx::query_as::<_, CoachImportJob>(&sql)
            .bind(file_name)
            .bind(file_url)
            .fetch_one(self.pool)
            .await?;
        tracing::info!(job_id = %job.id, file = %job.file_name, "queued coach import job");
        Ok(job)
    }

    /// Claim the oldest pending job. Concurrent workers never claim the same
    /// job: locked rows are skipped.
    pub async fn claim_next(&self) -> Result<Option<CoachImportJob>, DbError> {
        let sql = format!(
            r#"
            UPDATE coach_import_jobs
            SET status = 'processing', started_at = NOW(), updated_at = NOW()
            WHERE id = (
                SELECT id FROM coach_import_jobs
                WHERE status = 'pending' AND is_deleted = FALSE
                ORDER BY created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {}
            "#,
            CoachImportJobs::SELECT.replace("t.", "")
        );
        let job = sqlx::query_as::<_, CoachImportJob>(&sql)
            .fetch_optional(self.pool)
            .await?;
        if let Some(job) = &job {
            tracing::info!(job_id = %job.id, "claimed coach import job");
        }
        Ok(job)
    }

    pub async fn record_progress(&self, id: Uuid, progress: JobProgress) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE coach_import_jobs
            SET total_rows = $2, processed_rows = $3, success_rows = $4, error_rows = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(count(progress.total_rows))
        .bind(count(progress.processed_rows))
        .bind(count(progress.success_rows))
        .bind(count(progress.error_rows))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Finish a job; row-level errors are kept for the dashboard.
    pub async fn complete(
        &self,
        id: Uuid,
        progress: JobProgress,
        errors: &[RowError],
    ) -> Result<(), DbError> {
        let errors = serde_json::to_value(errors).unwrap_or_else(|_| serde_json::json!([]));
        let result = sqlx::query(
            r#"
            UPDATE coach_import_jobs
            SET status = 'completed', total_rows = $2, processed_rows = $3,
                success_rows = $4, error_rows = $5, errors = $6,
                completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(count(progress.total_rows))
        .bind(count(progress.processed_rows))
        .bind(count(progress.success_rows))
        .bind(count(progress.error_rows))
        .bind(errors)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(CoachImportJobs::RESOURCE, id));
        }
        tracing::info!(
            job_id = %id,
            success = progress.success_rows,
            errors = progress.error_rows,
            "completed coach import job"
        );
        Ok(())
    }

    pub async fn fail(&self, id: Uuid, message: &str) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE coach_import_jobs
            SET status = 'failed', error_message = $2, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(self.pool)
        .await?;
        tracing::warn!(job_id = %id, error = message, "coach import job failed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returning_list_drops_alias() {
        let returning = CoachImportJobs::SELECT.replace("t.", "");
        assert!(returning.starts_with("id, file_name, file_url, status"));
        assert!(!returning.contains("t."));
    }

    #[test]
    fn job_needs_http_url() {
        let new = NewImportJob {
            file_name: "coaches.csv".into(),
            file_url: "ftp://example.com/coaches.csv".into(),
        };
        assert!(matches!(
            new.validate(),
            Err(ValidationError::InvalidFormat { field: "file_url", .. })
        ));
    }

    #[test]
    fn status_strings() {
        assert_eq!(JobStatus::Processing.as_str(), "processing");
        assert_eq!(
            serde_json::to_string(&JobStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn counts_saturate() {
        assert_eq!(count(usize::MAX), i32::MAX);
        assert_eq!(count(12), 12);
    }
}
