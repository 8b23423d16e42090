//! Coach import worker
//!
//! Polls `coach_import_jobs` for pending jobs, downloads the sheet,
//! normalizes its rows and upserts coaches. Each coach is written in its
//! own transaction, so one bad row never rolls back the rest of the sheet.
//!
//! # Graceful Shutdown
//!
//! `run` finishes the job it is working on, then exits when the
//! cancellation token is triggered.

use std::collections::HashMap;
use std::time::Duration;

use recruitctl_core::import::{parse_coach_rows, ImportError, ImportReport, NormalizedCoach, RowError};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::repos::import_jobs::JobStatus;
use crate::db::repos::programs::find_for_university;
use crate::db::repos::universities::find_id_by_name;
use crate::db::repos::{upsert_imported, CoachImportJob, CoachImportJobRepo, JobProgress, Upserted};
use crate::db::DbError;

/// Default seconds between polls when the queue is empty
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Rows between progress writes
const PROGRESS_EVERY: usize = 25;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("could not read sheet: {0}")]
    Parse(#[from] ImportError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result of one processed job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: JobProgress,
}

pub struct ImportWorker {
    pool: PgPool,
    client: reqwest::Client,
    poll_interval: Duration,
}

impl ImportWorker {
    pub fn new(pool: PgPool, poll_interval: Duration) -> Self {
        Self {
            pool,
            client: reqwest::Client::new(),
            poll_interval,
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Process pending jobs until `shutdown` is cancelled.
    #[tracing::instrument(skip_all, name = "worker.coach_import")]
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Starting coach import worker"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            match self.run_once().await {
                // More jobs may be queued; poll again right away
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "coach import iteration failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        tracing::info!("Coach import worker stopped");
    }

    /// Claim and process one pending job. `None` when the queue is empty.
    pub async fn run_once(&self) -> Result<Option<JobOutcome>, WorkerError> {
        let jobs = CoachImportJobRepo::new(&self.pool);
        let Some(job) = jobs.claim_next().await? else {
            return Ok(None);
        };

        match self.process(&job).await {
            Ok((progress, errors)) => {
                jobs.complete(job.id, progress, &errors).await?;
                Ok(Some(JobOutcome {
                    job_id: job.id,
                    status: JobStatus::Completed,
                    progress,
                }))
            }
            Err(e) => {
                jobs.fail(job.id, &e.to_string()).await?;
                Ok(Some(JobOutcome {
                    job_id: job.id,
                    status: JobStatus::Failed,
                    progress: JobProgress::default(),
                }))
            }
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, WorkerError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        tracing::debug!(bytes = body.len(), "downloaded import sheet");
        Ok(body.to_vec())
    }

    async fn process(
        &self,
        job: &CoachImportJob,
    ) -> Result<(JobProgress, Vec<RowError>), WorkerError> {
        let jobs = CoachImportJobRepo::new(&self.pool);
        let body = self.download(&job.file_url).await?;
        let ImportReport {
            rows,
            mut errors,
            total_rows,
        } = parse_coach_rows(body.as_slice())?;

        let mut progress = JobProgress {
            total_rows,
            processed_rows: errors.len(),
            success_rows: 0,
            error_rows: errors.len(),
        };
        jobs.record_progress(job.id, progress).await?;

        let mut universities = UniversityCache::default();
        let (mut inserted, mut updated) = (0usize, 0usize);
        for coach in &rows {
            match self.import_coach(coach, &mut universities).await {
                Ok(Upserted::Inserted(_)) => {
                    inserted += 1;
                    progress.success_rows += 1;
                }
                Ok(Upserted::Updated(_)) => {
                    updated += 1;
                    progress.success_rows += 1;
                }
                Err(e) => {
                    tracing::debug!(row = coach.row, error = %e, "coach row rejected");
                    progress.error_rows += 1;
                    errors.push(RowError {
                        row: coach.row,
                        message: e.to_string(),
                    });
                }
            }
            progress.processed_rows += 1;
            if progress.processed_rows % PROGRESS_EVERY == 0 {
                jobs.record_progress(job.id, progress).await?;
            }
        }

        errors.sort_by_key(|e| e.row);
        tracing::info!(
            job_id = %job.id,
            inserted,
            updated,
            errors = errors.len(),
            unmatched_universities = universities.misses(),
            "processed coach sheet"
        );
        Ok((progress, errors))
    }

    async fn import_coach(
        &self,
        coach: &NormalizedCoach,
        universities: &mut UniversityCache,
    ) -> Result<Upserted, DbError> {
        let university_id = match coach.university_name.as_deref() {
            Some(name) => universities.resolve(&self.pool, name).await?,
            None => None,
        };

        let mut tx = self.pool.begin().await?;
        let program_id = match (university_id, coach.program_gender.as_deref()) {
            (Some(university_id), Some(gender)) => {
                find_for_university(&mut tx, university_id, gender).await?
            }
            _ => None,
        };
        let upserted = upsert_imported(&mut tx, coach, university_id, program_id).await?;
        tx.commit().await?;
        Ok(upserted)
    }
}

/// University ids by lowercased name, misses included, for one sheet.
#[derive(Debug, Default)]
struct UniversityCache {
    ids: HashMap<String, Option<Uuid>>,
}

impl UniversityCache {
    async fn resolve(&mut self, pool: &PgPool, name: &str) -> Result<Option<Uuid>, DbError> {
        let key = name.trim().to_lowercase();
        if let Some(id) = self.ids.get(&key) {
            return Ok(*id);
        }
        let id = find_id_by_name(pool, name).await?;
        if id.is_none() {
            tracing::debug!(university = name, "no university with this name");
        }
        self.ids.insert(key, id);
        Ok(id)
    }

    fn misses(&self) -> usize {
        self.ids.values().filter(|id| id.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_counts_misses() {
        let mut cache = UniversityCache::default();
        cache.ids.insert("state university".into(), Some(Uuid::new_v4()));
        cache.ids.insert("nowhere college".into(), None);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn worker_error_messages() {
        let err = WorkerError::Parse(ImportError::MissingColumn {
            column: "name",
            found: vec!["email".into()],
        });
        assert_eq!(
            err.to_string(),
            "could not read sheet: missing required column 'name' (found: email)"
        );
    }
}
