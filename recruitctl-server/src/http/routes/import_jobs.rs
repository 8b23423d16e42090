//! Coach import jobs
//!
//! Jobs are created by the dashboard after it uploads the sheet; status
//! and counters are written by the import worker only.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use recruitctl_core::ListQuery;

use super::crud::ListParams;
use crate::db::repos::{CoachImportJob, CoachImportJobRepo, CoachImportJobs, NewImportJob};
use crate::db::EntityRepo;
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidQuery, ValidUuid};
use crate::http::server::AppState;
use crate::models::Paginated;

/// GET /coach-import-jobs
async fn list_jobs(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<Paginated<CoachImportJob>>, ApiError> {
    let query = params.into_query()?;
    let jobs = EntityRepo::<CoachImportJobs>::new(&state.pool)
        .list(&query)
        .await?;
    Ok(Json(jobs))
}

/// POST /coach-import-jobs/query
async fn query_jobs(
    State(state): State<Arc<AppState>>,
    ValidJson(query): ValidJson<ListQuery>,
) -> Result<Json<Paginated<CoachImportJob>>, ApiError> {
    let jobs = EntityRepo::<CoachImportJobs>::new(&state.pool)
        .list(&query)
        .await?;
    Ok(Json(jobs))
}

/// POST /coach-import-jobs - queue a job
async fn create_job(
    State(state): State<Arc<AppState>>,
    ValidJson(new): ValidJson<NewImportJob>,
) -> Result<(StatusCode, Json<CoachImportJob>), ApiError> {
    let job = CoachImportJobRepo::new(&state.pool).create(new).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /coach-import-jobs/{id}
async fn get_job(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<CoachImportJob>, ApiError> {
    let job = EntityRepo::<CoachImportJobs>::new(&state.pool).get(id).await?;
    Ok(Json(job))
}

/// DELETE /coach-import-jobs/{id}
async fn delete_job(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    EntityRepo::<CoachImportJobs>::new(&state.pool)
        .soft_delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/coach-import-jobs", get(list_jobs).post(create_job))
        .route("/coach-import-jobs/query", post(query_jobs))
        .route("/coach-import-jobs/{id}", get(get_job).delete(delete_job))
}
