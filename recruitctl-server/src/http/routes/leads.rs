//! Bulk campaign lead creation

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

use crate::db::repos::{bulk_create, BulkLeadsRequest, CampaignLead};
use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::http::server::AppState;

/// POST /campaign-leads/bulk - all leads or none
async fn create_bulk(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<BulkLeadsRequest>,
) -> Result<(StatusCode, Json<Vec<CampaignLead>>), ApiError> {
    let leads = bulk_create(&state.pool, request).await?;
    Ok((StatusCode::CREATED, Json(leads)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/campaign-leads/bulk", post(create_bulk))
}
