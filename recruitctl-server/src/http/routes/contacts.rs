//! Contact to athlete links

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use crate::db::repos::{ContactAthlete, ContactRepo, LinkAthlete};
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidUuid, ValidUuidPair};
use crate::http::server::AppState;

/// GET /contacts/{id}/athletes
async fn list_athletes(
    State(state): State<Arc<AppState>>,
    ValidUuid(contact_id): ValidUuid,
) -> Result<Json<Vec<ContactAthlete>>, ApiError> {
    let links = ContactRepo::new(&state.pool).list_athletes(contact_id).await?;
    Ok(Json(links))
}

/// POST /contacts/{id}/athletes - link, or update an existing link
async fn link_athlete(
    State(state): State<Arc<AppState>>,
    ValidUuid(contact_id): ValidUuid,
    ValidJson(link): ValidJson<LinkAthlete>,
) -> Result<(StatusCode, Json<ContactAthlete>), ApiError> {
    let linked = ContactRepo::new(&state.pool)
        .link_athlete(contact_id, link)
        .await?;
    Ok((StatusCode::CREATED, Json(linked)))
}

/// DELETE /contacts/{id}/athletes/{athlete_id}
async fn unlink_athlete(
    State(state): State<Arc<AppState>>,
    ValidUuidPair(contact_id, athlete_id): ValidUuidPair,
) -> Result<StatusCode, ApiError> {
    ContactRepo::new(&state.pool)
        .unlink_athlete(contact_id, athlete_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Contact link routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/contacts/{id}/athletes",
            get(list_athletes).post(link_athlete),
        )
        .route("/contacts/{id}/athletes/{athlete_id}", delete(unlink_athlete))
}
