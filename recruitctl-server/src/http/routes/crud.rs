//! Generic entity endpoints
//!
//! `crud_router::<E>("/athletes")` mounts list, query, facets, create, get,
//! patch and delete for one entity.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use recruitctl_core::filters::parse_sort_param;
use recruitctl_core::{FacetMap, FacetRequest, FilterError, ListQuery};
use serde::Deserialize;

use crate::db::{EntityRepo, EntityWrite};
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidQuery, ValidUuid};
use crate::http::server::AppState;
use crate::models::Paginated;

/// Query string of `GET /{entity}`
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// `column`, `column.desc` or a comma-separated list of them
    pub sort: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn into_query(self) -> Result<ListQuery, FilterError> {
        let sort = match self.sort.as_deref() {
            Some(sort) => parse_sort_param(sort)?,
            None => Vec::new(),
        };
        Ok(ListQuery {
            filters: Vec::new(),
            sort,
            search: self.search,
            page: self.page,
            per_page: self.per_page,
        })
    }
}

/// GET /{entity}
async fn list<E: EntityWrite>(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<Paginated<E::Row>>, ApiError> {
    let query = params.into_query()?;
    let page = EntityRepo::<E>::new(&state.pool).list(&query).await?;
    Ok(Json(page))
}

/// POST /{entity}/query
async fn query<E: EntityWrite>(
    State(state): State<Arc<AppState>>,
    ValidJson(query): ValidJson<ListQuery>,
) -> Result<Json<Paginated<E::Row>>, ApiError> {
    let page = EntityRepo::<E>::new(&state.pool).list(&query).await?;
    Ok(Json(page))
}

/// POST /{entity}/facets
async fn facets<E: EntityWrite>(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<FacetRequest>,
) -> Result<Json<FacetMap>, ApiError> {
    let facets = EntityRepo::<E>::new(&state.pool).facets(&request).await?;
    Ok(Json(facets))
}

/// POST /{entity}
async fn create<E: EntityWrite>(
    State(state): State<Arc<AppState>>,
    ValidJson(new): ValidJson<E::New>,
) -> Result<(StatusCode, Json<E::Row>), ApiError> {
    let repo = EntityRepo::<E>::new(&state.pool);
    let row = E::create(&repo, new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /{entity}/{id}
async fn get_one<E: EntityWrite>(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<E::Row>, ApiError> {
    let row = EntityRepo::<E>::new(&state.pool).get(id).await?;
    Ok(Json(row))
}

/// PATCH /{entity}/{id}
async fn update<E: EntityWrite>(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    ValidJson(patch): ValidJson<E::Patch>,
) -> Result<Json<E::Row>, ApiError> {
    let repo = EntityRepo::<E>::new(&state.pool);
    let row = E::update(&repo, id, patch).await?;
    Ok(Json(row))
}

/// DELETE /{entity}/{id}
async fn delete<E: EntityWrite>(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    EntityRepo::<E>::new(&state.pool).soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// All entity routes under `path`.
pub fn crud_router<E: EntityWrite>(path: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(path, get(list::<E>).post(create::<E>))
        .route(&format!("{path}/query"), post(query::<E>))
        .route(&format!("{path}/facets"), post(facets::<E>))
        .route(
            &format!("{path}/{{id}}"),
            get(get_one::<E>).patch(update::<E>).delete(delete::<E>),
        )
}
