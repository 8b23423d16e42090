//! Entity paths

use std::sync::Arc;

use axum::Router;

use super::crud::crud_router;
use crate::db::repos::{
    Applications, Athletes, BallKnowledge, CampaignLeads, Campaigns, Clients, Coaches, Contacts,
    Programs, TeamMembers, Universities, UniversityJobs,
};
use crate::http::server::AppState;

/// CRUD, query and facet routes for every writable entity
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crud_router::<Athletes>("/athletes"))
        .merge(crud_router::<Universities>("/universities"))
        .merge(crud_router::<Programs>("/programs"))
        .merge(crud_router::<Coaches>("/coaches"))
        .merge(crud_router::<UniversityJobs>("/university-jobs"))
        .merge(crud_router::<Applications>("/applications"))
        .merge(crud_router::<Campaigns>("/campaigns"))
        .merge(crud_router::<CampaignLeads>("/campaign-leads"))
        .merge(crud_router::<Contacts>("/contacts"))
        .merge(crud_router::<TeamMembers>("/team-members"))
        .merge(crud_router::<Clients>("/clients"))
        .merge(crud_router::<BallKnowledge>("/ball-knowledge"))
}
