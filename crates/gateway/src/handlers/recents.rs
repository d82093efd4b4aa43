//! Recently created jobs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use scrapedeck_common::recents::RecentJob;
use uuid::Uuid;

use crate::AppState;

pub async fn list_recents(State(state): State<AppState>) -> Json<Vec<RecentJob>> {
    Json(state.recents.list())
}

pub async fn remove_recent(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Json<Vec<RecentJob>> {
    Json(state.recents.remove(job_id))
}

pub async fn clear_recents(State(state): State<AppState>) -> StatusCode {
    state.recents.clear();
    StatusCode::NO_CONTENT
}
