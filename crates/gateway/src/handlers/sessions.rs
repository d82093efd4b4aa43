//! Session management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use scrapedeck_common::{errors::Result, workflow::WizardState};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;

#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub created_at: String,
    pub wizard: WizardState,
    /// Job whose dashboard is open, if any
    pub dashboard_job: Option<Uuid>,
}

/// Open an operator session
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session = state.sessions.create();
    tracing::info!(session_id = %session.id, "Session created");

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            created_at: session.created_at.to_rfc3339(),
        }),
    )
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let session = state.sessions.get(session_id)?;
    let dashboard_job = session.dashboard.lock().await.key().copied();

    Ok(Json(SessionResponse {
        session_id: session.id,
        created_at: session.created_at.to_rfc3339(),
        wizard: session.wizard.state(),
        dashboard_job,
    }))
}

/// Close a session, tearing down its pages
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode> {
    let session = state.sessions.remove(session_id)?;
    session.dashboard.lock().await.leave();
    tracing::info!(session_id = %session_id, "Session closed");
    Ok(StatusCode::NO_CONTENT)
}
