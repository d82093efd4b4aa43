//! Job creation wizard handlers (`/configure`)

use axum::{extract::State, http::StatusCode, Json};
use scrapedeck_common::{
    errors::Result,
    platform::Platform,
    recents::RecentJob,
    workflow::{JobForm, WizardState},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_request;
use crate::session::OperatorSession;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct JobFormRequest {
    #[validate(length(min = 1, max = 200, message = "Influencer name is required"))]
    pub influencer_name: String,

    pub platform: Platform,

    #[validate(range(min = 1, max = 100, message = "Number of VAs must be at least 1"))]
    pub num_vas: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BaseLinkRequest {
    #[validate(length(min = 1, message = "Airtable link is required"))]
    pub base_url: String,
}

#[derive(Serialize)]
pub struct PlatformOption {
    pub value: Platform,
    pub label: &'static str,
}

#[derive(Serialize)]
pub struct ConfigureResponse {
    pub wizard: WizardState,
    pub progress: u8,
    pub in_flight: bool,
    pub platforms: Vec<PlatformOption>,
    pub recents: Vec<RecentJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

fn snapshot(state: &AppState, session: &OperatorSession) -> ConfigureResponse {
    let wizard = session.0.wizard.state();
    ConfigureResponse {
        progress: wizard.progress(),
        wizard,
        in_flight: session.0.wizard.is_in_flight(),
        platforms: Platform::enabled()
            .map(|p| PlatformOption { value: p, label: p.label() })
            .collect(),
        recents: state.recents.list(),
        redirect: session.0.redirect(),
    }
}

/// Current wizard state
pub async fn get_configure(
    State(state): State<AppState>,
    session: OperatorSession,
) -> Json<ConfigureResponse> {
    Json(snapshot(&state, &session))
}

/// Submit the job form
pub async fn submit_form(
    State(state): State<AppState>,
    session: OperatorSession,
    Json(request): Json<JobFormRequest>,
) -> Result<Json<ConfigureResponse>> {
    validate_request(&request)?;

    session.0.clear_redirect();
    session.0.wizard.submit_form(JobForm {
        influencer: request.influencer_name,
        platform: request.platform,
        num_vas: request.num_vas,
    })?;

    Ok(Json(snapshot(&state, &session)))
}

/// Submit the base link and start provisioning
pub async fn submit_link(
    State(state): State<AppState>,
    session: OperatorSession,
    Json(request): Json<BaseLinkRequest>,
) -> Result<(StatusCode, Json<ConfigureResponse>)> {
    validate_request(&request)?;

    let slot = session.0.redirect_slot();
    let session_id = session.0.id;
    session.0.wizard.submit_link(&request.base_url, move |job_id| {
        let target = match job_id {
            Some(id) => format!("/callum-dashboard?job={}", id),
            None => "/callum-dashboard".to_string(),
        };
        tracing::info!(session_id = %session_id, redirect = %target, "Job creation finished");
        *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(target);
    })?;

    Ok((StatusCode::ACCEPTED, Json(snapshot(&state, &session))))
}

/// Back out of the link step
pub async fn cancel(
    State(state): State<AppState>,
    session: OperatorSession,
) -> Result<Json<ConfigureResponse>> {
    session.0.wizard.cancel()?;
    Ok(Json(snapshot(&state, &session)))
}
