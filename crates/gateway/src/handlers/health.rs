//! Liveness and readiness

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependency {
    Up,
    Down,
}

#[derive(Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub job_store: StoreCheck,
    pub scraper_api: ApiTarget,
    pub open_sessions: usize,
}

#[derive(Serialize)]
pub struct StoreCheck {
    pub state: Dependency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where outbound scraping calls go. Not checked: the API is only needed
/// for job creation and account search.
#[derive(Serialize)]
pub struct ApiTarget {
    pub base_url: String,
    pub simulated: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<Liveness> {
    Json(Liveness {
        status: "healthy",
        service: state.config.observability.service_name.clone(),
        version: scrapedeck_common::VERSION,
    })
}

/// 503 until the job store answers
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let start = Instant::now();
    let job_store = match state.repo.ping().await {
        Ok(()) => StoreCheck {
            state: Dependency::Up,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Job store unreachable");
            StoreCheck {
                state: Dependency::Down,
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    };

    let ready = job_store.state == Dependency::Up;
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(Readiness {
            ready,
            job_store,
            scraper_api: ApiTarget {
                base_url: state.config.api.base_url.clone(),
                simulated: state.config.workflow.simulate,
            },
            open_sessions: state.sessions.len(),
        }),
    )
}
