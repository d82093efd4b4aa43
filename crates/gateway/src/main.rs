//! ScrapeDeck Dashboard Gateway
//!
//! JSON surface for the operator dashboard.
//! Handles:
//! - Operator sessions and the job creation wizard
//! - Job dashboards, account finder and campaign data
//! - Per-platform job lists and job status changes
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;
mod session;

use axum::{
    extract::{Query, State},
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use scrapedeck_common::{
    api::{ApiClient, ScraperApi},
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    metrics,
    platform::Platform,
    recents::{FileStore, RecentsStore},
    workflow::Provisioner,
};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handlers::jobs::PlatformJobsQuery;
use crate::session::SessionStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Arc<Repository>,
    pub api: Arc<dyn ScraperApi>,
    pub recents: RecentsStore,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        repo: Arc<Repository>,
        api: Arc<dyn ScraperApi>,
        recents: RecentsStore,
    ) -> Self {
        let provisioner = Provisioner::new(
            Arc::clone(&api),
            repo.clone(),
            recents.clone(),
            config.workflow.clone(),
        );

        Self {
            sessions: SessionStore::new(Arc::new(provisioner)),
            config,
            repo,
            api,
            recents,
        }
    }
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_api_call_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::UPSTREAM_BUCKETS,
        )?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting ScrapeDeck dashboard v{}",
        scrapedeck_common::VERSION
    );

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;
    let repo = Arc::new(Repository::new(db));

    let api: Arc<dyn ScraperApi> = Arc::new(ApiClient::new(&config.api)?);
    info!(base_url = %config.api.base_url, simulate = config.workflow.simulate, "Scraping API configured");

    let recents = RecentsStore::new(
        Arc::new(FileStore::new(&config.recents.path)),
        config.recents.capacity,
    );

    let state = AppState::new(config.clone(), repo, api, recents);
    state.sessions.spawn_sweeper(config.session_idle());

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let signalled = Arc::new(Notify::new());
    let notify = Arc::clone(&signalled);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        notify.notify_one();
    });

    if !drain_with_deadline(server.into_future(), signalled, config.shutdown_timeout()).await? {
        warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Open connections did not drain in time, shutting down anyway"
        );
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Session endpoints
        .route("/sessions", post(handlers::sessions::create_session))
        .route(
            "/sessions/{session_id}",
            get(handlers::sessions::get_session).delete(handlers::sessions::delete_session),
        )

        // Job creation wizard
        .route("/configure", get(handlers::configure::get_configure))
        .route("/configure/form", post(handlers::configure::submit_form))
        .route("/configure/link", post(handlers::configure::submit_link))
        .route("/configure/cancel", post(handlers::configure::cancel))

        // Dashboard
        .route(
            "/callum-dashboard",
            get(handlers::dashboard::get_dashboard).delete(handlers::dashboard::leave_dashboard),
        )
        .route("/callum-dashboard/accounts", post(handlers::dashboard::add_account))
        .route("/callum-dashboard/accounts/load", post(handlers::dashboard::load_source_profiles))
        .route(
            "/callum-dashboard/accounts/{account_id}",
            delete(handlers::dashboard::remove_account),
        )
        .route("/callum-dashboard/scrape-count", put(handlers::dashboard::set_scrape_count))
        .route("/callum-dashboard/find", post(handlers::dashboard::find_accounts))
        .route("/callum-dashboard/usernames", get(handlers::dashboard::list_usernames))
        .route(
            "/callum-dashboard/assignments",
            get(handlers::dashboard::list_assignments).post(handlers::dashboard::assign_accounts),
        )
        .route("/callum-dashboard/campaigns", get(handlers::dashboard::list_campaigns))

        // Jobs
        .route("/jobs", get(handlers::jobs::list_jobs))
        .route("/jobs/active", get(handlers::jobs::active_job))
        .route("/jobs/stats", get(handlers::jobs::tenant_stats))
        .route("/jobs/by-base/{base_id}", get(handlers::jobs::get_job_by_base))
        .route(
            "/jobs/{job_id}",
            get(handlers::jobs::get_job)
                .patch(handlers::jobs::update_job)
                .delete(handlers::jobs::archive_job),
        )
        .route("/jobs/{job_id}/status", post(handlers::jobs::set_status))
        .route("/jobs/{job_id}/pause", post(handlers::jobs::pause_job))
        .route("/jobs/{job_id}/activate", post(handlers::jobs::activate_job))

        // Recents
        .route(
            "/recents",
            get(handlers::recents::list_recents).delete(handlers::recents::clear_recents),
        )
        .route("/recents/{job_id}", delete(handlers::recents::remove_recent));

    // Per-platform job lists
    for platform in Platform::ALL {
        routes = routes.route(
            platform.spec().route,
            get(
                move |State(state): State<AppState>, Query(query): Query<PlatformJobsQuery>| {
                    handlers::jobs::list_platform_jobs(platform, state, query)
                },
            ),
        );
    }

    let request_timeout = state.config.request_timeout();

    // Compose the app
    routes
        .route_layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Run the server until it exits. Once shutdown is signalled it gets
/// `deadline` to drain; returns false if it had to be abandoned.
async fn drain_with_deadline<F>(server: F, signalled: Arc<Notify>, deadline: Duration) -> std::io::Result<bool>
where
    F: Future<Output = std::io::Result<()>>,
{
    let expired = async {
        signalled.notified().await;
        tokio::time::sleep(deadline).await;
    };

    tokio::select! {
        result = server => result.map(|_| true),
        _ = expired => Ok(false),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
