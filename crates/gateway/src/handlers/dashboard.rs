//! Dashboard handlers (`/callum-dashboard?job=<id>`)
//!
//! The dashboard composes job details, statistics, the account finder and
//! campaign data for one job. Page state lives in the caller's session and
//! is cleared whenever a different job is opened.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use scrapedeck_common::{
    db::{
        models::{Campaign, DailyAssignment, GlobalUsername, ScrapingJob},
        JobStatistics, NewAssignment,
    },
    errors::{AppError, Result},
    finder::{AccountFinder, FindResult, FinderProgress, SeedAccount},
    tenant::TenantContext,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validate_request;
use crate::session::{DashboardPage, OperatorSession};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct JobQuery {
    pub job: Option<Uuid>,
}

impl JobQuery {
    fn require(&self) -> Result<Uuid> {
        self.job.ok_or_else(|| AppError::MissingField {
            field: "job".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub job: Uuid,
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddAccountRequest {
    #[validate(length(min = 1, max = 500))]
    pub input: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScrapeCountRequest {
    #[validate(range(min = 1, max = 10000, message = "Please enter a valid number of accounts to scrape (greater than 0)."))]
    pub total_scrape_count: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignRequest {
    #[validate(length(min = 1))]
    pub campaign_id: String,
    pub assignments: Vec<NewAssignment>,
}

#[derive(Serialize)]
pub struct FinderView {
    pub platform: String,
    pub accounts: Vec<SeedAccount>,
    pub total_scrape_count: u32,
    pub progress: FinderProgress,
}

#[derive(Serialize)]
pub struct JobHeader {
    #[serde(flatten)]
    pub job: ScrapingJob,
    pub display_name: String,
    pub status_label: &'static str,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub job: Option<JobHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Absent when statistics could not be computed
    pub stats: Option<JobStatistics>,
    pub campaigns: Vec<Campaign>,
    pub finder: Option<FinderView>,
    pub last_result: Option<FindResult>,
}

#[derive(Serialize)]
pub struct FindResponse {
    pub summary: String,
    pub result: FindResult,
}

#[derive(Serialize)]
pub struct AssignResponse {
    pub assigned: u64,
    pub marked_used: u64,
}

/// Job plus its tenant context. Rows without a partition key have none.
async fn load_job(state: &AppState, job_id: Uuid) -> Result<(ScrapingJob, Option<TenantContext>)> {
    let job = state.repo.get_job(job_id).await?;
    let ctx = TenantContext::from_raw(&job.base_id).ok();
    Ok((job, ctx))
}

fn tenant_of(ctx: Option<TenantContext>) -> Result<TenantContext> {
    ctx.ok_or(AppError::MissingTenant)
}

/// Enter the page for `job`, resetting state left by another job
fn enter<'a>(
    pages: &'a mut scrapedeck_common::reset::Scoped<Uuid, DashboardPage>,
    job: &ScrapingJob,
) -> &'a mut DashboardPage {
    let page = pages.enter(job.job_id);
    let platform = job.platform().unwrap_or_default();
    if page.finder.platform() != platform {
        page.finder = AccountFinder::new(platform);
    }
    page
}

fn finder_view(state: &AppState, finder: &AccountFinder) -> FinderView {
    FinderView {
        platform: finder.platform().label().to_string(),
        accounts: finder.accounts().to_vec(),
        total_scrape_count: finder.total_scrape_count(&state.config.finder),
        progress: finder.progress(),
    }
}

/// Dashboard for the job in `?job=`
pub async fn get_dashboard(
    State(state): State<AppState>,
    session: OperatorSession,
    Query(query): Query<JobQuery>,
) -> Result<Json<DashboardResponse>> {
    let Some(job_id) = query.job else {
        session.0.dashboard.lock().await.leave();
        return Ok(Json(DashboardResponse {
            job: None,
            message: Some(
                "Please select a scraping job from the sidebar to view its dashboard.".to_string(),
            ),
            stats: None,
            campaigns: Vec::new(),
            finder: None,
            last_result: None,
        }));
    };

    let (job, ctx) = load_job(&state, job_id).await?;
    session.0.viewing(job.job_id);

    let (stats, campaigns) = match &ctx {
        Some(ctx) => {
            let (stats, campaigns) =
                tokio::join!(state.repo.statistics_for(&job), state.repo.list_campaigns(ctx));
            (stats, campaigns?)
        }
        None => (state.repo.statistics_for(&job).await, Vec::new()),
    };

    let mut pages = session.0.dashboard.lock().await;
    let page = enter(&mut pages, &job);
    let finder = finder_view(&state, &page.finder);
    let last_result = page.last_result.clone();
    drop(pages);

    Ok(Json(DashboardResponse {
        job: Some(JobHeader {
            display_name: job.display_name(),
            status_label: job.job_status().label(),
            job,
        }),
        message: None,
        stats,
        campaigns,
        finder: Some(finder),
        last_result,
    }))
}

/// Navigate away from the dashboard
pub async fn leave_dashboard(session: OperatorSession) -> StatusCode {
    session.0.dashboard.lock().await.leave();
    StatusCode::NO_CONTENT
}

/// Add a seed account by username or profile URL
pub async fn add_account(
    State(state): State<AppState>,
    session: OperatorSession,
    Query(query): Query<JobQuery>,
    Json(request): Json<AddAccountRequest>,
) -> Result<(StatusCode, Json<FinderView>)> {
    validate_request(&request)?;
    let (job, _) = load_job(&state, query.require()?).await?;

    let mut pages = session.0.dashboard.lock().await;
    let page = enter(&mut pages, &job);
    page.finder.add_account(&request.input)?;
    Ok((StatusCode::CREATED, Json(finder_view(&state, &page.finder))))
}

pub async fn remove_account(
    State(state): State<AppState>,
    session: OperatorSession,
    Path(account_id): Path<u64>,
    Query(query): Query<JobQuery>,
) -> Result<Json<FinderView>> {
    let (job, _) = load_job(&state, query.require()?).await?;

    let mut pages = session.0.dashboard.lock().await;
    let page = enter(&mut pages, &job);
    page.finder
        .remove_account(account_id)
        .ok_or_else(|| AppError::NotFound {
            resource_type: "account".to_string(),
            id: account_id.to_string(),
        })?;
    Ok(Json(finder_view(&state, &page.finder)))
}

/// Merge the tenant's saved seed accounts into the list
pub async fn load_source_profiles(
    State(state): State<AppState>,
    session: OperatorSession,
    Query(query): Query<JobQuery>,
) -> Result<Json<FinderView>> {
    let (job, ctx) = load_job(&state, query.require()?).await?;
    let ctx = tenant_of(ctx)?;

    let profiles = state.repo.list_source_profiles(&ctx).await?;

    let mut pages = session.0.dashboard.lock().await;
    let page = enter(&mut pages, &job);
    let added = page.finder.merge_profiles(&profiles);
    tracing::info!(job_id = %job.job_id, base_id = %ctx.base_id(), added, "Source profiles merged");
    Ok(Json(finder_view(&state, &page.finder)))
}

pub async fn set_scrape_count(
    State(state): State<AppState>,
    session: OperatorSession,
    Query(query): Query<JobQuery>,
    Json(request): Json<ScrapeCountRequest>,
) -> Result<Json<FinderView>> {
    validate_request(&request)?;
    let (job, _) = load_job(&state, query.require()?).await?;

    let mut pages = session.0.dashboard.lock().await;
    let page = enter(&mut pages, &job);
    page.finder.set_total_scrape_count(request.total_scrape_count);
    Ok(Json(finder_view(&state, &page.finder)))
}

/// Scrape followers of the seed accounts and ingest them
pub async fn find_accounts(
    State(state): State<AppState>,
    session: OperatorSession,
    Query(query): Query<JobQuery>,
) -> Result<Json<FindResponse>> {
    let (job, ctx) = load_job(&state, query.require()?).await?;
    let ctx = tenant_of(ctx)?;

    // The page lock is not held across the remote calls
    let run = {
        let mut pages = session.0.dashboard.lock().await;
        let page = enter(&mut pages, &job);
        page.last_result = None;
        page.finder.runner(&state.config.finder)?
    };

    let result = run.run(&ctx, state.api.as_ref()).await?;

    let mut pages = session.0.dashboard.lock().await;
    if pages.key() == Some(&job.job_id) {
        enter(&mut pages, &job).last_result = Some(result.clone());
    }

    Ok(Json(FindResponse {
        summary: result.summary(),
        result,
    }))
}

/// Usernames in the job's pool
pub async fn list_usernames(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<Vec<GlobalUsername>>> {
    let (job, ctx) = load_job(&state, query.job).await?;
    let ctx = tenant_of(ctx)?;
    let usernames = state.repo.job_usernames(&ctx, job.job_id, query.available).await?;
    Ok(Json(usernames))
}

pub async fn list_assignments(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Result<Json<Vec<DailyAssignment>>> {
    let (job, ctx) = load_job(&state, query.require()?).await?;
    let ctx = tenant_of(ctx)?;
    Ok(Json(state.repo.job_assignments(&ctx, job.job_id).await?))
}

/// Place accounts into VA table slots and flag them used
pub async fn assign_accounts(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
    Json(request): Json<AssignRequest>,
) -> Result<(StatusCode, Json<AssignResponse>)> {
    validate_request(&request)?;
    let (job, ctx) = load_job(&state, query.require()?).await?;
    let ctx = tenant_of(ctx)?;

    let ids: Vec<String> = request.assignments.iter().map(|a| a.id.clone()).collect();
    let assigned = state
        .repo
        .create_assignments(&ctx, job.job_id, &request.campaign_id, request.assignments)
        .await?;
    let marked_used = state.repo.mark_usernames_used(&ctx, &ids).await?;

    Ok((StatusCode::CREATED, Json(AssignResponse { assigned, marked_used })))
}

pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Result<Json<Vec<Campaign>>> {
    let (_, ctx) = load_job(&state, query.require()?).await?;
    let ctx = tenant_of(ctx)?;
    Ok(Json(state.repo.list_campaigns(&ctx).await?))
}
