//! Job list and job status handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use scrapedeck_common::{
    db::{
        models::{JobStatus, ScrapingJob},
        JobStatistics, JobUpdate, JobWithStats,
    },
    errors::{AppError, Result},
    platform::Platform,
    tenant::{BaseId, TenantContext},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PlatformJobsQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobsQuery {
    pub search: Option<String>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: JobStatus,
}

#[derive(Serialize)]
pub struct JobListResponse {
    pub platform: Platform,
    pub label: &'static str,
    pub enabled: bool,
    pub jobs: Vec<JobWithStats>,
}

#[derive(Serialize)]
pub struct JobDetailResponse {
    #[serde(flatten)]
    pub job: ScrapingJob,
    pub display_name: String,
    pub status_label: &'static str,
    pub is_legacy: bool,
    /// Absent when statistics could not be computed
    pub stats: Option<JobStatistics>,
}

#[derive(Serialize)]
pub struct ActiveJobResponse {
    pub job: Option<JobWithStats>,
    pub base_id: Option<BaseId>,
}

/// Per-platform job table (`/instagram-jobs`, `/threads-jobs`, ...)
pub async fn list_platform_jobs(
    platform: Platform,
    state: AppState,
    query: PlatformJobsQuery,
) -> Result<Json<JobListResponse>> {
    let jobs = state
        .repo
        .list_jobs_by_platform(platform, query.active_only)
        .await?;

    // One statistics request per job, all in flight together
    let jobs = state.repo.attach_stats(jobs).await;

    Ok(Json(JobListResponse {
        platform,
        label: platform.spec().display_label,
        enabled: platform.is_enabled(),
        jobs,
    }))
}

/// All jobs, optionally filtered by influencer search or status
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Vec<JobWithStats>>> {
    let jobs = match (query.search.as_deref().map(str::trim), query.status) {
        (Some(term), _) if !term.is_empty() => state.repo.search_jobs_by_influencer(term).await?,
        (_, Some(status)) => state.repo.list_jobs_by_status(status).await?,
        _ => return Ok(Json(state.repo.jobs_with_stats().await?)),
    };
    Ok(Json(state.repo.attach_stats(jobs).await))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobDetailResponse>> {
    let job = state.repo.get_job(job_id).await?;
    let stats = state.repo.statistics_for(&job).await;

    Ok(Json(JobDetailResponse {
        display_name: job.display_name(),
        status_label: job.job_status().label(),
        is_legacy: job.is_legacy(),
        job,
        stats,
    }))
}

/// Job linked to an external base
pub async fn get_job_by_base(
    State(state): State<AppState>,
    Path(base_id): Path<String>,
) -> Result<Json<JobWithStats>> {
    let base_id = BaseId::parse(&base_id)?;
    let job = state
        .repo
        .find_job_by_base_id(&base_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            resource_type: "job".to_string(),
            id: base_id.to_string(),
        })?;

    let stats = state.repo.statistics_for(&job).await.unwrap_or_default();
    Ok(Json(JobWithStats { job, stats }))
}

/// Job the sidebar opens by default
pub async fn active_job(State(state): State<AppState>) -> Result<Json<ActiveJobResponse>> {
    let Some(job) = state.repo.find_active_job().await? else {
        return Ok(Json(ActiveJobResponse { job: None, base_id: None }));
    };

    let base_id = BaseId::parse(&job.base_id).ok();
    let job = state.repo.attach_stats(vec![job]).await.pop();
    Ok(Json(ActiveJobResponse { job, base_id }))
}

/// Statistics for the caller's tenant; `null` when unavailable
pub async fn tenant_stats(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Json<Option<JobStatistics>> {
    Json(state.repo.tenant_statistics(&ctx).await)
}

/// Partial update
pub async fn update_job(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(job_id): Path<Uuid>,
    Json(update): Json<JobUpdate>,
) -> Result<Json<ScrapingJob>> {
    Ok(Json(state.repo.update_job(&ctx, job_id, update).await?))
}

pub async fn set_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(job_id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<ScrapingJob>> {
    Ok(Json(
        state.repo.update_job_status(&ctx, job_id, request.status).await?,
    ))
}

pub async fn pause_job(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ScrapingJob>> {
    Ok(Json(state.repo.pause_job(&ctx, job_id).await?))
}

pub async fn activate_job(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ScrapingJob>> {
    Ok(Json(state.repo.activate_job(&ctx, job_id).await?))
}

/// Jobs are never hard-deleted
pub async fn archive_job(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ScrapingJob>> {
    Ok(Json(state.repo.archive_job(&ctx, job_id).await?))
}
