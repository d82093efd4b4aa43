//! Repository pattern for database operations
//!
//! Writes to tenant-scoped tables take their `base_id` from the explicit
//! [`TenantContext`]; tenant-scoped reads filter on it. The `scraping_jobs`
//! table is the registry of tenants itself and is read unscoped.

use crate::db::models::*;
use crate::db::stats::{self, JobStatistics, LegacyJobScope, TenantScope};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::platform::Platform;
use crate::tenant::{BaseId, TenantContext};
use async_trait::async_trait;
use futures::future::join_all;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Input for a new job. The base id comes from the tenant context.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub influencer_name: String,
    pub platform: Platform,
    pub num_vas: Option<u32>,
    pub status: Option<JobStatus>,
}

/// Partial job update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    pub influencer_name: Option<String>,
    pub platform: Option<Platform>,
    pub airtable_base_id: Option<String>,
    pub num_vas: Option<u32>,
    pub status: Option<JobStatus>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Username to add to a job's pool
#[derive(Debug, Clone, Deserialize)]
pub struct NewUsername {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
}

/// Account to place in a VA table slot
#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub va_table_number: i32,
    pub position: i32,
}

/// Job row with computed statistics
#[derive(Debug, Clone, Serialize)]
pub struct JobWithStats {
    #[serde(flatten)]
    pub job: ScrapingJob,
    pub stats: JobStatistics,
}

/// Storage operations used by the job workflows
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a job for the context's tenant
    async fn create_job(&self, ctx: &TenantContext, job: NewJob) -> Result<ScrapingJob>;

    /// Saved seed accounts for the context's tenant, ordered by username
    async fn source_profiles(&self, ctx: &TenantContext) -> Result<Vec<SourceProfile>>;
}

/// Map a unique violation on the base id into the domain conflict
fn map_insert_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateBase { existing_job: None },
        _ => AppError::Database(err),
    }
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Job Operations
    // ========================================================================

    /// Insert a job row for the context's tenant
    pub async fn insert_job(&self, ctx: &TenantContext, input: NewJob) -> Result<ScrapingJob> {
        let now = chrono::Utc::now();
        let status = input.status.unwrap_or(JobStatus::Active);

        let job = ScrapingJobActiveModel {
            job_id: Set(Uuid::new_v4()),
            influencer_name: Set(input.influencer_name.trim().to_string()),
            platform: Set(input.platform.as_str().to_string()),
            airtable_base_id: Set(ctx.base_id().to_string()),
            base_id: Set(ctx.base_id().to_string()),
            num_vas: Set(input.num_vas.map(|n| n as i32)),
            status: Set(status.as_str().to_string()),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let job = job.insert(self.write_conn()).await.map_err(map_insert_err)?;

        info!(
            job_id = %job.job_id,
            base_id = %job.base_id,
            platform = %job.platform,
            "Scraping job created"
        );

        Ok(job)
    }

    /// Find job by ID
    pub async fn find_job(&self, job_id: Uuid) -> Result<Option<ScrapingJob>> {
        ScrapingJobEntity::find_by_id(job_id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find job by ID, failing when it does not exist
    pub async fn get_job(&self, job_id: Uuid) -> Result<ScrapingJob> {
        self.find_job(job_id)
            .await?
            .ok_or_else(|| AppError::JobNotFound { id: job_id.to_string() })
    }

    /// Find the job linked to an external base
    pub async fn find_job_by_base_id(&self, base_id: &BaseId) -> Result<Option<ScrapingJob>> {
        ScrapingJobEntity::find()
            .filter(ScrapingJobColumn::BaseId.eq(base_id.as_str()))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// All jobs, newest first
    pub async fn list_jobs(&self) -> Result<Vec<ScrapingJob>> {
        ScrapingJobEntity::find()
            .order_by_desc(ScrapingJobColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Jobs for one platform, newest first
    pub async fn list_jobs_by_platform(
        &self,
        platform: Platform,
        active_only: bool,
    ) -> Result<Vec<ScrapingJob>> {
        let mut query = ScrapingJobEntity::find()
            .filter(ScrapingJobColumn::Platform.eq(platform.as_str()));

        if active_only {
            query = query.filter(ScrapingJobColumn::Status.eq(JobStatus::Active.as_str()));
        }

        query
            .order_by_desc(ScrapingJobColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Jobs with the given status, newest first
    pub async fn list_jobs_by_status(&self, status: JobStatus) -> Result<Vec<ScrapingJob>> {
        ScrapingJobEntity::find()
            .filter(ScrapingJobColumn::Status.eq(status.as_str()))
            .order_by_desc(ScrapingJobColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Newest active job, falling back to the newest job of any status
    pub async fn find_active_job(&self) -> Result<Option<ScrapingJob>> {
        let active = ScrapingJobEntity::find()
            .filter(ScrapingJobColumn::Status.eq(JobStatus::Active.as_str()))
            .order_by_desc(ScrapingJobColumn::CreatedAt)
            .limit(1)
            .one(self.read_conn())
            .await?;

        if active.is_some() {
            return Ok(active);
        }

        ScrapingJobEntity::find()
            .order_by_desc(ScrapingJobColumn::CreatedAt)
            .limit(1)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Tenant identifier of the active job
    pub async fn active_base_id(&self) -> Result<Option<BaseId>> {
        Ok(self
            .find_active_job()
            .await?
            .and_then(|job| BaseId::parse(&job.base_id).ok()))
    }

    /// Case-insensitive substring search on influencer name
    pub async fn search_jobs_by_influencer(&self, term: &str) -> Result<Vec<ScrapingJob>> {
        let pattern = format!("%{}%", term.trim().to_lowercase());

        ScrapingJobEntity::find()
            .filter(Expr::expr(Func::lower(Expr::col(ScrapingJobColumn::InfluencerName))).like(pattern))
            .order_by_desc(ScrapingJobColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Partial update of a job owned by the context's tenant
    pub async fn update_job(
        &self,
        ctx: &TenantContext,
        job_id: Uuid,
        update: JobUpdate,
    ) -> Result<ScrapingJob> {
        let job = self.get_job(job_id).await?;
        ctx.ensure_owns(Some(&job.base_id))?;

        // The base id is also the tenant partition key
        if let Some(base) = update.airtable_base_id.as_deref() {
            if base.trim() != job.airtable_base_id {
                return Err(AppError::Validation {
                    message: "A job's Airtable base cannot be changed. Create a new job for the other base."
                        .to_string(),
                    field: Some("airtable_base_id".to_string()),
                });
            }
        }

        let current = job.job_status();
        let next_status = match update.status {
            Some(next) => Some(current.transition(next)?),
            None => None,
        };

        let unchanged = update.influencer_name.is_none()
            && update.platform.is_none()
            && update.num_vas.is_none()
            && next_status.map_or(true, |s| s == current);
        if unchanged {
            debug!(job_id = %job_id, "Job update is a no-op");
            return Ok(job);
        }

        let mut active: ScrapingJobActiveModel = job.into();
        if let Some(name) = update.influencer_name {
            active.influencer_name = Set(name.trim().to_string());
        }
        if let Some(platform) = update.platform {
            active.platform = Set(platform.as_str().to_string());
        }
        if let Some(num_vas) = update.num_vas {
            active.num_vas = Set(Some(num_vas as i32));
        }
        if let Some(status) = next_status {
            active.status = Set(status.as_str().to_string());
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = active.update(self.write_conn()).await.map_err(map_insert_err)?;

        info!(job_id = %job_id, status = %updated.status, "Scraping job updated");

        Ok(updated)
    }

    /// Change job status
    pub async fn update_job_status(
        &self,
        ctx: &TenantContext,
        job_id: Uuid,
        status: JobStatus,
    ) -> Result<ScrapingJob> {
        self.update_job(ctx, job_id, JobUpdate::status(status)).await
    }

    /// Soft delete
    pub async fn archive_job(&self, ctx: &TenantContext, job_id: Uuid) -> Result<ScrapingJob> {
        self.update_job_status(ctx, job_id, JobStatus::Archived).await
    }

    pub async fn pause_job(&self, ctx: &TenantContext, job_id: Uuid) -> Result<ScrapingJob> {
        self.update_job_status(ctx, job_id, JobStatus::Paused).await
    }

    pub async fn activate_job(&self, ctx: &TenantContext, job_id: Uuid) -> Result<ScrapingJob> {
        self.update_job_status(ctx, job_id, JobStatus::Active).await
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Statistics for the context's tenant
    pub async fn tenant_statistics(&self, ctx: &TenantContext) -> Option<JobStatistics> {
        stats::compute_statistics(self.read_conn(), &TenantScope(ctx.base_id.clone())).await
    }

    /// Statistics by job reference
    #[deprecated(note = "counts by job reference miss partitioned rows; use tenant_statistics")]
    pub async fn legacy_job_statistics(&self, job_id: Uuid) -> Option<JobStatistics> {
        stats::compute_statistics(self.read_conn(), &LegacyJobScope(job_id)).await
    }

    /// Statistics for a job row, preferring its partition key
    pub async fn statistics_for(&self, job: &ScrapingJob) -> Option<JobStatistics> {
        let scope = stats::scope_for_job(job);
        stats::compute_statistics(self.read_conn(), scope.as_ref()).await
    }

    /// Job plus statistics; `None` when either is unavailable
    pub async fn job_with_stats(&self, job_id: Uuid) -> Result<Option<JobWithStats>> {
        let Some(job) = self.find_job(job_id).await? else {
            return Ok(None);
        };
        Ok(self
            .statistics_for(&job)
            .await
            .map(|stats| JobWithStats { job, stats }))
    }

    /// Attach statistics to each job concurrently; missing stats read as zero
    pub async fn attach_stats(&self, jobs: Vec<ScrapingJob>) -> Vec<JobWithStats> {
        let stats = join_all(jobs.iter().map(|job| self.statistics_for(job))).await;

        jobs.into_iter()
            .zip(stats)
            .map(|(job, stats)| JobWithStats {
                job,
                stats: stats.unwrap_or_default(),
            })
            .collect()
    }

    /// All jobs with statistics
    pub async fn jobs_with_stats(&self) -> Result<Vec<JobWithStats>> {
        let jobs = self.list_jobs().await?;
        Ok(self.attach_stats(jobs).await)
    }

    // ========================================================================
    // Username Operations
    // ========================================================================

    /// Usernames in a job's pool, newest first
    pub async fn job_usernames(
        &self,
        ctx: &TenantContext,
        job_id: Uuid,
        only_available: bool,
    ) -> Result<Vec<GlobalUsername>> {
        let mut query = GlobalUsernameEntity::find()
            .filter(GlobalUsernameColumn::BaseId.eq(ctx.base_id()))
            .filter(GlobalUsernameColumn::JobId.eq(job_id));

        if only_available {
            query = query.filter(GlobalUsernameColumn::Used.eq(false));
        }

        query
            .order_by_desc(GlobalUsernameColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Bulk insert usernames into a job's pool
    pub async fn add_usernames(
        &self,
        ctx: &TenantContext,
        job_id: Uuid,
        usernames: Vec<NewUsername>,
    ) -> Result<u64> {
        if usernames.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now();
        let models = usernames.into_iter().map(|u| GlobalUsernameActiveModel {
            id: Set(u.id),
            username: Set(u.username),
            full_name: Set(u.full_name),
            used: Set(false),
            used_at: Set(None),
            created_at: Set(now.into()),
            job_id: Set(Some(job_id)),
            base_id: Set(ctx.base_id().to_string()),
        });

        let inserted = GlobalUsernameEntity::insert_many(models)
            .exec_without_returning(self.write_conn())
            .await?;

        info!(job_id = %job_id, base_id = %ctx.base_id(), inserted, "Usernames added");
        Ok(inserted)
    }

    /// Flag usernames as used after assignment to a VA table
    pub async fn mark_usernames_used(&self, ctx: &TenantContext, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = GlobalUsernameEntity::update_many()
            .col_expr(GlobalUsernameColumn::Used, Expr::value(true))
            .col_expr(
                GlobalUsernameColumn::UsedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(chrono::Utc::now())),
            )
            .filter(GlobalUsernameColumn::BaseId.eq(ctx.base_id()))
            .filter(GlobalUsernameColumn::Id.is_in(ids.iter().cloned()))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    // ========================================================================
    // Assignment Operations
    // ========================================================================

    /// Assignments for a job, newest first
    pub async fn job_assignments(
        &self,
        ctx: &TenantContext,
        job_id: Uuid,
    ) -> Result<Vec<DailyAssignment>> {
        DailyAssignmentEntity::find()
            .filter(DailyAssignmentColumn::BaseId.eq(ctx.base_id()))
            .filter(DailyAssignmentColumn::JobId.eq(job_id))
            .order_by_desc(DailyAssignmentColumn::AssignedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Bulk create pending assignments for one campaign run
    pub async fn create_assignments(
        &self,
        ctx: &TenantContext,
        job_id: Uuid,
        campaign_id: &str,
        assignments: Vec<NewAssignment>,
    ) -> Result<u64> {
        if assignments.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now();
        let models = assignments.into_iter().map(|a| DailyAssignmentActiveModel {
            assignment_id: Set(Uuid::new_v4()),
            campaign_id: Set(campaign_id.to_string()),
            va_table_number: Set(a.va_table_number),
            position: Set(a.position),
            id: Set(a.id),
            username: Set(a.username),
            full_name: Set(a.full_name),
            assigned_at: Set(now.into()),
            status: Set(AssignmentStatus::Pending.as_str().to_string()),
            updated_at: Set(None),
            job_id: Set(Some(job_id)),
            base_id: Set(ctx.base_id().to_string()),
        });

        let inserted = DailyAssignmentEntity::insert_many(models)
            .exec_without_returning(self.write_conn())
            .await?;

        info!(job_id = %job_id, campaign_id, inserted, "Assignments created");
        Ok(inserted)
    }

    // ========================================================================
    // Campaigns & Source Profiles
    // ========================================================================

    /// Campaigns for the tenant, newest campaign date first
    pub async fn list_campaigns(&self, ctx: &TenantContext) -> Result<Vec<Campaign>> {
        CampaignEntity::find()
            .filter(CampaignColumn::BaseId.eq(ctx.base_id()))
            .order_by_desc(CampaignColumn::CampaignDate)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Saved seed accounts for the tenant
    pub async fn list_source_profiles(&self, ctx: &TenantContext) -> Result<Vec<SourceProfile>> {
        SourceProfileEntity::find()
            .filter(SourceProfileColumn::BaseId.eq(ctx.base_id()))
            .order_by_asc(SourceProfileColumn::Username)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl JobStore for Repository {
    async fn create_job(&self, ctx: &TenantContext, job: NewJob) -> Result<ScrapingJob> {
        self.insert_job(ctx, job).await
    }

    async fn source_profiles(&self, ctx: &TenantContext) -> Result<Vec<SourceProfile>> {
        self.list_source_profiles(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, RuntimeErr, Transaction};
    use std::sync::Arc;

    const BASE: &str = "appAbCdEfGhIjKlMn";

    fn ctx() -> TenantContext {
        TenantContext::from_raw(BASE).unwrap()
    }

    fn job(status: JobStatus) -> ScrapingJob {
        ScrapingJob {
            job_id: Uuid::new_v4(),
            influencer_name: "FitMomGhana".into(),
            platform: "instagram".into(),
            airtable_base_id: BASE.into(),
            base_id: BASE.into(),
            num_vas: Some(3),
            status: status.as_str().into(),
            created_at: chrono::Utc::now().into(),
            updated_at: None,
        }
    }

    fn repo(db: MockDatabase) -> Repository {
        Repository::new(DbPool::from_connection(db.into_connection()))
    }

    #[tokio::test]
    async fn test_insert_job_uses_tenant_base_id() {
        let row = job(JobStatus::Active);
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![row.clone()]]));

        let created = repo
            .insert_job(&ctx(), NewJob {
                influencer_name: "  FitMomGhana ".into(),
                platform: Platform::Instagram,
                num_vas: Some(3),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(created.base_id, BASE);
        assert_eq!(created.display_name(), "FitMomGhana's Instagram Job");
    }

    #[tokio::test]
    async fn test_insert_job_database_error() {
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([DbErr::Query(RuntimeErr::Internal("boom".into()))]),
        );

        let err = repo
            .insert_job(&ctx(), NewJob {
                influencer_name: "Ama".into(),
                platform: Platform::Threads,
                num_vas: None,
                status: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_find_active_job_falls_back_to_newest() {
        let newest = job(JobStatus::Paused);
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<ScrapingJob>::new()])
                .append_query_results([vec![newest.clone()]]),
        );

        let found = repo.find_active_job().await.unwrap().unwrap();
        assert_eq!(found.job_id, newest.job_id);
    }

    #[tokio::test]
    async fn test_same_status_is_noop() {
        let row = job(JobStatus::Paused);
        let id = row.job_id;
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![row]]);
        let repo = repo(db);

        let updated = repo.pause_job(&ctx(), id).await.unwrap();
        assert_eq!(updated.job_status(), JobStatus::Paused);
    }

    #[tokio::test]
    async fn test_archived_job_cannot_be_reactivated() {
        let row = job(JobStatus::Archived);
        let id = row.job_id;
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![row]]));

        let err = repo.activate_job(&ctx(), id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_update_rejects_other_tenant() {
        let mut row = job(JobStatus::Active);
        row.base_id = "appZzZzZzZzZzZzZz".into();
        let id = row.job_id;
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![row]]));

        let err = repo.archive_job(&ctx(), id).await.unwrap_err();
        assert!(matches!(err, AppError::TenantMismatch));
    }

    #[tokio::test]
    async fn test_update_cannot_move_job_to_another_base() {
        let row = job(JobStatus::Active);
        let id = row.job_id;
        let moving = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![row.clone()]]));

        let err = moving
            .update_job(&ctx(), id, JobUpdate {
                airtable_base_id: Some("appZzZzZzZzZzZzZz".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some(f), .. } if f == "airtable_base_id"));

        // Same base is accepted as a no-op
        let staying = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![row]]));
        let same = staying
            .update_job(&ctx(), id, JobUpdate {
                airtable_base_id: Some(BASE.into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(same.base_id, BASE);
        assert!(same.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_status_change_stamps_updated_at() {
        let row = job(JobStatus::Active);
        let id = row.job_id;
        let mut archived = row.clone();
        archived.status = "archived".into();
        archived.updated_at = Some(chrono::Utc::now().into());

        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![row]])
                .append_query_results([vec![archived]]),
        );

        let updated = repo.archive_job(&ctx(), id).await.unwrap();
        assert_eq!(updated.job_status(), JobStatus::Archived);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_job_is_not_found() {
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([Vec::<ScrapingJob>::new()]),
        );
        let err = repo.get_job(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::JobNotFound { .. }));
    }

    #[tokio::test]
    async fn test_add_usernames_scoped_to_tenant() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 2,
        }]);
        let conn = Arc::new(db.into_connection());
        let repo = Repository::new(DbPool { primary: Arc::clone(&conn), replica: None });

        let inserted = repo
            .add_usernames(&ctx(), Uuid::new_v4(), vec![
                NewUsername { id: "1".into(), username: "a".into(), full_name: None },
                NewUsername { id: "2".into(), username: "b".into(), full_name: Some("B".into()) },
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        drop(repo);
        let conn = Arc::try_unwrap(conn).ok().unwrap();
        let log: Vec<Transaction> = conn.into_transaction_log();
        assert_eq!(log.len(), 1);
        assert!(format!("{:?}", log[0]).contains(BASE));
    }

    #[tokio::test]
    async fn test_empty_bulk_insert_skips_database() {
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres));
        assert_eq!(repo.add_usernames(&ctx(), Uuid::new_v4(), vec![]).await.unwrap(), 0);
        assert_eq!(repo.create_assignments(&ctx(), Uuid::new_v4(), "c1", vec![]).await.unwrap(), 0);
        assert_eq!(repo.mark_usernames_used(&ctx(), &[]).await.unwrap(), 0);
    }

    fn count_row(n: i64) -> Vec<std::collections::BTreeMap<&'static str, sea_orm::Value>> {
        vec![std::collections::BTreeMap::from([("num_items", sea_orm::Value::BigInt(Some(n)))])]
    }

    #[tokio::test]
    async fn test_attach_stats_defaults_missing_to_zero() {
        let unpartitioned = ScrapingJob {
            base_id: String::new(),
            ..job(JobStatus::Active)
        };
        let down = (0..5).map(|_| DbErr::Conn(RuntimeErr::Internal("connection refused".into())));
        let repo = repo(MockDatabase::new(DatabaseBackend::Postgres).append_query_errors(down));

        let jobs = repo.attach_stats(vec![unpartitioned]).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].stats, JobStatistics::default());
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn test_legacy_statistics_by_job_reference() {
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([count_row(2)])
                .append_query_results([count_row(1)])
                .append_query_results([count_row(3)])
                .append_query_results([count_row(0)])
                .append_query_results([count_row(9)]),
        );

        let stats = repo
            .legacy_job_statistics(LEGACY_PLACEHOLDER_JOB_ID)
            .await
            .unwrap();
        assert_eq!(stats.available_usernames, 2);
        assert_eq!(stats.total_usernames, 3);
        assert_eq!(stats.total_scrape_results, 9);
    }

    #[tokio::test]
    async fn test_active_base_id() {
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![job(JobStatus::Active)]]),
        );
        assert_eq!(repo.active_base_id().await.unwrap().unwrap().as_str(), BASE);
    }

    #[tokio::test]
    async fn test_job_with_stats() {
        let row = job(JobStatus::Active);
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![row.clone()]])
                .append_query_results([count_row(4)])
                .append_query_results([count_row(1)])
                .append_query_results([count_row(5)])
                .append_query_results([count_row(2)])
                .append_query_results([count_row(7)]),
        );

        let found = repo.job_with_stats(row.job_id).await.unwrap().unwrap();
        assert_eq!(found.job.job_id, row.job_id);
        assert_eq!(found.stats.used_usernames, 1);
        assert_eq!(found.stats.total_assignments, 2);
    }
}
