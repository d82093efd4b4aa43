//! Job statistics
//!
//! One aggregate, two scopes. [`TenantScope`] counts rows by the `base_id`
//! partition column and is used whenever a tenant identifier is known.
//! [`LegacyJobScope`] counts by job reference and only serves rows written
//! before jobs were partitioned.
//!
//! The five counts run concurrently. A count that fails on its own reads as
//! zero; a connection-level failure yields `None`, which callers must keep
//! distinct from an all-zero result.

use crate::db::models::*;
use crate::metrics;
use crate::tenant::BaseId;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Select,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

/// Aggregated statistics for a scraping job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatistics {
    pub total_usernames: u64,
    pub used_usernames: u64,
    pub available_usernames: u64,
    pub total_assignments: u64,
    pub total_scrape_results: u64,
}

/// Row selection for one statistics path
pub trait StatsScope: Send + Sync {
    /// Path name for logs and metrics
    fn path(&self) -> &'static str;

    fn usernames(&self) -> Select<GlobalUsernameEntity>;

    fn assignments(&self) -> Select<DailyAssignmentEntity>;

    fn scrape_results(&self) -> Select<ScrapeResultEntity>;
}

/// Counts by tenant partition key
#[derive(Debug, Clone)]
pub struct TenantScope(pub BaseId);

impl StatsScope for TenantScope {
    fn path(&self) -> &'static str {
        "tenant"
    }

    fn usernames(&self) -> Select<GlobalUsernameEntity> {
        GlobalUsernameEntity::find().filter(GlobalUsernameColumn::BaseId.eq(self.0.as_str()))
    }

    fn assignments(&self) -> Select<DailyAssignmentEntity> {
        DailyAssignmentEntity::find().filter(DailyAssignmentColumn::BaseId.eq(self.0.as_str()))
    }

    fn scrape_results(&self) -> Select<ScrapeResultEntity> {
        ScrapeResultEntity::find().filter(ScrapeResultColumn::BaseId.eq(self.0.as_str()))
    }
}

/// Counts by job reference. Only for rows without a partition key.
#[derive(Debug, Clone, Copy)]
pub struct LegacyJobScope(pub Uuid);

impl StatsScope for LegacyJobScope {
    fn path(&self) -> &'static str {
        "legacy"
    }

    fn usernames(&self) -> Select<GlobalUsernameEntity> {
        GlobalUsernameEntity::find().filter(GlobalUsernameColumn::JobId.eq(self.0))
    }

    fn assignments(&self) -> Select<DailyAssignmentEntity> {
        DailyAssignmentEntity::find().filter(DailyAssignmentColumn::JobId.eq(self.0))
    }

    fn scrape_results(&self) -> Select<ScrapeResultEntity> {
        ScrapeResultEntity::find().filter(ScrapeResultColumn::ScrapingJobId.eq(self.0))
    }
}

/// Pick the statistics path for a job row
pub fn scope_for_job(job: &ScrapingJob) -> Box<dyn StatsScope> {
    match BaseId::parse(&job.base_id) {
        Ok(base_id) => Box::new(TenantScope(base_id)),
        Err(_) => Box::new(LegacyJobScope(job.job_id)),
    }
}

fn is_connection_failure(err: &DbErr) -> bool {
    matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
}

/// Compute statistics for a scope
pub async fn compute_statistics(
    conn: &DatabaseConnection,
    scope: &dyn StatsScope,
) -> Option<JobStatistics> {
    let (available, used, total, assignments, results) = tokio::join!(
        scope.usernames().filter(GlobalUsernameColumn::Used.eq(false)).count(conn),
        scope.usernames().filter(GlobalUsernameColumn::Used.eq(true)).count(conn),
        scope.usernames().count(conn),
        scope.assignments().count(conn),
        scope.scrape_results().count(conn),
    );

    let counts = [
        ("available_usernames", available),
        ("used_usernames", used),
        ("total_usernames", total),
        ("total_assignments", assignments),
        ("total_scrape_results", results),
    ];

    if let Some((_, Err(e))) = counts
        .iter()
        .find(|(_, r)| matches!(r, Err(e) if is_connection_failure(e)))
    {
        error!(path = scope.path(), error = %e, "Job statistics query failed");
        return None;
    }

    let mut values = [0u64; 5];
    for (slot, (name, result)) in values.iter_mut().zip(counts) {
        *slot = match result {
            Ok(n) => n,
            Err(e) => {
                warn!(path = scope.path(), count = name, error = %e, "Count failed, defaulting to zero");
                metrics::record_stats_fallback(scope.path());
                0
            }
        };
    }

    let [available_usernames, used_usernames, total_usernames, total_assignments, total_scrape_results] =
        values;

    Some(JobStatistics {
        total_usernames,
        used_usernames,
        available_usernames,
        total_assignments,
        total_scrape_results,
    })
}
