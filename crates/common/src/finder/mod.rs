//! Account finder
//!
//! Collects seed accounts for one platform, then runs a two-phase remote
//! operation: scrape followers of the seeds, then ingest the results into
//! the tenant's username pool. Either phase failing aborts the run and
//! drops progress back to zero.

use crate::api::{GenderDistribution, IngestProfile, IngestRequest, ScrapeFollowersRequest, ScrapedAccount, ScraperApi};
use crate::config::FinderConfig;
use crate::db::models::SourceProfile;
use crate::db::JobStore;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::platform::Platform;
use crate::reset::PageReset;
use crate::tenant::TenantContext;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Progress checkpoints, in order
pub mod checkpoints {
    pub const SCRAPE_REQUESTED: u8 = 10;
    pub const SCRAPE_DONE: u8 = 50;
    pub const INGEST_REQUESTED: u8 = 60;
    pub const INGEST_RETURNED: u8 = 80;
    pub const DONE: u8 = 100;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinderPhase {
    #[default]
    Idle,
    Scraping,
    Ingesting,
    Complete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FinderProgress {
    pub phase: FinderPhase,
    pub progress: u8,
}

impl FinderProgress {
    pub fn is_running(&self) -> bool {
        matches!(self.phase, FinderPhase::Scraping | FinderPhase::Ingesting)
    }
}

/// Seed account in the finder list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedAccount {
    pub id: u64,
    pub username: String,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct FindResult {
    pub accounts: Vec<ScrapedAccount>,
    pub total_filtered: u32,
    pub total_scraped: u32,
    pub gender_distribution: GenderDistribution,
    pub added_to_global: u32,
}

impl FindResult {
    pub fn summary(&self) -> String {
        format!(
            "Scraped {} accounts and added {} new profiles to database.",
            self.total_filtered, self.added_to_global
        )
    }
}

/// One page's account finder
#[derive(Debug, Clone)]
pub struct AccountFinder {
    platform: Platform,
    accounts: Vec<SeedAccount>,
    next_id: u64,
    total_scrape_count: Option<u32>,
    progress: Arc<watch::Sender<FinderProgress>>,
}

impl Default for AccountFinder {
    fn default() -> Self {
        let (progress, _) = watch::channel(FinderProgress::default());
        Self {
            platform: Platform::default(),
            accounts: Vec::new(),
            next_id: 1,
            total_scrape_count: None,
            progress: Arc::new(progress),
        }
    }
}

impl AccountFinder {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            ..Default::default()
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn accounts(&self) -> &[SeedAccount] {
        &self.accounts
    }

    pub fn progress(&self) -> FinderProgress {
        *self.progress.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FinderProgress> {
        self.progress.subscribe()
    }

    pub fn total_scrape_count(&self, config: &FinderConfig) -> u32 {
        self.total_scrape_count.unwrap_or(config.default_scrape_count)
    }

    pub fn set_total_scrape_count(&mut self, count: u32) {
        self.total_scrape_count = Some(count);
    }

    fn push(&mut self, username: String) -> &SeedAccount {
        let id = self.next_id;
        self.next_id += 1;
        self.accounts.push(SeedAccount { id, username });
        &self.accounts[self.accounts.len() - 1]
    }

    /// Add a username or profile URL
    pub fn add_account(&mut self, input: &str) -> Result<&SeedAccount> {
        if input.trim().is_empty() {
            return Err(AppError::MissingField {
                field: "username".to_string(),
            });
        }

        let username = self
            .platform
            .extract_username(input)
            .ok_or_else(|| AppError::InvalidUsername {
                platform: self.platform.label().to_string(),
            })?;

        if self.accounts.iter().any(|a| a.username == username) {
            return Err(AppError::DuplicateAccount {
                platform: self.platform.label().to_string(),
                username,
            });
        }

        Ok(self.push(username))
    }

    pub fn remove_account(&mut self, id: u64) -> Option<SeedAccount> {
        let index = self.accounts.iter().position(|a| a.id == id)?;
        Some(self.accounts.remove(index))
    }

    /// Append saved profiles not already listed; returns how many were added
    pub fn merge_profiles(&mut self, profiles: &[SourceProfile]) -> usize {
        let mut added = 0;
        for profile in profiles {
            let username = profile.username.trim();
            if username.is_empty() || self.accounts.iter().any(|a| a.username == username) {
                continue;
            }
            self.push(username.to_string());
            added += 1;
        }
        added
    }

    /// Load the tenant's saved seed accounts into the list
    pub async fn load_source_profiles(
        &mut self,
        ctx: &TenantContext,
        store: &dyn JobStore,
    ) -> Result<usize> {
        let profiles = store.source_profiles(ctx).await?;
        let added = self.merge_profiles(&profiles);
        info!(
            base_id = %ctx.base_id(),
            loaded = profiles.len(),
            added,
            "Source profiles loaded"
        );
        Ok(added)
    }

    /// Clear everything back to a fresh page
    pub fn reset(&mut self) {
        self.accounts.clear();
        self.total_scrape_count = None;
        self.progress.send_replace(FinderProgress::default());
    }

    /// Validate and build the scrape request for the current list
    pub fn scrape_request(&self, config: &FinderConfig) -> Result<ScrapeFollowersRequest> {
        if self.progress().is_running() {
            return Err(AppError::InvalidTransition {
                message: "Account search already running".to_string(),
            });
        }
        if self.accounts.is_empty() {
            return Err(AppError::Validation {
                message: format!("Please add some {} accounts first.", self.platform.label()),
                field: Some("accounts".to_string()),
            });
        }
        let total = self.total_scrape_count(config);
        if total == 0 {
            return Err(AppError::Validation {
                message: "Please enter a valid number of accounts to scrape (greater than 0)."
                    .to_string(),
                field: Some("total_scrape_count".to_string()),
            });
        }

        Ok(ScrapeFollowersRequest {
            accounts: self.accounts.iter().map(|a| a.username.clone()).collect(),
            target_gender: config.target_gender.clone(),
            total_scrape_count: total,
            platform: self.platform,
        })
    }

    /// Handle for running a search without holding the finder.
    ///
    /// The finder reads as running from here on, so a second call fails
    /// until the returned run finishes or is dropped.
    pub fn runner(&self, config: &FinderConfig) -> Result<FinderRun> {
        let request = self.scrape_request(config)?;
        self.progress.send_replace(FinderProgress {
            phase: FinderPhase::Scraping,
            progress: checkpoints::SCRAPE_REQUESTED,
        });

        let progress = Arc::clone(&self.progress);
        let teardown: Box<dyn FnMut() + Send + Sync> = Box::new(move || {
            progress.send_if_modified(|p| {
                if p.is_running() {
                    *p = FinderProgress::default();
                    true
                } else {
                    false
                }
            });
        });

        Ok(FinderRun {
            request,
            progress: Arc::clone(&self.progress),
            reset_after: Duration::from_millis(config.progress_reset_ms),
            _teardown: PageReset::new(teardown),
        })
    }
}

/// Unreachable API and missing tenant pass through; anything else is
/// attributed to the phase that failed.
fn phase_error(err: AppError, wrap: impl FnOnce(String) -> AppError) -> AppError {
    match err {
        AppError::Connection { .. } | AppError::MissingTenant => err,
        other => wrap(other.to_string()),
    }
}

/// A validated search, detached from the finder list
pub struct FinderRun {
    request: ScrapeFollowersRequest,
    progress: Arc<watch::Sender<FinderProgress>>,
    reset_after: Duration,
    // Abandoned runs drop back to idle
    _teardown: PageReset<Box<dyn FnMut() + Send + Sync>>,
}

impl FinderRun {
    fn set(&self, phase: FinderPhase, progress: u8) {
        self.progress.send_replace(FinderProgress { phase, progress });
    }

    fn abort(&self, err: AppError) -> AppError {
        warn!(platform = %self.request.platform, error = %err, "Account search failed");
        self.set(FinderPhase::Idle, 0);
        err
    }

    /// Scrape then ingest
    pub async fn run(self, ctx: &TenantContext, api: &dyn ScraperApi) -> Result<FindResult> {
        let scraped = match api.scrape_followers(ctx, &self.request).await {
            Ok(resp) if resp.success => resp.data.unwrap_or_default(),
            Ok(resp) => {
                return Err(self.abort(AppError::ScrapeFailed {
                    message: resp
                        .error
                        .unwrap_or_else(|| "Failed to scrape followers".to_string()),
                }))
            }
            Err(e) => {
                return Err(self.abort(phase_error(e, |message| AppError::ScrapeFailed { message })))
            }
        };
        self.set(FinderPhase::Scraping, checkpoints::SCRAPE_DONE);

        self.set(FinderPhase::Ingesting, checkpoints::INGEST_REQUESTED);
        let ingest = IngestRequest {
            profiles: scraped.accounts.iter().map(IngestProfile::from).collect(),
        };
        let ingested = api.ingest(ctx, &ingest).await;
        self.set(FinderPhase::Ingesting, checkpoints::INGEST_RETURNED);

        let added_to_global = match ingested {
            Ok(resp) if resp.success => resp.added_to_global,
            Ok(_) => {
                return Err(self.abort(AppError::IngestFailed {
                    message: "Scraped data could not be saved to database.".to_string(),
                }))
            }
            Err(e) => {
                return Err(self.abort(phase_error(e, |message| AppError::IngestFailed { message })))
            }
        };

        self.set(FinderPhase::Complete, checkpoints::DONE);
        metrics::record_accounts_found(added_to_global, self.request.platform.as_str());

        let result = FindResult {
            accounts: scraped.accounts,
            total_filtered: scraped.total_filtered,
            total_scraped: scraped.total_scraped,
            gender_distribution: scraped.gender_distribution,
            added_to_global,
        };
        info!(base_id = %ctx.base_id(), summary = %result.summary(), "Account search complete");

        // Completed progress stays visible briefly, then returns to idle
        let progress = Arc::clone(&self.progress);
        let reset_after = self.reset_after;
        tokio::spawn(async move {
            tokio::time::sleep(reset_after).await;
            progress.send_if_modified(|p| {
                if p.phase == FinderPhase::Complete {
                    *p = FinderProgress::default();
                    true
                } else {
                    false
                }
            });
        });

        Ok(result)
    }
}
