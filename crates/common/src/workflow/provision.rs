//! Provisioning steps
//!
//! Strictly ordered: extract the base id, create the VA tables, persist the
//! job, record it in recents. Each step reports a checkpoint before it runs.

use crate::api::{CreateBaseRequest, ScraperApi};
use crate::config::WorkflowConfig;
use crate::db::models::job_display_name;
use crate::db::{JobStore, NewJob};
use crate::errors::{AppError, Result};
use crate::recents::{RecentJob, RecentsStore};
use crate::tenant::{extract_base_id, TenantContext};
use crate::workflow::JobForm;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Progress checkpoints, in order
pub mod checkpoints {
    pub const EXTRACT: u8 = 10;
    pub const CREATE_TABLES: u8 = 20;
    pub const TABLES_CREATED: u8 = 60;
    pub const SAVE_JOB: u8 = 80;
    pub const UPDATE_RECENTS: u8 = 90;
    pub const DONE: u8 = 100;
}

/// Result of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionOutcome {
    /// Persisted job, absent when persistence failed or the run was simulated
    pub job_id: Option<Uuid>,
    /// Non-fatal problem to surface alongside success
    pub warning: Option<String>,
}

/// Runs the provisioning sequence against the table API and job store
pub struct Provisioner {
    api: Arc<dyn ScraperApi>,
    store: Arc<dyn JobStore>,
    recents: RecentsStore,
    config: WorkflowConfig,
}

impl Provisioner {
    pub fn new(
        api: Arc<dyn ScraperApi>,
        store: Arc<dyn JobStore>,
        recents: RecentsStore,
        config: WorkflowConfig,
    ) -> Self {
        Self { api, store, recents, config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run the configured mode
    pub async fn run<R>(&self, form: &JobForm, base_url: &str, report: &R) -> Result<ProvisionOutcome>
    where
        R: Fn(u8, &str) + Sync,
    {
        if self.config.simulate {
            self.simulate(report).await
        } else {
            self.provision(form, base_url, report).await
        }
    }

    /// Provision the external base and persist the job
    pub async fn provision<R>(
        &self,
        form: &JobForm,
        base_url: &str,
        report: &R,
    ) -> Result<ProvisionOutcome>
    where
        R: Fn(u8, &str) + Sync,
    {
        report(checkpoints::EXTRACT, "Extracting base ID...");
        let base_id = extract_base_id(base_url)?;
        let ctx = TenantContext::new(base_id);

        report(checkpoints::CREATE_TABLES, &format!("Creating {} VA tables...", form.num_vas));
        let request = CreateBaseRequest {
            base_id: ctx.base_id().to_string(),
            num_vas: form.num_vas,
            base_name: job_display_name(&form.influencer, form.platform),
        };
        let response = self.api.create_base(&ctx, &request).await?;

        if response.is_duplicate_base() {
            return Err(AppError::DuplicateBase {
                existing_job: response.existing_job,
            });
        }
        if !response.success {
            return Err(AppError::Upstream {
                message: response
                    .error
                    .or(response.message)
                    .unwrap_or_else(|| "Failed to create VA tables".to_string()),
            });
        }

        let created = match response.tables_skipped {
            Some(skipped) if skipped > 0 => format!(
                "Created {} tables ({} already existed)",
                response.tables_created, skipped
            ),
            _ => format!("Created {} tables", response.tables_created),
        };
        report(checkpoints::TABLES_CREATED, &created);

        report(checkpoints::SAVE_JOB, "Saving job...");
        let new_job = NewJob {
            influencer_name: form.influencer.clone(),
            platform: form.platform,
            num_vas: Some(form.num_vas),
            status: None,
        };

        // The tables exist at this point, so a failed insert is only a warning
        let (job, warning) = match self.store.create_job(&ctx, new_job).await {
            Ok(job) => (Some(job), None),
            Err(e) => {
                warn!(base_id = %ctx.base_id(), error = %e, "Tables created but job was not saved");
                (
                    None,
                    Some(format!("VA tables were created, but the job could not be saved: {}", e)),
                )
            }
        };

        report(checkpoints::UPDATE_RECENTS, "Updating recents...");
        if let Some(job) = &job {
            self.recents
                .add(RecentJob::new(job.job_id, job.influencer_name.clone(), form.platform));
        }

        report(checkpoints::DONE, "Setup complete");

        let job_id = job.map(|j| j.job_id);
        info!(
            base_id = %ctx.base_id(),
            job_id = ?job_id,
            platform = %form.platform,
            "Provisioning finished"
        );

        Ok(ProvisionOutcome { job_id, warning })
    }

    /// Walk the same checkpoints without remote calls
    pub async fn simulate<R>(&self, report: &R) -> Result<ProvisionOutcome>
    where
        R: Fn(u8, &str) + Sync,
    {
        let steps = [
            (checkpoints::EXTRACT, "Extracting base ID..."),
            (checkpoints::CREATE_TABLES, "Creating VA tables..."),
            (checkpoints::TABLES_CREATED, "Tables created"),
            (checkpoints::SAVE_JOB, "Saving job..."),
            (checkpoints::UPDATE_RECENTS, "Updating recents..."),
            (checkpoints::DONE, "Setup complete"),
        ];

        let total = self.config.simulated_duration_ms;
        let tick = self.config.simulated_tick_ms.max(1);
        let mut previous = 0u8;

        for (progress, status) in steps {
            // Spread the total duration across checkpoints in whole ticks
            let share = total * u64::from(progress - previous) / 100;
            let ticks = share / tick;
            for _ in 0..ticks {
                tokio::time::sleep(Duration::from_millis(tick)).await;
            }
            report(progress, status);
            previous = progress;
        }

        Ok(ProvisionOutcome::default())
    }
}
