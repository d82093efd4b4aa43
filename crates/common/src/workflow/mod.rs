//! Job creation workflow
//!
//! A three-step wizard: the job form, the base link, then provisioning with
//! a progress value. State lives in a watch channel so observers always see
//! the latest snapshot.
//!
//! ```text
//! Idle ──submit_form──▶ AwaitingBaseLink ──submit_link──▶ Provisioning
//!   ▲                        │                               │      │
//!   └──────cancel────────────┘                        Complete   Failed ─(dwell)─▶ Idle
//! ```

mod provision;

pub use provision::{checkpoints, ProvisionOutcome, Provisioner};

use crate::errors::{AppError, Result};
use crate::metrics;
use crate::platform::Platform;
use crate::tenant::validate_base_url;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Create-job form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobForm {
    pub influencer: String,
    pub platform: Platform,
    pub num_vas: u32,
}

impl JobForm {
    /// Normalize and check the form before leaving the idle step
    pub fn validated(self) -> Result<Self> {
        let influencer = self.influencer.trim().to_string();
        if influencer.is_empty() {
            return Err(AppError::MissingField {
                field: "influencer".to_string(),
            });
        }
        if !self.platform.is_enabled() {
            return Err(AppError::Validation {
                message: format!("{} is not available for new jobs", self.platform.label()),
                field: Some("platform".to_string()),
            });
        }
        if self.num_vas < 1 {
            return Err(AppError::Validation {
                message: "At least one VA is required".to_string(),
                field: Some("num_vas".to_string()),
            });
        }

        Ok(Self { influencer, ..self })
    }
}

/// Wizard state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WizardState {
    Idle,
    AwaitingBaseLink {
        form: JobForm,
    },
    Provisioning {
        form: JobForm,
        progress: u8,
        status: String,
    },
    Complete {
        job_id: Option<Uuid>,
        warning: Option<String>,
    },
    /// User backed out of the link step; equivalent to idle
    Cancelled,
    Failed {
        message: String,
    },
}

impl WizardState {
    /// States from which a new form may be submitted
    pub fn accepts_form(&self) -> bool {
        matches!(
            self,
            WizardState::Idle | WizardState::Cancelled | WizardState::Complete { .. }
        )
    }

    pub fn progress(&self) -> u8 {
        match self {
            WizardState::Provisioning { progress, .. } => *progress,
            WizardState::Complete { .. } => checkpoints::DONE,
            _ => 0,
        }
    }
}

/// One operator's job creation wizard
#[derive(Clone)]
pub struct JobWizard {
    state: Arc<watch::Sender<WizardState>>,
    in_flight: Arc<AtomicBool>,
    provisioner: Arc<Provisioner>,
}

impl JobWizard {
    pub fn new(provisioner: Arc<Provisioner>) -> Self {
        let (state, _) = watch::channel(WizardState::Idle);
        Self {
            state: Arc::new(state),
            in_flight: Arc::new(AtomicBool::new(false)),
            provisioner,
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> WizardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WizardState> {
        self.state.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Apply a checked transition; the state is untouched on error
    fn transition<T>(&self, f: impl FnOnce(&mut WizardState) -> Result<T>) -> Result<T> {
        let mut outcome = None;
        self.state.send_if_modified(|state| {
            let result = f(state);
            let modified = result.is_ok();
            outcome = Some(result);
            modified
        });
        outcome.unwrap_or_else(|| {
            Err(AppError::Internal {
                message: "wizard transition did not run".to_string(),
            })
        })
    }

    /// Idle → AwaitingBaseLink
    pub fn submit_form(&self, form: JobForm) -> Result<()> {
        let form = form.validated()?;
        self.transition(|state| {
            if !state.accepts_form() {
                return Err(AppError::InvalidTransition {
                    message: "A job is already being configured".to_string(),
                });
            }
            *state = WizardState::AwaitingBaseLink { form };
            Ok(())
        })
    }

    /// AwaitingBaseLink → Cancelled, discarding the form
    pub fn cancel(&self) -> Result<()> {
        self.transition(|state| match state {
            WizardState::AwaitingBaseLink { form } => {
                metrics::record_provisioning("cancelled", form.platform.as_str());
                *state = WizardState::Cancelled;
                Ok(())
            }
            _ => Err(AppError::InvalidTransition {
                message: "Nothing to cancel".to_string(),
            }),
        })
    }

    /// AwaitingBaseLink → Provisioning.
    ///
    /// Validates the link, takes the in-flight latch and spawns the run.
    /// `on_complete` fires once with the persisted job id after success.
    pub fn submit_link<F>(&self, base_url: &str, on_complete: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce(Option<Uuid>) + Send + 'static,
    {
        if self.is_in_flight() {
            return Err(AppError::ProvisioningInFlight);
        }

        let (form, url) = self.transition(|state| {
            let WizardState::AwaitingBaseLink { form } = state else {
                return Err(AppError::InvalidTransition {
                    message: "Submit the job form first".to_string(),
                });
            };
            let url = validate_base_url(base_url)?;
            if self.in_flight.swap(true, Ordering::AcqRel) {
                return Err(AppError::ProvisioningInFlight);
            }
            let form = form.clone();
            *state = WizardState::Provisioning {
                form: form.clone(),
                progress: 0,
                status: "Starting...".to_string(),
            };
            Ok((form, url))
        })?;

        let wizard = self.clone();
        Ok(tokio::spawn(async move {
            wizard.run(form, url, on_complete).await;
        }))
    }

    async fn run<F>(&self, form: JobForm, url: String, on_complete: F)
    where
        F: FnOnce(Option<Uuid>) + Send + 'static,
    {
        let sender = Arc::clone(&self.state);
        let report = move |progress: u8, status: &str| {
            sender.send_modify(|state| {
                if let WizardState::Provisioning { progress: current, status: text, .. } = state {
                    if progress > *current {
                        *current = progress;
                        *text = status.to_string();
                    }
                }
            });
        };

        let config = self.provisioner.config().clone();
        let platform = form.platform.as_str();

        match self.provisioner.run(&form, &url, &report).await {
            Ok(outcome) => {
                tokio::time::sleep(config.success_dwell()).await;
                let outcome_label = if outcome.warning.is_some() { "partial" } else { "complete" };
                metrics::record_provisioning(outcome_label, platform);
                info!(job_id = ?outcome.job_id, platform, "Job creation complete");

                self.state.send_replace(WizardState::Complete {
                    job_id: outcome.job_id,
                    warning: outcome.warning,
                });
                self.in_flight.store(false, Ordering::Release);
                on_complete(outcome.job_id);
            }
            Err(e) => {
                warn!(platform, error = %e, "Job creation failed");
                metrics::record_provisioning("failed", platform);

                self.state.send_replace(WizardState::Failed { message: e.to_string() });
                tokio::time::sleep(config.error_dwell()).await;
                self.state.send_if_modified(|state| {
                    if matches!(state, WizardState::Failed { .. }) {
                        *state = WizardState::Idle;
                        true
                    } else {
                        false
                    }
                });
                self.in_flight.store(false, Ordering::Release);
            }
        }
    }
}
