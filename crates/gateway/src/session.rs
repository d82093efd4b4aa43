//! Operator sessions
//!
//! Each operator session owns its page state: the job creation wizard and
//! the dashboard page, which is keyed by the viewed job so nothing from one
//! job survives into another.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Utc};
use scrapedeck_common::{
    errors::{AppError, Result},
    finder::{AccountFinder, FindResult},
    reset::{ResetOnChange, Scoped},
    workflow::{JobWizard, Provisioner},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::AppState;

/// Header carrying the operator session id
pub const SESSION_HEADER: &str = "X-Session-Id";

/// Dashboard state for one viewed job
#[derive(Debug, Default)]
pub struct DashboardPage {
    pub finder: AccountFinder,
    pub last_result: Option<FindResult>,
}

type ClearRedirect = Box<dyn FnMut() + Send>;

pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub wizard: JobWizard,
    pub dashboard: tokio::sync::Mutex<Scoped<Uuid, DashboardPage>>,
    redirect: Arc<Mutex<Option<String>>>,
    last_seen: Mutex<Instant>,
    // Pending redirect is spent once a different dashboard job is opened
    viewed_job: Mutex<ResetOnChange<Uuid, ClearRedirect>>,
}

impl Session {
    fn new(provisioner: Arc<Provisioner>) -> Self {
        let redirect = Arc::new(Mutex::new(None::<String>));
        let slot = Arc::clone(&redirect);
        let clear: ClearRedirect = Box::new(move || {
            slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        });

        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            wizard: JobWizard::new(provisioner),
            dashboard: tokio::sync::Mutex::new(Scoped::new()),
            redirect,
            last_seen: Mutex::new(Instant::now()),
            viewed_job: Mutex::new(ResetOnChange::new(clear)),
        }
    }

    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    /// Time since the session was last used
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().unwrap_or_else(|e| e.into_inner()).elapsed()
    }

    /// Record the dashboard job being viewed
    pub fn viewing(&self, job_id: Uuid) {
        self.viewed_job
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .observe(job_id);
    }

    /// Where the operator should go next, set when a job is created
    pub fn redirect(&self) -> Option<String> {
        self.redirect.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Slot written by the wizard's completion callback
    pub fn redirect_slot(&self) -> Arc<Mutex<Option<String>>> {
        Arc::clone(&self.redirect)
    }

    pub fn clear_redirect(&self) {
        self.redirect.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

/// In-process session registry
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
    provisioner: Arc<Provisioner>,
}

impl SessionStore {
    pub fn new(provisioner: Arc<Provisioner>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            provisioner,
        }
    }

    pub fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(Arc::clone(&self.provisioner)));
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session.id, Arc::clone(&session));
        session
    }

    pub fn get(&self, id: Uuid) -> Result<Arc<Session>> {
        let session = self
            .sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })?;
        session.touch();
        Ok(session)
    }

    pub fn remove(&self, id: Uuid) -> Result<Arc<Session>> {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drop sessions idle for at least `max_idle`. A session with job
    /// creation in flight is kept until the attempt settles.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, s| s.wizard.is_in_flight() || s.idle_for() < max_idle);
        before - sessions.len()
    }

    /// Periodically expire idle sessions
    pub fn spawn_sweeper(&self, max_idle: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let every = max_idle.min(Duration::from_secs(60)).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let expired = store.purge_idle(max_idle);
                if expired > 0 {
                    tracing::info!(expired, remaining = store.len(), "Expired idle sessions");
                }
            }
        })
    }
}

/// Extracts the caller's session from [`SESSION_HEADER`]
pub struct OperatorSession(pub Arc<Session>);

impl FromRequestParts<AppState> for OperatorSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let raw = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::MissingField {
                field: SESSION_HEADER.to_string(),
            })?;

        let id = Uuid::parse_str(raw.trim()).map_err(|_| AppError::SessionNotFound {
            id: raw.to_string(),
        })?;

        state.sessions.get(id).map(OperatorSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrapedeck_common::{
        api::ApiClient,
        config::{ApiConfig, WorkflowConfig},
        db::{DbPool, Repository},
        recents::RecentsStore,
    };
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn store() -> SessionStore {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let repo = Arc::new(Repository::new(DbPool::from_connection(conn)));
        let api = Arc::new(ApiClient::new(&ApiConfig::default()).unwrap());
        let provisioner = Provisioner::new(api, repo, RecentsStore::in_memory(), WorkflowConfig::default());
        SessionStore::new(Arc::new(provisioner))
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let sessions = store();
        let session = sessions.create();
        assert_eq!(sessions.len(), 1);

        let found = sessions.get(session.id).unwrap();
        assert_eq!(found.id, session.id);
        assert!(found.redirect().is_none());

        *session.redirect_slot().lock().unwrap() = Some("/callum-dashboard?job=x".into());
        assert_eq!(found.redirect().as_deref(), Some("/callum-dashboard?job=x"));

        sessions.remove(session.id).unwrap();
        assert!(matches!(sessions.get(session.id), Err(AppError::SessionNotFound { .. })));
    }

    #[tokio::test]
    async fn test_redirect_spent_when_dashboard_job_changes() {
        let session = store().create();
        let (job_a, job_b) = (Uuid::new_v4(), Uuid::new_v4());

        *session.redirect_slot().lock().unwrap() = Some("/callum-dashboard?job=a".into());
        session.viewing(job_a);
        assert!(session.redirect().is_none());

        *session.redirect_slot().lock().unwrap() = Some("/callum-dashboard?job=b".into());
        session.viewing(job_a);
        assert!(session.redirect().is_some());

        session.viewing(job_b);
        assert!(session.redirect().is_none());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let sessions = store();
        let kept = sessions.create();
        let idle = sessions.create();

        assert_eq!(sessions.purge_idle(Duration::from_secs(3600)), 0);
        assert_eq!(sessions.len(), 2);

        std::thread::sleep(Duration::from_millis(30));
        sessions.get(kept.id).unwrap();
        assert_eq!(sessions.purge_idle(Duration::from_millis(20)), 1);
        assert!(sessions.get(kept.id).is_ok());
        assert!(matches!(sessions.get(idle.id), Err(AppError::SessionNotFound { .. })));
    }

    #[tokio::test]
    async fn test_dashboard_page_resets_between_jobs() {
        let session = store().create();
        let (job_a, job_b) = (Uuid::new_v4(), Uuid::new_v4());

        let mut dashboard = session.dashboard.lock().await;
        dashboard.enter(job_a).finder.add_account("alpha").unwrap();
        assert_eq!(dashboard.enter(job_a).finder.accounts().len(), 1);
        assert!(dashboard.enter(job_b).finder.accounts().is_empty());
    }
}
