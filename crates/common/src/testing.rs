//! In-memory fakes for the workflow seams

use crate::api::*;
use crate::db::models::{ScrapingJob, SourceProfile};
use crate::db::{JobStore, NewJob};
use crate::errors::{AppError, Result};
use crate::tenant::TenantContext;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

/// Scraping API fake with queued responses per endpoint
#[derive(Default)]
pub struct FakeApi {
    pub create_base: Mutex<VecDeque<Result<CreateBaseResponse>>>,
    pub scrape: Mutex<VecDeque<Result<ScrapeFollowersResponse>>>,
    pub ingest: Mutex<VecDeque<Result<IngestResponse>>>,
    pub create_base_calls: Mutex<Vec<(String, CreateBaseRequest)>>,
    pub scrape_calls: Mutex<Vec<ScrapeFollowersRequest>>,
    pub ingest_calls: Mutex<Vec<IngestRequest>>,
}

impl FakeApi {
    pub fn tables_created(n: u32) -> CreateBaseResponse {
        CreateBaseResponse {
            success: true,
            tables_created: n,
            ..Default::default()
        }
    }

    pub fn push_create_base(&self, response: Result<CreateBaseResponse>) {
        self.create_base.lock().unwrap().push_back(response);
    }

    pub fn push_scrape(&self, response: Result<ScrapeFollowersResponse>) {
        self.scrape.lock().unwrap().push_back(response);
    }

    pub fn push_ingest(&self, response: Result<IngestResponse>) {
        self.ingest.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl ScraperApi for FakeApi {
    async fn create_base(
        &self,
        ctx: &TenantContext,
        request: &CreateBaseRequest,
    ) -> Result<CreateBaseResponse> {
        self.create_base_calls
            .lock()
            .unwrap()
            .push((ctx.base_id().to_string(), request.clone()));
        self.create_base
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::tables_created(request.num_vas)))
    }

    async fn scrape_followers(
        &self,
        _ctx: &TenantContext,
        request: &ScrapeFollowersRequest,
    ) -> Result<ScrapeFollowersResponse> {
        self.scrape_calls.lock().unwrap().push(request.clone());
        self.scrape.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(ScrapeFollowersResponse {
                success: true,
                data: Some(ScrapeData::default()),
                error: None,
            })
        })
    }

    async fn ingest(&self, _ctx: &TenantContext, request: &IngestRequest) -> Result<IngestResponse> {
        self.ingest_calls.lock().unwrap().push(request.clone());
        self.ingest.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(IngestResponse {
                success: true,
                added_to_global: request.profiles.len() as u32,
                error: None,
            })
        })
    }
}

/// Job store fake
#[derive(Default)]
pub struct FakeStore {
    pub fail_create: bool,
    pub created: Mutex<Vec<(String, NewJob)>>,
    pub profiles: Vec<SourceProfile>,
}

#[async_trait]
impl JobStore for FakeStore {
    async fn create_job(&self, ctx: &TenantContext, job: NewJob) -> Result<ScrapingJob> {
        self.created
            .lock()
            .unwrap()
            .push((ctx.base_id().to_string(), job.clone()));

        if self.fail_create {
            return Err(AppError::DatabaseConnection {
                message: "connection reset".to_string(),
            });
        }

        Ok(ScrapingJob {
            job_id: Uuid::new_v4(),
            influencer_name: job.influencer_name,
            platform: job.platform.as_str().to_string(),
            airtable_base_id: ctx.base_id().to_string(),
            base_id: ctx.base_id().to_string(),
            num_vas: job.num_vas.map(|n| n as i32),
            status: "active".to_string(),
            created_at: chrono::Utc::now().into(),
            updated_at: None,
        })
    }

    async fn source_profiles(&self, ctx: &TenantContext) -> Result<Vec<SourceProfile>> {
        Ok(self
            .profiles
            .iter()
            .filter(|p| p.base_id == ctx.base_id())
            .cloned()
            .collect())
    }
}
