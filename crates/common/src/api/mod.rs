//! Scraping/table API client
//!
//! Every outbound request carries the tenant identifier in the `X-Base-Id`
//! header and a JSON body. A blank tenant never reaches the network: the
//! helper validates the context before building the request.

mod types;

pub use types::*;

use crate::config::ApiConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::tenant::TenantContext;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Operations of the external scraping/table API used by the workflows
#[async_trait]
pub trait ScraperApi: Send + Sync {
    /// Provision the VA tables inside the tenant's external base
    async fn create_base(
        &self,
        ctx: &TenantContext,
        request: &CreateBaseRequest,
    ) -> Result<CreateBaseResponse>;

    /// Scrape followers of the seed accounts
    async fn scrape_followers(
        &self,
        ctx: &TenantContext,
        request: &ScrapeFollowersRequest,
    ) -> Result<ScrapeFollowersResponse>;

    /// Store scraped profiles in the tenant's username pool
    async fn ingest(&self, ctx: &TenantContext, request: &IngestRequest) -> Result<IngestResponse>;
}

/// HTTP client for the scraping/table API
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    tenant_header: String,
}

impl ApiClient {
    /// Create a new client from configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tenant_header: config.tenant_header.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; paths are joined onto the base URL
    fn url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Issue a tenant-scoped JSON request
    pub async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        ctx: &TenantContext,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        if ctx.base_id().trim().is_empty() {
            return Err(AppError::MissingTenant);
        }

        let url = self.url(path);
        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header(self.tenant_header.as_str(), ctx.base_id())
            .header("Content-Type", "application/json")
            .header("X-Request-ID", ctx.request_id.as_str());

        if let Some(body) = body {
            builder = builder.json(body);
        }

        tracing::debug!(
            method = %method,
            url = %url,
            base_id = %ctx.base_id(),
            "Sending API request"
        );

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                AppError::Connection { base_url: self.base_url.clone() }
            } else {
                AppError::HttpClient(e)
            }
        })?;

        let status = response.status();
        let text = response.text().await?;

        // Error responses still carry a JSON envelope with `success: false`
        match serde_json::from_str::<T>(&text) {
            Ok(value) => Ok(value),
            Err(e) if status.is_success() => Err(AppError::Serialization(e)),
            Err(_) => Err(AppError::Upstream {
                message: format!("API error {}: {}", status, text),
            }),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, ctx: &TenantContext) -> Result<T> {
        self.request::<(), T>(Method::GET, path, ctx, None).await
    }

    pub async fn post<B, T>(&self, path: &str, ctx: &TenantContext, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, ctx, Some(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, ctx: &TenantContext, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, ctx, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str, ctx: &TenantContext) -> Result<T> {
        self.request::<(), T>(Method::DELETE, path, ctx, None).await
    }

    async fn timed_post<B, T>(&self, endpoint: &'static str, ctx: &TenantContext, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let result = self.post(endpoint, ctx, body).await;
        metrics::record_api_call(endpoint, start.elapsed().as_secs_f64(), result.is_ok());
        result
    }
}

#[async_trait]
impl ScraperApi for ApiClient {
    async fn create_base(
        &self,
        ctx: &TenantContext,
        request: &CreateBaseRequest,
    ) -> Result<CreateBaseResponse> {
        self.timed_post("/api/airtable/create-base", ctx, request).await
    }

    async fn scrape_followers(
        &self,
        ctx: &TenantContext,
        request: &ScrapeFollowersRequest,
    ) -> Result<ScrapeFollowersResponse> {
        self.timed_post("/api/scrape-followers", ctx, request).await
    }

    async fn ingest(&self, ctx: &TenantContext, request: &IngestRequest) -> Result<IngestResponse> {
        self.timed_post("/api/ingest", ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            tenant_header: "X-Base-Id".to_string(),
        })
        .unwrap()
    }

    fn ctx() -> TenantContext {
        TenantContext::from_raw("appAbCdEfGhIjKlMn").unwrap()
    }

    #[tokio::test]
    async fn test_tenant_header_and_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/airtable/create-base"))
            .and(header("X-Base-Id", "appAbCdEfGhIjKlMn"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(serde_json::json!({
                "base_id": "appAbCdEfGhIjKlMn",
                "num_vas": 3,
                "base_name": "FitMomGhana's Instagram Job"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "tables_created": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client_for(&server)
            .create_base(&ctx(), &CreateBaseRequest {
                base_id: "appAbCdEfGhIjKlMn".into(),
                num_vas: 3,
                base_name: "FitMomGhana's Instagram Job".into(),
            })
            .await
            .unwrap();
        assert!(resp.success);
        assert_eq!(resp.tables_created, 3);
    }

    #[tokio::test]
    async fn test_conflict_body_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/airtable/create-base"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "success": false,
                "error": "duplicate_base_id",
                "existing_job": {"influencer_name": "Ama", "platform": "threads"}
            })))
            .mount(&server)
            .await;

        let resp = client_for(&server)
            .create_base(&ctx(), &CreateBaseRequest {
                base_id: "appAbCdEfGhIjKlMn".into(),
                num_vas: 1,
                base_name: "x".into(),
            })
            .await
            .unwrap();
        assert!(resp.is_duplicate_base());
    }

    #[tokio::test]
    async fn test_conflict_with_partial_existing_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/airtable/create-base"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "success": false,
                "error": "duplicate_base_id",
                "existing_job": {"job_id": "abc", "influencer_name": "Ama"}
            })))
            .mount(&server)
            .await;

        let resp = client_for(&server)
            .create_base(&ctx(), &CreateBaseRequest {
                base_id: "appAbCdEfGhIjKlMn".into(),
                num_vas: 1,
                base_name: "x".into(),
            })
            .await
            .unwrap();
        assert!(resp.is_duplicate_base());

        let job = resp.existing_job.unwrap();
        assert_eq!(job.job_id.as_deref(), Some("abc"));
        assert!(job.platform.is_none());
    }

    #[tokio::test]
    async fn test_non_json_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ingest"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .ingest(&ctx(), &IngestRequest { profiles: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { message } if message.contains("500")));
    }

    #[tokio::test]
    async fn test_blank_tenant_never_reaches_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ScrapeFollowersRequest {
            accounts: vec!["a".into()],
            target_gender: "male".into(),
            total_scrape_count: 10,
            platform: Platform::Instagram,
        };

        let result = match TenantContext::from_raw("  ") {
            Ok(ctx) => client.scrape_followers(&ctx, &request).await.map(|_| ()),
            Err(e) => Err(e),
        };
        assert!(matches!(result, Err(AppError::MissingTenant)));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_connection_error() {
        let client = ApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            tenant_header: "X-Base-Id".into(),
        })
        .unwrap();

        let err = client
            .get::<serde_json::Value>("/api/health", &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Connection { base_url } if base_url == "http://127.0.0.1:9"));
    }
}
