//! Wire types for the scraping/table API

use crate::errors::ExistingJob;
use crate::platform::Platform;
use serde::{Deserialize, Deserializer, Serialize};

/// Error string the table API uses for an already-linked base
pub const DUPLICATE_BASE_ERROR: &str = "duplicate_base_id";

/// `POST /api/airtable/create-base`
#[derive(Debug, Clone, Serialize)]
pub struct CreateBaseRequest {
    pub base_id: String,
    pub num_vas: u32,
    pub base_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBaseResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "count_or_len")]
    pub tables_created: u32,
    #[serde(default, deserialize_with = "optional_count_or_len")]
    pub tables_skipped: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub existing_job: Option<ExistingJob>,
}

impl CreateBaseResponse {
    pub fn is_duplicate_base(&self) -> bool {
        self.error.as_deref() == Some(DUPLICATE_BASE_ERROR)
    }
}

/// `POST /api/scrape-followers`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeFollowersRequest {
    pub accounts: Vec<String>,
    pub target_gender: String,
    pub total_scrape_count: u32,
    pub platform: Platform,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeFollowersResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<ScrapeData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeData {
    #[serde(default)]
    pub accounts: Vec<ScrapedAccount>,
    #[serde(default)]
    pub total_filtered: u32,
    #[serde(default)]
    pub total_scraped: u32,
    #[serde(default)]
    pub gender_distribution: GenderDistribution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedAccount {
    pub id: String,
    pub username: String,
    #[serde(default, rename = "fullName")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GenderDistribution {
    #[serde(default)]
    pub male: u32,
    #[serde(default)]
    pub female: u32,
    #[serde(default)]
    pub unknown: u32,
}

/// `POST /api/ingest`
#[derive(Debug, Clone, Serialize)]
pub struct IngestRequest {
    pub profiles: Vec<IngestProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestProfile {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
}

impl From<&ScrapedAccount> for IngestProfile {
    fn from(account: &ScrapedAccount) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            full_name: account.full_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub added_to_global: u32,
    #[serde(default)]
    pub error: Option<String>,
}

/// Table counts arrive either as a number or as the list of table names
fn count_or_len<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    optional_count_or_len(deserializer).map(|count| count.unwrap_or(0))
}

fn optional_count_or_len<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().map(|n| n as u32),
        Some(serde_json::Value::Array(items)) => Some(items.len() as u32),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_base_response_shapes() {
        let counted: CreateBaseResponse =
            serde_json::from_str(r#"{"success":true,"tables_created":3,"tables_skipped":1}"#).unwrap();
        assert_eq!(counted.tables_created, 3);
        assert_eq!(counted.tables_skipped, Some(1));

        let listed: CreateBaseResponse =
            serde_json::from_str(r#"{"success":true,"tables_created":["VA 1","VA 2"]}"#).unwrap();
        assert_eq!(listed.tables_created, 2);
        assert_eq!(listed.tables_skipped, None);
    }

    #[test]
    fn test_duplicate_base_response() {
        let body = r#"{
            "success": false,
            "error": "duplicate_base_id",
            "existing_job": {"influencer_name": "FitMomGhana", "platform": "instagram"}
        }"#;
        let resp: CreateBaseResponse = serde_json::from_str(body).unwrap();
        assert!(resp.is_duplicate_base());
        assert_eq!(
            resp.existing_job.unwrap().influencer_name.as_deref(),
            Some("FitMomGhana")
        );
    }

    #[test]
    fn test_scrape_request_wire_names() {
        let req = ScrapeFollowersRequest {
            accounts: vec!["fitmom".into()],
            target_gender: "male".into(),
            total_scrape_count: 150,
            platform: Platform::Threads,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["targetGender"], "male");
        assert_eq!(json["totalScrapeCount"], 150);
        assert_eq!(json["platform"], "threads");
    }

    #[test]
    fn test_scrape_response_parsing() {
        let body = r#"{
            "success": true,
            "data": {
                "accounts": [{"id": "1", "username": "a", "fullName": "A"}],
                "totalFiltered": 1,
                "totalScraped": 40,
                "genderDistribution": {"male": 1, "female": 30, "unknown": 9}
            }
        }"#;
        let resp: ScrapeFollowersResponse = serde_json::from_str(body).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data.accounts[0].full_name.as_deref(), Some("A"));
        assert_eq!(data.total_scraped, 40);
        assert_eq!(data.gender_distribution.female, 30);
    }
}
