//! SeaORM entity models
//!
//! Every tenant-scoped table carries a `base_id` partition column.

mod campaign;
mod daily_assignment;
mod global_username;
mod scrape_result;
mod scraping_job;
mod source_profile;

use crate::platform::Platform;
use uuid::Uuid;

pub use scraping_job::{
    Entity as ScrapingJobEntity,
    Model as ScrapingJob,
    ActiveModel as ScrapingJobActiveModel,
    Column as ScrapingJobColumn,
    JobStatus,
};

pub use global_username::{
    Entity as GlobalUsernameEntity,
    Model as GlobalUsername,
    ActiveModel as GlobalUsernameActiveModel,
    Column as GlobalUsernameColumn,
};

pub use daily_assignment::{
    Entity as DailyAssignmentEntity,
    Model as DailyAssignment,
    ActiveModel as DailyAssignmentActiveModel,
    Column as DailyAssignmentColumn,
    AssignmentStatus,
};

pub use campaign::{
    Entity as CampaignEntity,
    Model as Campaign,
    ActiveModel as CampaignActiveModel,
    Column as CampaignColumn,
};

pub use scrape_result::{
    Entity as ScrapeResultEntity,
    Model as ScrapeResult,
    Column as ScrapeResultColumn,
};

pub use source_profile::{
    Entity as SourceProfileEntity,
    Model as SourceProfile,
    ActiveModel as SourceProfileActiveModel,
    Column as SourceProfileColumn,
};

/// Placeholder job that owns all rows written before jobs were partitioned
pub const LEGACY_PLACEHOLDER_JOB_ID: Uuid = Uuid::from_u128(1);

pub fn is_legacy_job(job_id: Option<Uuid>) -> bool {
    job_id == Some(LEGACY_PLACEHOLDER_JOB_ID)
}

/// `"{influencer}'s {Platform} Job"`, also used as the external base name
pub fn job_display_name(influencer_name: &str, platform: Platform) -> String {
    format!("{}'s {} Job", influencer_name, platform.spec().display_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_placeholder() {
        assert_eq!(
            LEGACY_PLACEHOLDER_JOB_ID.to_string(),
            "00000000-0000-0000-0000-000000000001"
        );
        assert!(is_legacy_job(Some(LEGACY_PLACEHOLDER_JOB_ID)));
        assert!(!is_legacy_job(None));
        assert!(!is_legacy_job(Some(Uuid::new_v4())));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(job_display_name("FitMomGhana", Platform::Instagram), "FitMomGhana's Instagram Job");
        assert_eq!(job_display_name("Ama", Platform::X), "Ama's X (Twitter) Job");
    }

    #[test]
    fn test_status_transitions() {
        use JobStatus::*;
        assert!(Active.transition(Paused).is_ok());
        assert!(Paused.transition(Active).is_ok());
        assert!(Paused.transition(Archived).is_ok());
        assert!(Archived.transition(Archived).is_ok());
        assert!(Archived.transition(Active).is_err());
        assert!(Archived.transition(Paused).is_err());
        assert_eq!("ARCHIVED".parse::<JobStatus>().unwrap(), Archived);
        assert_eq!(Paused.label(), "Paused");
    }

    #[test]
    fn test_assignment_status_parse() {
        assert_eq!(AssignmentStatus::from("followed"), AssignmentStatus::Followed);
        assert_eq!(AssignmentStatus::from("garbage"), AssignmentStatus::Pending);
        assert_eq!(AssignmentStatus::Completed.as_str(), "completed");
    }
}
