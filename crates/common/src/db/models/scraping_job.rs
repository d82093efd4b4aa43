//! Scraping job entity

use crate::errors::AppError;
use crate::platform::Platform;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Job lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Paused,
    Archived,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Paused => "paused",
            JobStatus::Archived => "archived",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Active => "Active",
            JobStatus::Paused => "Paused",
            JobStatus::Archived => "Archived",
        }
    }

    /// Archived jobs are never resurrected
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self == next || self != JobStatus::Archived
    }

    /// Validate a user-triggered transition
    pub fn transition(self, next: JobStatus) -> crate::errors::Result<JobStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition {
                message: format!("Cannot move an {} job to {}", self, next),
            })
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AppError;

    fn from_str(s: &str) -> crate::errors::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(JobStatus::Active),
            "paused" => Ok(JobStatus::Paused),
            "archived" => Ok(JobStatus::Archived),
            other => Err(AppError::InvalidFormat {
                message: format!("Unknown job status: {}", other),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scraping_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub job_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub influencer_name: String,

    #[sea_orm(column_type = "Text")]
    pub platform: String,

    #[sea_orm(column_type = "Text", unique)]
    pub airtable_base_id: String,

    /// Tenant partition key, mirrors `airtable_base_id`
    #[sea_orm(column_type = "Text")]
    pub base_id: String,

    pub num_vas: Option<i32>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Stored status as an enum; unknown values read as paused
    pub fn job_status(&self) -> JobStatus {
        self.status.parse().unwrap_or(JobStatus::Paused)
    }

    pub fn platform(&self) -> Option<Platform> {
        self.platform.parse().ok()
    }

    pub fn is_legacy(&self) -> bool {
        super::is_legacy_job(Some(self.job_id))
    }

    pub fn display_name(&self) -> String {
        match self.platform() {
            Some(platform) => super::job_display_name(&self.influencer_name, platform),
            None => format!("{}'s {} Job", self.influencer_name, self.platform),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::global_username::Entity")]
    Usernames,

    #[sea_orm(has_many = "super::daily_assignment::Entity")]
    Assignments,
}

impl Related<super::global_username::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usernames.def()
    }
}

impl Related<super::daily_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
