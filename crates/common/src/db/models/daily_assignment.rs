//! Daily assignment entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outreach status, advanced by the external distribution process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Followed,
    Unfollow,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Followed => "followed",
            AssignmentStatus::Unfollow => "unfollow",
            AssignmentStatus::Completed => "completed",
        }
    }
}

impl From<&str> for AssignmentStatus {
    fn from(s: &str) -> Self {
        match s {
            "followed" => AssignmentStatus::Followed,
            "unfollow" => AssignmentStatus::Unfollow,
            "completed" => AssignmentStatus::Completed,
            _ => AssignmentStatus::Pending,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub assignment_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub campaign_id: String,

    pub va_table_number: i32,

    pub position: i32,

    /// Profile id of the assigned account
    #[sea_orm(column_type = "Text")]
    pub id: String,

    #[sea_orm(column_type = "Text")]
    pub username: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub full_name: Option<String>,

    pub assigned_at: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub updated_at: Option<DateTimeWithTimeZone>,

    pub job_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub base_id: String,
}

impl Model {
    pub fn assignment_status(&self) -> AssignmentStatus {
        AssignmentStatus::from(self.status.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scraping_job::Entity",
        from = "Column::JobId",
        to = "super::scraping_job::Column::JobId"
    )]
    Job,
}

impl Related<super::scraping_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
