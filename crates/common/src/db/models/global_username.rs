//! Global username entity (discovered candidate accounts)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "global_usernames")]
pub struct Model {
    /// Platform profile id
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,

    #[sea_orm(column_type = "Text")]
    pub username: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub full_name: Option<String>,

    pub used: bool,

    pub used_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub job_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub base_id: String,
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
