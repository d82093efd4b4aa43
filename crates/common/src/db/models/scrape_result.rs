//! Scrape result entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scrape_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Asynchronous scrape run this row came from
    #[sea_orm(column_type = "Text")]
    pub job_id: String,

    /// Owning scraping job (legacy statistics key)
    pub scraping_job_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub profile_id: String,

    #[sea_orm(column_type = "Text")]
    pub username: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub full_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub source_account: Option<String>,

    pub created_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text")]
    pub base_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
