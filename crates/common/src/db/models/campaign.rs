//! Campaign entity (read-only here)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub campaign_id: String,

    pub campaign_date: Date,

    pub total_assigned: i32,

    /// true when the distribution run succeeded
    pub status: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text")]
    pub base_id: String,
}

impl Model {
    pub fn status_label(&self) -> &'static str {
        if self.status {
            "success"
        } else {
            "failed"
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
