//! Contribution history snapshot entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::contribution::ContributionStatus;

/// Write-once snapshot of a contribution taken before each update.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contribution_snapshot")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub contribution_id: String,

    pub status: ContributionStatus,

    #[sea_orm(column_type = "JsonBinary")]
    pub properties: Json,

    pub version: i32,

    #[sea_orm(nullable)]
    pub updator_id: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contribution::Entity",
        from = "Column::ContributionId",
        to = "super::contribution::Column::Id"
    )]
    Contribution,
}

impl Related<super::contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contribution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
