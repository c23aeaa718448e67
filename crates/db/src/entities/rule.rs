//! Grouping rule entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rule lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

/// One disjunct in a grouping's filter, pinned to a single category.
///
/// `constraints` maps field keys of the pinned category to subtype-specific
/// constraint objects; keys must exist as active fields on that category,
/// enforced on write.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rule")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub grouping_id: String,

    pub category_id: String,

    #[sea_orm(nullable)]
    pub min_date: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub max_date: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub constraints: Option<Json>,

    pub status: RuleStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::grouping::Entity",
        from = "Column::GroupingId",
        to = "super::grouping::Column::Id"
    )]
    Grouping,

    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::grouping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grouping.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
