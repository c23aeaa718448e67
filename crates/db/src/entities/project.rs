//! Project entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

/// Who may contribute without explicit group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum EveryoneContributes {
    /// Everyone, including the anonymous sentinel.
    #[sea_orm(string_value = "true")]
    #[serde(rename = "true")]
    True,
    /// Any authenticated principal.
    #[sea_orm(string_value = "auth")]
    #[serde(rename = "auth")]
    Auth,
    /// Group members only.
    #[sea_orm(string_value = "false")]
    #[serde(rename = "false")]
    False,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_private: bool,

    pub status: ProjectStatus,

    pub everyone_contributes: EveryoneContributes,

    #[sea_orm(indexed)]
    pub creator_id: String,

    /// Optional geographic extent as a GeoJSON polygon (lon/lat, WGS84).
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub geographic_extent: Option<Json>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id"
    )]
    Creator,

    #[sea_orm(has_many = "super::project_admin::Entity")]
    Admins,

    #[sea_orm(has_many = "super::user_group::Entity")]
    UserGroups,

    #[sea_orm(has_many = "super::category::Entity")]
    Categories,

    #[sea_orm(has_many = "super::grouping::Entity")]
    Groupings,

    #[sea_orm(has_many = "super::contribution::Entity")]
    Contributions,
}

impl Related<super::project_admin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Admins.def()
    }
}

impl Related<super::user_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserGroups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
