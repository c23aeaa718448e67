//! Contribution entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contribution lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum ContributionStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "review")]
    Review,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

/// One user-submitted geospatial record on a project.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contribution")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub project_id: String,

    #[sea_orm(indexed)]
    pub category_id: String,

    #[sea_orm(indexed)]
    pub location_id: String,

    pub status: ContributionStatus,

    /// Field values keyed by field key.
    #[sea_orm(column_type = "JsonBinary")]
    pub properties: Json,

    #[sea_orm(indexed)]
    pub creator_id: String,

    #[sea_orm(nullable)]
    pub updator_id: Option<String>,

    /// Advisory; bumped on every accepted non-draft update, never used to
    /// reject writes (last-writer-wins).
    #[sea_orm(default_value = 1)]
    pub version: i32,

    /// `key:value` of the category's display field, denormalized for lists.
    #[sea_orm(nullable)]
    pub display_field: Option<String>,

    #[sea_orm(default_value = 0)]
    pub num_media: i32,

    #[sea_orm(default_value = 0)]
    pub num_comments: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,

    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,

    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id"
    )]
    Creator,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::media_file::Entity")]
    MediaFiles,

    #[sea_orm(has_many = "super::contribution_snapshot::Entity")]
    Snapshots,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
