//! User group entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A per-project group of principals carrying contribution and moderation
/// capabilities. The `can_moderate ⇒ can_contribute` invariant is enforced
/// by [`crate::repositories::ProjectRepository`] on write.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub project_id: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(default_value = false)]
    pub can_contribute: bool,

    #[sea_orm(default_value = false)]
    pub can_moderate: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,

    #[sea_orm(has_many = "super::user_group_member::Entity")]
    Members,

    #[sea_orm(has_many = "super::grouping_access::Entity")]
    GroupingAccess,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::user_group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
