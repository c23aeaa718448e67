//! Grouping access record entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grants a user group access to a private data grouping.
///
/// `can_view` admits the grouping's metadata, `can_read` admits the data
/// behind it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "grouping_access")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub grouping_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: String,

    #[sea_orm(default_value = true)]
    pub can_view: bool,

    #[sea_orm(default_value = false)]
    pub can_read: bool,
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
        belongs_to = "super::user_group::Entity",
        from = "Column::GroupId",
        to = "super::user_group::Column::Id"
    )]
    Group,
}

impl Related<super::grouping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grouping.def()
    }
}

impl Related<super::user_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
