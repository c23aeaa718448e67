//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique, compared case-insensitively via `display_name_lower`.
    #[sea_orm(unique)]
    pub display_name: String,

    pub display_name_lower: String,

    #[sea_orm(unique)]
    pub email: String,

    pub email_lower: String,

    /// Argon2 hash; NULL for the anonymous sentinel.
    #[sea_orm(nullable)]
    pub password_hash: Option<String>,

    /// Opaque bearer token for API access.
    #[sea_orm(unique, nullable)]
    pub token: Option<String>,

    /// The distinguished anonymous sentinel row carries `true` here.
    #[sea_orm(default_value = false)]
    pub is_anonymous: bool,

    #[sea_orm(default_value = false)]
    pub is_superuser: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contribution::Entity")]
    Contributions,

    #[sea_orm(has_many = "super::project_admin::Entity")]
    AdminOf,
}

impl Related<super::contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
