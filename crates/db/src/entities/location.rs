//! Location entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A geometry-bearing location contributions attach to.
///
/// Locations are either global or scoped to a single project via
/// `private_for_project`; a private location without a project scope can
/// never be referenced by a contribution payload.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "location")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(nullable)]
    pub name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// GeoJSON geometry (Point / LineString / Polygon), lon/lat WGS84.
    #[sea_orm(column_type = "JsonBinary")]
    pub geometry: Json,

    #[sea_orm(default_value = false)]
    pub is_private: bool,

    #[sea_orm(nullable, indexed)]
    pub private_for_project: Option<String>,

    pub creator_id: String,

    #[sea_orm(default_value = 1)]
    pub version: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::PrivateForProject",
        to = "super::project::Column::Id"
    )]
    Project,

    #[sea_orm(has_many = "super::contribution::Entity")]
    Contributions,
}

impl Related<super::contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
