//! Field entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Field subtype discriminator.
///
/// Subtype-specific metadata (maxlength, bounds, textarea flag) lives in the
/// `config` JSONB column; lookup values live in their own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[sea_orm(string_value = "text")]
    Text,
    #[sea_orm(string_value = "numeric")]
    Numeric,
    #[sea_orm(string_value = "date")]
    Date,
    #[sea_orm(string_value = "datetime")]
    Datetime,
    #[sea_orm(string_value = "time")]
    Time,
    #[sea_orm(string_value = "boolean")]
    Boolean,
    #[sea_orm(string_value = "lookup")]
    Lookup,
    #[sea_orm(string_value = "multi_lookup")]
    MultiLookup,
}

/// Field lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "field")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub category_id: String,

    /// Slug derived from the name at creation; unique per category and
    /// immutable afterwards. Payload properties are keyed by this.
    pub key: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(default_value = false)]
    pub required: bool,

    #[sea_orm(default_value = 0)]
    pub order: i32,

    pub status: FieldStatus,

    pub kind: FieldKind,

    /// Subtype metadata: `{"maxlength": …, "textarea": …}` for text,
    /// `{"minval": …, "maxval": …}` for numeric. Empty object otherwise.
    #[sea_orm(column_type = "JsonBinary")]
    pub config: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,

    #[sea_orm(has_many = "super::lookup_value::Entity")]
    LookupValues,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::lookup_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LookupValues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
