//! Category and field schema types.
//!
//! Subtype-specific metadata lives in the field's `config` JSONB column in
//! the database; this module lifts it into a tagged enum so validation and
//! filtering can match on it.

use geonote_common::{AppError, AppResult};
use geonote_db::entities::{category, field, lookup_value};
use serde::Serialize;

/// A lookup value as carried by a field schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupValueRef {
    pub id: String,
    pub name: String,
    pub symbol: Option<String>,
    pub active: bool,
}

/// Subtype of a field, with its validation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Text {
        maxlength: Option<usize>,
        textarea: bool,
    },
    Numeric {
        minval: Option<f64>,
        maxval: Option<f64>,
    },
    Date,
    Datetime,
    Time,
    Boolean,
    Lookup {
        values: Vec<LookupValueRef>,
    },
    MultiLookup {
        values: Vec<LookupValueRef>,
    },
}

impl FieldType {
    /// Active lookup value ids, or `None` for non-lookup subtypes.
    #[must_use]
    pub fn active_lookup_ids(&self) -> Option<Vec<&str>> {
        match self {
            Self::Lookup { values } | Self::MultiLookup { values } => Some(
                values
                    .iter()
                    .filter(|v| v.active)
                    .map(|v| v.id.as_str())
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// A field of a category, ready for validation and filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    pub id: String,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    pub active: bool,
    pub order: i32,
    #[serde(flatten)]
    pub field_type: FieldType,
}

impl FieldSchema {
    /// Build a field schema from its row and lookup values.
    pub fn from_model(
        model: &field::Model,
        lookup_values: &[lookup_value::Model],
    ) -> AppResult<Self> {
        let config = &model.config;

        let field_type = match model.kind {
            field::FieldKind::Text => FieldType::Text {
                maxlength: config
                    .get("maxlength")
                    .and_then(serde_json::Value::as_u64)
                    .map(|v| v as usize),
                textarea: config
                    .get("textarea")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false),
            },
            field::FieldKind::Numeric => FieldType::Numeric {
                minval: config.get("minval").and_then(serde_json::Value::as_f64),
                maxval: config.get("maxval").and_then(serde_json::Value::as_f64),
            },
            field::FieldKind::Date => FieldType::Date,
            field::FieldKind::Datetime => FieldType::Datetime,
            field::FieldKind::Time => FieldType::Time,
            field::FieldKind::Boolean => FieldType::Boolean,
            field::FieldKind::Lookup | field::FieldKind::MultiLookup => {
                let values: Vec<LookupValueRef> = lookup_values
                    .iter()
                    .filter(|v| v.field_id == model.id)
                    .map(|v| LookupValueRef {
                        id: v.id.clone(),
                        name: v.name.clone(),
                        symbol: v.symbol.clone(),
                        active: v.status == lookup_value::LookupStatus::Active,
                    })
                    .collect();

                if model.kind == field::FieldKind::Lookup {
                    FieldType::Lookup { values }
                } else {
                    FieldType::MultiLookup { values }
                }
            }
        };

        Ok(Self {
            id: model.id.clone(),
            key: model.key.clone(),
            name: model.name.clone(),
            description: model.description.clone(),
            required: model.required,
            active: model.status == field::FieldStatus::Active,
            order: model.order,
            field_type,
        })
    }
}

/// A category with its fields, the unit the validator and the filter
/// compiler work on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySchema {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub default_status: category::DefaultStatus,
    pub display_field_id: Option<String>,
    pub fields: Vec<FieldSchema>,
}

impl CategorySchema {
    /// Build a category schema from its rows.
    pub fn from_models(
        model: &category::Model,
        fields: &[field::Model],
        lookup_values: &[lookup_value::Model],
    ) -> AppResult<Self> {
        let mut schema_fields = fields
            .iter()
            .map(|f| FieldSchema::from_model(f, lookup_values))
            .collect::<AppResult<Vec<_>>>()?;
        schema_fields.sort_by_key(|f| f.order);

        Ok(Self {
            id: model.id.clone(),
            project_id: model.project_id.clone(),
            name: model.name.clone(),
            description: model.description.clone(),
            active: model.status == category::CategoryStatus::Active,
            default_status: model.default_status,
            display_field_id: model.display_field_id.clone(),
            fields: schema_fields,
        })
    }

    /// Active field with the given key.
    #[must_use]
    pub fn active_field(&self, key: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.active && f.key == key)
    }

    /// All active fields, in order.
    pub fn active_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.active)
    }

    /// The field serving as display field, if set and active.
    #[must_use]
    pub fn display_field(&self) -> Option<&FieldSchema> {
        self.display_field_id
            .as_deref()
            .and_then(|id| self.fields.iter().find(|f| f.id == id && f.active))
    }

    /// A copy with inactive fields and inactive lookup values removed, the
    /// shape non-admins see.
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        masked.fields.retain(|f| f.active);
        for field in &mut masked.fields {
            if let FieldType::Lookup { values } | FieldType::MultiLookup { values } =
                &mut field.field_type
            {
                values.retain(|v| v.active);
            }
        }
        masked
    }
}

/// Derive a field key from its name: lowercased, non-alphanumerics replaced
/// by hyphens, collisions resolved with `-1`, `-2`, ... suffixes.
///
/// `exists` reports whether a candidate key is already taken within the
/// category. Keys are immutable once created.
pub fn derive_key<F>(name: &str, mut exists: F) -> AppResult<String>
where
    F: FnMut(&str) -> AppResult<bool>,
{
    let mut slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    slug = slug.trim_matches('-').to_string();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "Field name must contain at least one alphanumeric character".to_string(),
        ));
    }

    if !exists(&slug)? {
        return Ok(slug);
    }
    for n in 1.. {
        let candidate = format!("{slug}-{n}");
        if !exists(&candidate)? {
            return Ok(candidate);
        }
    }
    unreachable!()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn field_model(kind: field::FieldKind, config: serde_json::Value) -> field::Model {
        field::Model {
            id: "f1".to_string(),
            category_id: "c1".to_string(),
            key: "age".to_string(),
            name: "Age".to_string(),
            description: None,
            required: false,
            order: 0,
            status: field::FieldStatus::Active,
            kind,
            config,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn numeric_config_is_lifted() {
        let model = field_model(field::FieldKind::Numeric, json!({"minval": 0, "maxval": 120}));
        let schema = FieldSchema::from_model(&model, &[]).unwrap();
        assert_eq!(
            schema.field_type,
            FieldType::Numeric {
                minval: Some(0.0),
                maxval: Some(120.0)
            }
        );
    }

    #[test]
    fn lookup_values_are_attached_and_filtered() {
        let model = field_model(field::FieldKind::Lookup, json!({}));
        let values = vec![
            lookup_value::Model {
                id: "v1".to_string(),
                field_id: "f1".to_string(),
                name: "Oak".to_string(),
                symbol: None,
                status: lookup_value::LookupStatus::Active,
                order: 0,
            },
            lookup_value::Model {
                id: "v2".to_string(),
                field_id: "f1".to_string(),
                name: "Elm".to_string(),
                symbol: None,
                status: lookup_value::LookupStatus::Inactive,
                order: 1,
            },
            lookup_value::Model {
                id: "v3".to_string(),
                field_id: "other".to_string(),
                name: "Ash".to_string(),
                symbol: None,
                status: lookup_value::LookupStatus::Active,
                order: 2,
            },
        ];
        let schema = FieldSchema::from_model(&model, &values).unwrap();
        assert_eq!(schema.field_type.active_lookup_ids(), Some(vec!["v1"]));
    }

    #[test]
    fn derive_key_slugifies() {
        let key = derive_key("Tree Height (m)", |_| Ok(false)).unwrap();
        assert_eq!(key, "tree-height-m");
    }

    #[test]
    fn derive_key_resolves_collisions() {
        let taken = ["name".to_string(), "name-1".to_string()];
        let key = derive_key("Name", |k| Ok(taken.contains(&k.to_string()))).unwrap();
        assert_eq!(key, "name-2");
    }

    #[test]
    fn derive_key_rejects_empty_slug() {
        assert!(derive_key("***", |_| Ok(false)).is_err());
    }
}
