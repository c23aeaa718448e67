//! Category and field schema management.
//!
//! All schema writes go through here so the per-project schema cache is
//! invalidated exactly once per mutation.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use geonote_common::{AppError, AppResult, IdGenerator};
use geonote_db::entities::category::{CategoryStatus, DefaultStatus};
use geonote_db::entities::field::{FieldKind, FieldStatus};
use geonote_db::entities::lookup_value::LookupStatus;
use geonote_db::entities::{category, field, lookup_value, rule, user};
use geonote_db::repositories::{
    CategoryRepository, ContributionRepository, GroupingRepository,
};
use sea_orm::Set;
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use crate::cache::CategoryCache;
use crate::fields::{CategorySchema, derive_key};
use crate::policy;
use crate::services::context::ContextLoader;

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub default_status: DefaultStatus,
}

/// Input for updating a category. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<CategoryStatus>,
    pub default_status: Option<DefaultStatus>,
    pub display_field_id: Option<Option<String>>,
}

/// Input for creating a field. Subtype metadata is flattened; irrelevant
/// knobs for the chosen kind are ignored.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFieldInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub kind: FieldKind,
    pub maxlength: Option<u64>,
    #[serde(default)]
    pub textarea: bool,
    pub minval: Option<f64>,
    pub maxval: Option<f64>,
}

/// Input for updating a field. The key is immutable.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateFieldInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub required: Option<bool>,
    pub status: Option<FieldStatus>,
}

/// Input for creating a lookup value.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLookupValueInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub symbol: Option<String>,
}

/// Service for categories, fields and lookup values.
#[derive(Clone)]
pub struct CategoryService {
    categories: CategoryRepository,
    contributions: ContributionRepository,
    groupings: GroupingRepository,
    context: ContextLoader,
    cache: CategoryCache,
    ids: IdGenerator,
}

impl CategoryService {
    /// Create a new category service.
    #[must_use]
    pub const fn new(
        categories: CategoryRepository,
        contributions: ContributionRepository,
        groupings: GroupingRepository,
        context: ContextLoader,
        cache: CategoryCache,
        ids: IdGenerator,
    ) -> Self {
        Self {
            categories,
            contributions,
            groupings,
            context,
            cache,
            ids,
        }
    }

    /// Compiled schemas of all non-deleted categories of a project,
    /// inactive ones included. Served from the cache when warm.
    pub async fn schemas(&self, project_id: &str) -> AppResult<Arc<Vec<CategorySchema>>> {
        if let Some(cached) = self.cache.get(project_id).await {
            return Ok(cached);
        }

        let categories = self.categories.list(project_id).await?;
        let mut schemas = Vec::with_capacity(categories.len());
        for category in &categories {
            let fields = self.categories.fields(&category.id).await?;
            let lookup_field_ids: Vec<String> = fields
                .iter()
                .filter(|f| matches!(f.kind, FieldKind::Lookup | FieldKind::MultiLookup))
                .map(|f| f.id.clone())
                .collect();
            let lookups = self
                .categories
                .lookup_values_for_fields(&lookup_field_ids)
                .await?;
            schemas.push(CategorySchema::from_models(category, &fields, &lookups)?);
        }

        Ok(self.cache.insert(project_id, schemas).await)
    }

    /// Category schemas as the principal may see them: administrators get
    /// the full shape, everyone else active categories with inactive
    /// fields and lookup values masked out.
    pub async fn list(
        &self,
        principal: &user::Model,
        project_id: &str,
    ) -> AppResult<Vec<CategorySchema>> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_read(&ctx, &caps)?;

        let schemas = self.schemas(project_id).await?;
        if caps.is_admin {
            Ok(schemas.as_ref().clone())
        } else {
            Ok(schemas
                .iter()
                .filter(|s| s.active)
                .map(CategorySchema::masked)
                .collect())
        }
    }

    /// A single category schema, masked for non-administrators.
    pub async fn get(
        &self,
        principal: &user::Model,
        project_id: &str,
        category_id: &str,
    ) -> AppResult<CategorySchema> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_read(&ctx, &caps)?;

        let schemas = self.schemas(project_id).await?;
        let schema = schemas
            .iter()
            .find(|s| s.id == category_id)
            .ok_or_else(|| AppError::NotFound(format!("category {category_id}")))?;

        if caps.is_admin {
            Ok(schema.clone())
        } else if schema.active {
            Ok(schema.masked())
        } else {
            Err(AppError::NotFound(format!("category {category_id}")))
        }
    }

    /// Create a category.
    pub async fn create(
        &self,
        principal: &user::Model,
        project_id: &str,
        input: CreateCategoryInput,
    ) -> AppResult<category::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        input.validate()?;

        let order = self.categories.list(project_id).await?.len();
        let created = self
            .categories
            .create(category::ActiveModel {
                id: Set(self.ids.generate()),
                project_id: Set(project_id.to_string()),
                name: Set(input.name),
                description: Set(input.description),
                status: Set(CategoryStatus::Active),
                default_status: Set(input.default_status),
                order: Set(i32::try_from(order).unwrap_or(i32::MAX)),
                display_field_id: Set(None),
                creator_id: Set(principal.id.clone()),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        self.cache.invalidate(project_id).await;
        Ok(created)
    }

    /// Update a category.
    pub async fn update(
        &self,
        principal: &user::Model,
        project_id: &str,
        category_id: &str,
        input: UpdateCategoryInput,
    ) -> AppResult<category::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        input.validate()?;

        let category = self.get_existing(project_id, category_id).await?;

        if input.status == Some(CategoryStatus::Deleted) {
            return Err(AppError::BadRequest(
                "Use the delete operation to remove a category".to_string(),
            ));
        }
        if let Some(Some(field_id)) = &input.display_field_id {
            let fields = self.categories.fields(category_id).await?;
            let usable = fields
                .iter()
                .any(|f| &f.id == field_id && f.status == FieldStatus::Active);
            if !usable {
                return Err(AppError::BadRequest(
                    "Display field must be an active field of this category".to_string(),
                ));
            }
        }

        let mut model: category::ActiveModel = category.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(status) = input.status {
            model.status = Set(status);
        }
        if let Some(default_status) = input.default_status {
            model.default_status = Set(default_status);
        }
        if let Some(display_field_id) = input.display_field_id {
            model.display_field_id = Set(display_field_id);
        }

        let updated = self.categories.update(model).await?;
        self.cache.invalidate(project_id).await;
        Ok(updated)
    }

    /// Soft-delete a category. Its contributions are soft-deleted and
    /// rules pinned to it retired in the same pass.
    pub async fn delete(
        &self,
        principal: &user::Model,
        project_id: &str,
        category_id: &str,
    ) -> AppResult<()> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        let category = self.get_existing(project_id, category_id).await?;

        let mut model: category::ActiveModel = category.into();
        model.status = Set(CategoryStatus::Deleted);
        self.categories.update(model).await?;

        let removed = self
            .contributions
            .soft_delete_by_category(project_id, category_id)
            .await?;
        tracing::info!(
            category_id = %category_id,
            contributions = removed,
            "Retired category and its contributions"
        );
        for orphaned in self.groupings.rules_for_category(category_id).await? {
            let mut model: rule::ActiveModel = orphaned.into();
            model.status = Set(rule::RuleStatus::Deleted);
            self.groupings.update_rule(model).await?;
        }

        self.cache.invalidate(project_id).await;
        Ok(())
    }

    /// Persist a new display order for the project's categories. The ids
    /// must be a permutation of the existing ones.
    pub async fn reorder(
        &self,
        principal: &user::Model,
        project_id: &str,
        ordered_ids: &[String],
    ) -> AppResult<()> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        let existing: Vec<String> = self
            .categories
            .list(project_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        if !is_permutation(&existing, ordered_ids) {
            return Err(AppError::BadRequest(
                "Ordering must name every category exactly once".to_string(),
            ));
        }

        self.categories.reorder(ordered_ids).await?;
        self.cache.invalidate(project_id).await;
        Ok(())
    }

    // ==================== Fields ====================

    /// Create a field. The key is derived from the name and immutable; the
    /// first field of a category becomes its display field.
    pub async fn create_field(
        &self,
        principal: &user::Model,
        project_id: &str,
        category_id: &str,
        input: CreateFieldInput,
    ) -> AppResult<field::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        input.validate()?;

        let category = self.get_existing(project_id, category_id).await?;
        let config = build_field_config(&input)?;

        let existing = self.categories.fields(category_id).await?;
        let taken: BTreeSet<&str> = existing.iter().map(|f| f.key.as_str()).collect();
        let key = derive_key(&input.name, |candidate| Ok(taken.contains(candidate)))?;

        let created = self
            .categories
            .create_field(field::ActiveModel {
                id: Set(self.ids.generate()),
                category_id: Set(category_id.to_string()),
                key: Set(key),
                name: Set(input.name),
                description: Set(input.description),
                required: Set(input.required),
                order: Set(i32::try_from(existing.len()).unwrap_or(i32::MAX)),
                status: Set(FieldStatus::Active),
                kind: Set(input.kind),
                config: Set(config),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        if existing.is_empty() {
            let mut model: category::ActiveModel = category.into();
            model.display_field_id = Set(Some(created.id.clone()));
            self.categories.update(model).await?;
        }

        self.cache.invalidate(project_id).await;
        Ok(created)
    }

    /// Update a field. Deactivating one scrubs it from grouping rules and
    /// clears it as display field.
    pub async fn update_field(
        &self,
        principal: &user::Model,
        project_id: &str,
        category_id: &str,
        field_id: &str,
        input: UpdateFieldInput,
    ) -> AppResult<field::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        input.validate()?;

        let category = self.get_existing(project_id, category_id).await?;
        let field = self
            .categories
            .find_field(category_id, field_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("field {field_id}")))?;

        let deactivating =
            input.status == Some(FieldStatus::Inactive) && field.status == FieldStatus::Active;
        let key = field.key.clone();

        let mut model: field::ActiveModel = field.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(required) = input.required {
            model.required = Set(required);
        }
        if let Some(status) = input.status {
            model.status = Set(status);
        }
        let updated = self.categories.update_field(model).await?;

        if deactivating {
            self.scrub_field_from_rules(category_id, &key).await?;
            if category.display_field_id.as_deref() == Some(field_id) {
                let mut model: category::ActiveModel = category.into();
                model.display_field_id = Set(None);
                self.categories.update(model).await?;
            }
        }

        self.cache.invalidate(project_id).await;
        Ok(updated)
    }

    /// Persist a new display order for a category's fields.
    pub async fn reorder_fields(
        &self,
        principal: &user::Model,
        project_id: &str,
        category_id: &str,
        ordered_ids: &[String],
    ) -> AppResult<()> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        self.get_existing(project_id, category_id).await?;

        let existing: Vec<String> = self
            .categories
            .fields(category_id)
            .await?
            .into_iter()
            .map(|f| f.id)
            .collect();
        if !is_permutation(&existing, ordered_ids) {
            return Err(AppError::BadRequest(
                "Ordering must name every field exactly once".to_string(),
            ));
        }

        self.categories.reorder_fields(ordered_ids).await?;
        self.cache.invalidate(project_id).await;
        Ok(())
    }

    // ==================== Lookup values ====================

    /// Add a lookup value to a lookup field.
    pub async fn create_lookup_value(
        &self,
        principal: &user::Model,
        project_id: &str,
        category_id: &str,
        field_id: &str,
        input: CreateLookupValueInput,
    ) -> AppResult<lookup_value::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        input.validate()?;

        self.get_existing(project_id, category_id).await?;
        let field = self
            .categories
            .find_field(category_id, field_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("field {field_id}")))?;
        if !matches!(field.kind, FieldKind::Lookup | FieldKind::MultiLookup) {
            return Err(AppError::BadRequest(
                "Only lookup fields carry lookup values".to_string(),
            ));
        }

        let order = self.categories.lookup_values(field_id).await?.len();
        let created = self
            .categories
            .create_lookup_value(lookup_value::ActiveModel {
                id: Set(self.ids.generate()),
                field_id: Set(field_id.to_string()),
                name: Set(input.name),
                symbol: Set(input.symbol),
                status: Set(LookupStatus::Active),
                order: Set(i32::try_from(order).unwrap_or(i32::MAX)),
            })
            .await?;

        self.cache.invalidate(project_id).await;
        Ok(created)
    }

    /// Deactivate a lookup value. Old contributions keep referencing it, so
    /// values are never removed.
    pub async fn deactivate_lookup_value(
        &self,
        principal: &user::Model,
        project_id: &str,
        category_id: &str,
        field_id: &str,
        value_id: &str,
    ) -> AppResult<lookup_value::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        self.get_existing(project_id, category_id).await?;
        let value = self
            .categories
            .find_lookup_value(field_id, value_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("lookup value {value_id}")))?;

        let mut model: lookup_value::ActiveModel = value.into();
        model.status = Set(LookupStatus::Inactive);
        let updated = self.categories.update_lookup_value(model).await?;

        self.cache.invalidate(project_id).await;
        Ok(updated)
    }

    // ==================== Internals ====================

    /// A category row that exists and is not deleted.
    async fn get_existing(
        &self,
        project_id: &str,
        category_id: &str,
    ) -> AppResult<category::Model> {
        self.categories
            .find_by_id(project_id, category_id)
            .await?
            .filter(|c| c.status != CategoryStatus::Deleted)
            .ok_or_else(|| AppError::NotFound(format!("category {category_id}")))
    }

    /// Remove a field key from all active rules pinned to its category.
    async fn scrub_field_from_rules(&self, category_id: &str, key: &str) -> AppResult<()> {
        for rule in self.groupings.rules_for_category(category_id).await? {
            let Some(Value::Object(mut constraints)) = rule.constraints.clone() else {
                continue;
            };
            if constraints.remove(key).is_none() {
                continue;
            }
            let mut model: rule::ActiveModel = rule.into();
            model.constraints = Set(if constraints.is_empty() {
                None
            } else {
                Some(Value::Object(constraints))
            });
            self.groupings.update_rule(model).await?;
        }
        Ok(())
    }
}

/// Build the subtype config column from the flattened input.
fn build_field_config(input: &CreateFieldInput) -> AppResult<Value> {
    match input.kind {
        FieldKind::Text => Ok(json!({
            "maxlength": input.maxlength,
            "textarea": input.textarea,
        })),
        FieldKind::Numeric => {
            if let (Some(min), Some(max)) = (input.minval, input.maxval) {
                if min > max {
                    return Err(AppError::BadRequest(
                        "Minimum value must not exceed maximum value".to_string(),
                    ));
                }
            }
            Ok(json!({
                "minval": input.minval,
                "maxval": input.maxval,
            }))
        }
        _ => Ok(json!({})),
    }
}

/// Whether `requested` reorders `existing` without adding or dropping ids.
fn is_permutation(existing: &[String], requested: &[String]) -> bool {
    existing.len() == requested.len()
        && existing.iter().collect::<BTreeSet<_>>() == requested.iter().collect::<BTreeSet<_>>()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use geonote_db::repositories::ProjectRepository;
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    fn input(kind: FieldKind) -> CreateFieldInput {
        CreateFieldInput {
            name: "Height".to_string(),
            description: None,
            required: false,
            kind,
            maxlength: Some(50),
            textarea: false,
            minval: Some(10.0),
            maxval: Some(2.0),
        }
    }

    #[test]
    fn numeric_config_rejects_inverted_bounds() {
        assert!(build_field_config(&input(FieldKind::Numeric)).is_err());
        assert!(build_field_config(&input(FieldKind::Text)).is_ok());
    }

    #[test]
    fn text_config_keeps_maxlength() {
        let config = build_field_config(&input(FieldKind::Text)).unwrap();
        assert_eq!(config["maxlength"], 50);
        assert_eq!(config["textarea"], false);
    }

    #[test]
    fn permutation_check() {
        let existing = vec!["a".to_string(), "b".to_string()];
        assert!(is_permutation(&existing, &["b".to_string(), "a".to_string()]));
        assert!(!is_permutation(&existing, &["a".to_string()]));
        assert!(!is_permutation(&existing, &["a".to_string(), "c".to_string()]));
        assert!(!is_permutation(&existing, &["a".to_string(), "a".to_string()]));
    }

    #[tokio::test]
    async fn schemas_are_cached_per_project() {
        let category = category::Model {
            id: "c1".to_string(),
            project_id: "p1".to_string(),
            name: "Trees".to_string(),
            description: None,
            status: CategoryStatus::Active,
            default_status: DefaultStatus::Active,
            order: 0,
            display_field_id: None,
            creator_id: "u1".to_string(),
            created_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[category]])
            .append_query_results([Vec::<field::Model>::new()]);
        let conn = Arc::new(db.into_connection());

        let service = CategoryService::new(
            CategoryRepository::new(Arc::clone(&conn)),
            ContributionRepository::new(Arc::clone(&conn)),
            GroupingRepository::new(Arc::clone(&conn)),
            ContextLoader::new(ProjectRepository::new(Arc::clone(&conn))),
            CategoryCache::new(),
            IdGenerator::new(),
        );

        let first = service.schemas("p1").await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "Trees");

        // Second call must not touch the mock again; no results are queued.
        let second = service.schemas("p1").await.unwrap();
        assert_eq!(second.len(), 1);
    }
}
