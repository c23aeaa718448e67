//! Category, field and lookup value repository.

use std::sync::Arc;

use geonote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{
    Category, Field, LookupValue, category, field, lookup_value,
};

/// Repository for categories and their fields and lookup values.
#[derive(Clone)]
pub struct CategoryRepository {
    db: Arc<DatabaseConnection>,
}

impl CategoryRepository {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a category by ID within a project.
    pub async fn find_by_id(
        &self,
        project_id: &str,
        category_id: &str,
    ) -> AppResult<Option<category::Model>> {
        Category::find_by_id(category_id)
            .filter(category::Column::ProjectId.eq(project_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List non-deleted categories of a project, in display order.
    pub async fn list(&self, project_id: &str) -> AppResult<Vec<category::Model>> {
        Category::find()
            .filter(category::Column::ProjectId.eq(project_id))
            .filter(category::Column::Status.ne(category::CategoryStatus::Deleted))
            .order_by_asc(category::Column::Order)
            .order_by_asc(category::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a category.
    pub async fn create(&self, model: category::ActiveModel) -> AppResult<category::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a category.
    pub async fn update(&self, model: category::ActiveModel) -> AppResult<category::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Persist a new display order for the given categories.
    pub async fn reorder(&self, ordered_ids: &[String]) -> AppResult<()> {
        for (position, id) in ordered_ids.iter().enumerate() {
            let model = category::ActiveModel {
                id: Set(id.clone()),
                order: Set(i32::try_from(position).unwrap_or(i32::MAX)),
                ..Default::default()
            };
            model
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    // ==================== Fields ====================

    /// Find a field by ID within a category.
    pub async fn find_field(
        &self,
        category_id: &str,
        field_id: &str,
    ) -> AppResult<Option<field::Model>> {
        Field::find_by_id(field_id)
            .filter(field::Column::CategoryId.eq(category_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All fields of a category (active and inactive), in display order.
    pub async fn fields(&self, category_id: &str) -> AppResult<Vec<field::Model>> {
        Field::find()
            .filter(field::Column::CategoryId.eq(category_id))
            .order_by_asc(field::Column::Order)
            .order_by_asc(field::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether a field key is already taken within a category.
    pub async fn key_exists(&self, category_id: &str, key: &str) -> AppResult<bool> {
        let count = Field::find()
            .filter(field::Column::CategoryId.eq(category_id))
            .filter(field::Column::Key.eq(key))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Count the fields of a category.
    pub async fn count_fields(&self, category_id: &str) -> AppResult<u64> {
        Field::find()
            .filter(field::Column::CategoryId.eq(category_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a field.
    pub async fn create_field(&self, model: field::ActiveModel) -> AppResult<field::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a field.
    pub async fn update_field(&self, model: field::ActiveModel) -> AppResult<field::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Persist a new display order for the given fields.
    pub async fn reorder_fields(&self, ordered_ids: &[String]) -> AppResult<()> {
        for (position, id) in ordered_ids.iter().enumerate() {
            let model = field::ActiveModel {
                id: Set(id.clone()),
                order: Set(i32::try_from(position).unwrap_or(i32::MAX)),
                ..Default::default()
            };
            model
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    // ==================== Lookup values ====================

    /// All lookup values of a field, in display order.
    pub async fn lookup_values(&self, field_id: &str) -> AppResult<Vec<lookup_value::Model>> {
        LookupValue::find()
            .filter(lookup_value::Column::FieldId.eq(field_id))
            .order_by_asc(lookup_value::Column::Order)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Lookup values for any of the given fields, in one round trip.
    pub async fn lookup_values_for_fields(
        &self,
        field_ids: &[String],
    ) -> AppResult<Vec<lookup_value::Model>> {
        if field_ids.is_empty() {
            return Ok(vec![]);
        }
        LookupValue::find()
            .filter(lookup_value::Column::FieldId.is_in(field_ids.iter().cloned()))
            .order_by_asc(lookup_value::Column::Order)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a lookup value by ID within a field.
    pub async fn find_lookup_value(
        &self,
        field_id: &str,
        value_id: &str,
    ) -> AppResult<Option<lookup_value::Model>> {
        LookupValue::find_by_id(value_id)
            .filter(lookup_value::Column::FieldId.eq(field_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a lookup value.
    pub async fn create_lookup_value(
        &self,
        model: lookup_value::ActiveModel,
    ) -> AppResult<lookup_value::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a lookup value.
    pub async fn update_lookup_value(
        &self,
        model: lookup_value::ActiveModel,
    ) -> AppResult<lookup_value::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
