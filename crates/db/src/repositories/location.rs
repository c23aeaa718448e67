//! Location repository.

use std::sync::Arc;

use geonote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

use crate::entities::{Location, location};

/// Location repository for database operations.
#[derive(Clone)]
pub struct LocationRepository {
    db: Arc<DatabaseConnection>,
}

impl LocationRepository {
    /// Create a new location repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a location by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<location::Model>> {
        Location::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a location by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<location::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("location {id}")))
    }

    /// Locations usable from the given project: public ones plus those
    /// scoped to that project.
    pub async fn list_for_project(&self, project_id: &str) -> AppResult<Vec<location::Model>> {
        Location::find()
            .filter(
                Condition::any()
                    .add(location::Column::IsPrivate.eq(false))
                    .add(location::Column::PrivateForProject.eq(project_id)),
            )
            .order_by_desc(location::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a location.
    pub async fn create(&self, model: location::ActiveModel) -> AppResult<location::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a location.
    pub async fn update(&self, model: location::ActiveModel) -> AppResult<location::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
