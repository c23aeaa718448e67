//! Contribution repository.
//!
//! All mutations of a contribution run inside a single transaction so the
//! snapshot, the row update and the version bump land together.

use std::sync::Arc;

use chrono::Utc;
use geonote_common::{AppError, AppResult, IdGenerator};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::Value as Json;

use crate::entities::{
    Contribution, ContributionSnapshot, Location, contribution, contribution_snapshot, location,
};

/// Changes to apply to a contribution. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ContributionUpdate {
    pub properties: Option<Json>,
    pub status: Option<contribution::ContributionStatus>,
    pub display_field: Option<Option<String>>,
    pub updator_id: Option<String>,
}

/// Contribution repository for database operations.
#[derive(Clone)]
pub struct ContributionRepository {
    db: Arc<DatabaseConnection>,
}

impl ContributionRepository {
    /// Create a new contribution repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a contribution by ID within a project.
    pub async fn find_by_id(
        &self,
        project_id: &str,
        contribution_id: &str,
    ) -> AppResult<Option<contribution::Model>> {
        Contribution::find_by_id(contribution_id)
            .filter(contribution::Column::ProjectId.eq(project_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a contribution together with its location.
    pub async fn find_with_location(
        &self,
        project_id: &str,
        contribution_id: &str,
    ) -> AppResult<Option<(contribution::Model, location::Model)>> {
        let found = Contribution::find_by_id(contribution_id)
            .filter(contribution::Column::ProjectId.eq(project_id))
            .find_also_related(Location)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match found {
            Some((contribution, Some(location))) => Ok(Some((contribution, location))),
            Some((contribution, None)) => Err(AppError::Internal(format!(
                "contribution {} references missing location",
                contribution.id
            ))),
            None => Ok(None),
        }
    }

    /// List contributions of a project matching the given visibility
    /// condition, newest first, with their locations.
    ///
    /// The condition carries the lane semantics (moderator, creator or
    /// grouping filter); this method only pins the project and the join.
    pub async fn list(
        &self,
        project_id: &str,
        visibility: Condition,
    ) -> AppResult<Vec<(contribution::Model, location::Model)>> {
        let rows = Contribution::find()
            .filter(contribution::Column::ProjectId.eq(project_id))
            .filter(visibility)
            .find_also_related(Location)
            .order_by_desc(contribution::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|(contribution, loc)| {
                loc.map(|l| (contribution, l)).ok_or_else(|| {
                    AppError::Internal("contribution references missing location".to_string())
                })
            })
            .collect()
    }

    /// Count contributions of a project matching the visibility condition.
    pub async fn count(&self, project_id: &str, visibility: Condition) -> AppResult<u64> {
        Contribution::find()
            .filter(contribution::Column::ProjectId.eq(project_id))
            .filter(visibility)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a contribution, creating its location in the same transaction
    /// when the payload carried an inline geometry.
    pub async fn create(
        &self,
        contribution: contribution::ActiveModel,
        new_location: Option<location::ActiveModel>,
    ) -> AppResult<contribution::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(location) = new_location {
            location
                .insert(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        let inserted = contribution
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted)
    }

    /// Apply an update to a contribution.
    ///
    /// The pre-update state is appended to the snapshot history first, then
    /// the row is rewritten. The version advances only when the row was not
    /// a draft; drafts keep version 1 until first publication.
    pub async fn apply_update(
        &self,
        current: contribution::Model,
        update: ContributionUpdate,
        ids: &IdGenerator,
    ) -> AppResult<contribution::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let snapshot = contribution_snapshot::ActiveModel {
            id: Set(ids.generate()),
            contribution_id: Set(current.id.clone()),
            status: Set(current.status),
            properties: Set(current.properties.clone()),
            version: Set(current.version),
            updator_id: Set(current.updator_id.clone()),
            created_at: Set(Utc::now().into()),
        };
        snapshot
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let bump_version = current.status != contribution::ContributionStatus::Draft;

        let mut model: contribution::ActiveModel = current.into();
        if let Some(properties) = update.properties {
            model.properties = Set(properties);
        }
        if let Some(status) = update.status {
            model.status = Set(status);
        }
        if let Some(display_field) = update.display_field {
            model.display_field = Set(display_field);
        }
        if let Some(updator_id) = update.updator_id {
            model.updator_id = Set(Some(updator_id));
        }
        if bump_version {
            let version = match &model.version {
                Set(v) => *v,
                _ => 1,
            };
            model.version = Set(version + 1);
        }
        model.updated_at = Set(Some(Utc::now().into()));

        let updated = model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated)
    }

    /// Soft-delete all non-deleted contributions of a category. Used by the
    /// category delete cascade; snapshots are not written for bulk removal.
    pub async fn soft_delete_by_category(
        &self,
        project_id: &str,
        category_id: &str,
    ) -> AppResult<u64> {
        let result = Contribution::update_many()
            .col_expr(contribution::Column::Status, Expr::value("deleted"))
            .filter(contribution::Column::ProjectId.eq(project_id))
            .filter(contribution::Column::CategoryId.eq(category_id))
            .filter(contribution::Column::Status.ne(contribution::ContributionStatus::Deleted))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Snapshot history of a contribution, newest first.
    pub async fn snapshots(
        &self,
        contribution_id: &str,
    ) -> AppResult<Vec<contribution_snapshot::Model>> {
        ContributionSnapshot::find()
            .filter(contribution_snapshot::Column::ContributionId.eq(contribution_id))
            .order_by_desc(contribution_snapshot::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
