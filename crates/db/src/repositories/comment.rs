//! Comment repository.

use std::sync::Arc;

use geonote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

use crate::entities::{Comment, comment, contribution};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID within a contribution.
    pub async fn find_by_id(
        &self,
        contribution_id: &str,
        comment_id: &str,
    ) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(comment_id)
            .filter(comment::Column::ContributionId.eq(contribution_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active comments of a contribution, oldest first so threads read in
    /// order.
    pub async fn list(&self, contribution_id: &str) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::ContributionId.eq(contribution_id))
            .filter(comment::Column::Status.eq(comment::CommentStatus::Active))
            .order_by_asc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count active comments with an open review flag on a contribution.
    pub async fn count_open_reviews(&self, contribution_id: &str) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::ContributionId.eq(contribution_id))
            .filter(comment::Column::Status.eq(comment::CommentStatus::Active))
            .filter(comment::Column::ReviewStatus.eq(comment::ReviewStatus::Open))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a comment and apply the given change to the parent
    /// contribution (counter, review-state coupling) in one transaction.
    pub async fn create_with_contribution(
        &self,
        comment: comment::ActiveModel,
        parent: contribution::ActiveModel,
    ) -> AppResult<comment::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let inserted = comment
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        parent
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted)
    }

    /// Update a comment and apply the given change to the parent
    /// contribution in one transaction.
    pub async fn update_with_contribution(
        &self,
        comment: comment::ActiveModel,
        parent: Option<contribution::ActiveModel>,
    ) -> AppResult<comment::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = comment
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if let Some(parent) = parent {
            parent
                .update(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated)
    }

    /// Update a comment.
    pub async fn update(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-delete a comment and its direct responses, updating the parent
    /// contribution in the same transaction. Returns how many comments were
    /// removed.
    pub async fn soft_delete_thread(
        &self,
        comment_id: &str,
        parent: contribution::ActiveModel,
    ) -> AppResult<u64> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let result = Comment::update_many()
            .col_expr(
                comment::Column::Status,
                sea_orm::sea_query::Expr::value("deleted"),
            )
            .filter(comment::Column::Status.eq(comment::CommentStatus::Active))
            .filter(
                sea_orm::Condition::any()
                    .add(comment::Column::Id.eq(comment_id))
                    .add(comment::Column::RespondsTo.eq(comment_id)),
            )
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        parent
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Active direct responses to a comment.
    pub async fn responses(&self, comment_id: &str) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::RespondsTo.eq(comment_id))
            .filter(comment::Column::Status.eq(comment::CommentStatus::Active))
            .order_by_asc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
