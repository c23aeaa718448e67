//! Data grouping repository.

use std::sync::Arc;

use geonote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

use crate::entities::{
    Grouping, GroupingAccess, Rule, grouping, grouping_access, rule,
};

/// Repository for data groupings, their rules and access records.
#[derive(Clone)]
pub struct GroupingRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupingRepository {
    /// Create a new grouping repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a grouping by ID within a project.
    pub async fn find_by_id(
        &self,
        project_id: &str,
        grouping_id: &str,
    ) -> AppResult<Option<grouping::Model>> {
        Grouping::find_by_id(grouping_id)
            .filter(grouping::Column::ProjectId.eq(project_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Non-deleted groupings of a project. Per-principal visibility is
    /// applied by the caller.
    pub async fn list(&self, project_id: &str) -> AppResult<Vec<grouping::Model>> {
        Grouping::find()
            .filter(grouping::Column::ProjectId.eq(project_id))
            .filter(grouping::Column::Status.ne(grouping::GroupingStatus::Deleted))
            .order_by_asc(grouping::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a grouping.
    pub async fn create(&self, model: grouping::ActiveModel) -> AppResult<grouping::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a grouping.
    pub async fn update(&self, model: grouping::ActiveModel) -> AppResult<grouping::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Rules ====================

    /// Find a rule by ID within a grouping.
    pub async fn find_rule(
        &self,
        grouping_id: &str,
        rule_id: &str,
    ) -> AppResult<Option<rule::Model>> {
        Rule::find_by_id(rule_id)
            .filter(rule::Column::GroupingId.eq(grouping_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active rules of a grouping.
    pub async fn rules(&self, grouping_id: &str) -> AppResult<Vec<rule::Model>> {
        Rule::find()
            .filter(rule::Column::GroupingId.eq(grouping_id))
            .filter(rule::Column::Status.eq(rule::RuleStatus::Active))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count active rules of a grouping.
    pub async fn count_rules(&self, grouping_id: &str) -> AppResult<u64> {
        Rule::find()
            .filter(rule::Column::GroupingId.eq(grouping_id))
            .filter(rule::Column::Status.eq(rule::RuleStatus::Active))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active rules pinned to a category, across all groupings. Used by the
    /// schema cascades (category delete, field deactivation).
    pub async fn rules_for_category(&self, category_id: &str) -> AppResult<Vec<rule::Model>> {
        Rule::find()
            .filter(rule::Column::CategoryId.eq(category_id))
            .filter(rule::Column::Status.eq(rule::RuleStatus::Active))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a rule.
    pub async fn create_rule(&self, model: rule::ActiveModel) -> AppResult<rule::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a rule.
    pub async fn update_rule(&self, model: rule::ActiveModel) -> AppResult<rule::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Access records ====================

    /// Access records of a grouping.
    pub async fn access_records(
        &self,
        grouping_id: &str,
    ) -> AppResult<Vec<grouping_access::Model>> {
        GroupingAccess::find()
            .filter(grouping_access::Column::GroupingId.eq(grouping_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Access records for the given user groups on a grouping.
    pub async fn access_for_groups(
        &self,
        grouping_id: &str,
        group_ids: &[String],
    ) -> AppResult<Vec<grouping_access::Model>> {
        if group_ids.is_empty() {
            return Ok(vec![]);
        }
        GroupingAccess::find()
            .filter(grouping_access::Column::GroupingId.eq(grouping_id))
            .filter(grouping_access::Column::GroupId.is_in(group_ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Grant a user group access to a grouping.
    pub async fn grant_access(
        &self,
        model: grouping_access::ActiveModel,
    ) -> AppResult<grouping_access::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Revoke a user group's access to a grouping.
    pub async fn revoke_access(&self, grouping_id: &str, group_id: &str) -> AppResult<()> {
        GroupingAccess::delete_many()
            .filter(grouping_access::Column::GroupingId.eq(grouping_id))
            .filter(grouping_access::Column::GroupId.eq(group_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
