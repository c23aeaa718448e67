//! Project repository.

use std::sync::Arc;

use geonote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

use crate::entities::{
    Grouping, Project, ProjectAdmin, UserGroup, UserGroupMember, grouping, project, project_admin,
    user_group, user_group_member,
};

/// Project repository for database operations.
///
/// Deleted projects are not excluded here; the access policy needs to see
/// them to distinguish not-found from hidden.
#[derive(Clone)]
pub struct ProjectRepository {
    db: Arc<DatabaseConnection>,
}

impl ProjectRepository {
    /// Create a new project repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a project by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<project::Model>> {
        Project::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a project by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<project::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ProjectNotFound(id.to_string()))
    }

    /// All non-deleted projects, ordered by name. Visibility filtering is
    /// applied by the caller per principal.
    pub async fn list_all(&self) -> AppResult<Vec<project::Model>> {
        Project::find()
            .filter(project::Column::Status.ne(project::ProjectStatus::Deleted))
            .order_by_asc(project::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new project.
    pub async fn create(&self, model: project::ActiveModel) -> AppResult<project::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a project.
    pub async fn update(&self, model: project::ActiveModel) -> AppResult<project::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Administrators ====================

    /// Check whether a user is an administrator of the project.
    pub async fn is_admin(&self, project_id: &str, user_id: &str) -> AppResult<bool> {
        let count = ProjectAdmin::find()
            .filter(project_admin::Column::ProjectId.eq(project_id))
            .filter(project_admin::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// List administrator records of a project.
    pub async fn admins(&self, project_id: &str) -> AppResult<Vec<project_admin::Model>> {
        ProjectAdmin::find()
            .filter(project_admin::Column::ProjectId.eq(project_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add an administrator.
    pub async fn add_admin(&self, model: project_admin::ActiveModel) -> AppResult<project_admin::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove an administrator.
    pub async fn remove_admin(&self, project_id: &str, user_id: &str) -> AppResult<()> {
        ProjectAdmin::delete_many()
            .filter(project_admin::Column::ProjectId.eq(project_id))
            .filter(project_admin::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count administrators of a project.
    pub async fn count_admins(&self, project_id: &str) -> AppResult<u64> {
        ProjectAdmin::find()
            .filter(project_admin::Column::ProjectId.eq(project_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== User groups ====================

    /// Find a user group by ID within a project.
    pub async fn find_group(
        &self,
        project_id: &str,
        group_id: &str,
    ) -> AppResult<Option<user_group::Model>> {
        UserGroup::find_by_id(group_id)
            .filter(user_group::Column::ProjectId.eq(project_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all user groups of a project.
    pub async fn groups(&self, project_id: &str) -> AppResult<Vec<user_group::Model>> {
        UserGroup::find()
            .filter(user_group::Column::ProjectId.eq(project_id))
            .order_by_asc(user_group::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List the groups of a project the user is a member of.
    pub async fn groups_for_user(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<user_group::Model>> {
        let group_ids: Vec<String> = UserGroupMember::find()
            .filter(user_group_member::Column::UserId.eq(user_id))
            .select_only()
            .column(user_group_member::Column::GroupId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if group_ids.is_empty() {
            return Ok(vec![]);
        }

        UserGroup::find()
            .filter(user_group::Column::ProjectId.eq(project_id))
            .filter(user_group::Column::Id.is_in(group_ids))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a user group.
    pub async fn create_group(&self, model: user_group::ActiveModel) -> AppResult<user_group::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a user group.
    pub async fn update_group(&self, model: user_group::ActiveModel) -> AppResult<user_group::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add a member to a group.
    pub async fn add_member(
        &self,
        model: user_group_member::ActiveModel,
    ) -> AppResult<user_group_member::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove a member from a group.
    pub async fn remove_member(&self, group_id: &str, user_id: &str) -> AppResult<()> {
        UserGroupMember::delete_many()
            .filter(user_group_member::Column::GroupId.eq(group_id))
            .filter(user_group_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ==================== Visibility probes ====================

    /// Check whether the project has at least one non-private active
    /// grouping (this is what makes a public project enumerable).
    pub async fn has_public_grouping(&self, project_id: &str) -> AppResult<bool> {
        let count = Grouping::find()
            .filter(grouping::Column::ProjectId.eq(project_id))
            .filter(grouping::Column::IsPrivate.eq(false))
            .filter(grouping::Column::Status.eq(grouping::GroupingStatus::Active))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }
}
