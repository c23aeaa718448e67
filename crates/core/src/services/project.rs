//! Project, administrator and user group management.

use chrono::Utc;
use geonote_common::{AppError, AppResult, IdGenerator};
use geonote_db::entities::project::{EveryoneContributes, ProjectStatus};
use geonote_db::entities::{project, project_admin, user, user_group, user_group_member};
use geonote_db::repositories::{ProjectRepository, UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::policy;
use crate::roles::{Capabilities, ProjectContext, Role};
use crate::services::context::ContextLoader;

/// Input for creating a project.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProjectInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    pub everyone_contributes: EveryoneContributes,
    pub geographic_extent: Option<serde_json::Value>,
}

/// Input for updating a project. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProjectInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_private: Option<bool>,
    pub everyone_contributes: Option<EveryoneContributes>,
    pub status: Option<ProjectStatus>,
    pub geographic_extent: Option<Option<serde_json::Value>>,
}

/// Input for creating a user group.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub can_contribute: bool,
    #[serde(default)]
    pub can_moderate: bool,
}

/// Input for updating a user group.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateGroupInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub can_contribute: Option<bool>,
    pub can_moderate: Option<bool>,
}

/// Service for projects, their administrators and user groups.
#[derive(Clone)]
pub struct ProjectService {
    projects: ProjectRepository,
    users: UserRepository,
    context: ContextLoader,
    ids: IdGenerator,
}

impl ProjectService {
    /// Create a new project service.
    #[must_use]
    pub const fn new(
        projects: ProjectRepository,
        users: UserRepository,
        context: ContextLoader,
        ids: IdGenerator,
    ) -> Self {
        Self {
            projects,
            users,
            context,
            ids,
        }
    }

    /// Projects the principal can see, with their resolved role.
    ///
    /// Inactive projects surface for their administrators only.
    pub async fn list(&self, principal: &user::Model) -> AppResult<Vec<(project::Model, Role)>> {
        let mut visible = vec![];
        for candidate in self.projects.list_all().await? {
            let (ctx, caps, role) = self.context.load(principal, &candidate.id).await?;
            if policy::project_read(&ctx, &caps).is_ok() {
                visible.push((candidate, role));
            }
        }
        Ok(visible)
    }

    /// A single project with the principal's role and capabilities.
    pub async fn get(
        &self,
        principal: &user::Model,
        project_id: &str,
    ) -> AppResult<(project::Model, Role, Capabilities)> {
        let (ctx, caps, role) = self.context.load(principal, project_id).await?;
        policy::project_read(&ctx, &caps)?;
        Ok((ctx.project, role, caps))
    }

    /// Create a project. The creator becomes its first administrator.
    pub async fn create(
        &self,
        principal: &user::Model,
        input: CreateProjectInput,
    ) -> AppResult<project::Model> {
        if principal.is_anonymous {
            return Err(AppError::Unauthorized);
        }
        input.validate()?;

        let everyone_contributes =
            coerce_everyone_contributes(input.is_private, input.everyone_contributes);

        let model = project::ActiveModel {
            id: Set(self.ids.generate()),
            name: Set(input.name),
            description: Set(input.description),
            is_private: Set(input.is_private),
            status: Set(ProjectStatus::Active),
            everyone_contributes: Set(everyone_contributes),
            creator_id: Set(principal.id.clone()),
            geographic_extent: Set(input.geographic_extent),
            created_at: Set(Utc::now().into()),
        };
        let created = self.projects.create(model).await?;

        self.projects
            .add_admin(project_admin::ActiveModel {
                project_id: Set(created.id.clone()),
                user_id: Set(principal.id.clone()),
                contact: Set(false),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        Ok(created)
    }

    /// Update a project's settings.
    pub async fn update(
        &self,
        principal: &user::Model,
        project_id: &str,
        input: UpdateProjectInput,
    ) -> AppResult<project::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        input.validate()?;

        if input.status == Some(ProjectStatus::Deleted) {
            return Err(AppError::BadRequest(
                "Use the delete operation to remove a project".to_string(),
            ));
        }

        let is_private = input.is_private.unwrap_or(ctx.project.is_private);
        let everyone_contributes = coerce_everyone_contributes(
            is_private,
            input
                .everyone_contributes
                .unwrap_or(ctx.project.everyone_contributes),
        );

        let mut model: project::ActiveModel = ctx.project.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(status) = input.status {
            model.status = Set(status);
        }
        if let Some(extent) = input.geographic_extent {
            model.geographic_extent = Set(extent);
        }
        model.is_private = Set(is_private);
        model.everyone_contributes = Set(everyone_contributes);

        self.projects.update(model).await
    }

    /// Soft-delete a project. Everything underneath disappears with it
    /// because every access path starts from the project gate.
    pub async fn delete(&self, principal: &user::Model, project_id: &str) -> AppResult<()> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        let mut model: project::ActiveModel = ctx.project.into();
        model.status = Set(ProjectStatus::Deleted);
        self.projects.update(model).await?;
        Ok(())
    }

    // ==================== Administrators ====================

    /// Administrator records of a project.
    pub async fn admins(
        &self,
        principal: &user::Model,
        project_id: &str,
    ) -> AppResult<Vec<project_admin::Model>> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        self.projects.admins(project_id).await
    }

    /// Grant a user administrator rights on a project.
    pub async fn add_admin(
        &self,
        principal: &user::Model,
        project_id: &str,
        user_id: &str,
    ) -> AppResult<project_admin::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        let target = self.users.get_by_id(user_id).await?;
        if target.is_anonymous {
            return Err(AppError::BadRequest(
                "The anonymous user cannot administer a project".to_string(),
            ));
        }
        if self.projects.is_admin(project_id, user_id).await? {
            return Err(AppError::Conflict(
                "User is already an administrator".to_string(),
            ));
        }

        self.projects
            .add_admin(project_admin::ActiveModel {
                project_id: Set(project_id.to_string()),
                user_id: Set(target.id),
                contact: Set(false),
                created_at: Set(Utc::now().into()),
            })
            .await
    }

    /// Revoke a user's administrator rights. The last administrator cannot
    /// be removed.
    pub async fn remove_admin(
        &self,
        principal: &user::Model,
        project_id: &str,
        user_id: &str,
    ) -> AppResult<()> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        if !self.projects.is_admin(project_id, user_id).await? {
            return Err(AppError::NotFound(format!("administrator {user_id}")));
        }
        if self.projects.count_admins(project_id).await? <= 1 {
            return Err(AppError::BadRequest(
                "A project must keep at least one administrator".to_string(),
            ));
        }

        self.projects.remove_admin(project_id, user_id).await
    }

    // ==================== User groups ====================

    /// User groups of a project.
    pub async fn groups(
        &self,
        principal: &user::Model,
        project_id: &str,
    ) -> AppResult<Vec<user_group::Model>> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        self.projects.groups(project_id).await
    }

    /// Create a user group.
    pub async fn create_group(
        &self,
        principal: &user::Model,
        project_id: &str,
        input: CreateGroupInput,
    ) -> AppResult<user_group::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        input.validate()?;

        let (can_contribute, can_moderate) =
            coerce_group_capabilities(input.can_contribute, input.can_moderate);

        self.projects
            .create_group(user_group::ActiveModel {
                id: Set(self.ids.generate()),
                project_id: Set(project_id.to_string()),
                name: Set(input.name),
                description: Set(input.description),
                can_contribute: Set(can_contribute),
                can_moderate: Set(can_moderate),
                created_at: Set(Utc::now().into()),
            })
            .await
    }

    /// Update a user group.
    pub async fn update_group(
        &self,
        principal: &user::Model,
        project_id: &str,
        group_id: &str,
        input: UpdateGroupInput,
    ) -> AppResult<user_group::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        input.validate()?;

        let group = self
            .projects
            .find_group(project_id, group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user group {group_id}")))?;

        let (can_contribute, can_moderate) = coerce_group_capabilities(
            input.can_contribute.unwrap_or(group.can_contribute),
            input.can_moderate.unwrap_or(group.can_moderate),
        );

        let mut model: user_group::ActiveModel = group.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        model.can_contribute = Set(can_contribute);
        model.can_moderate = Set(can_moderate);

        self.projects.update_group(model).await
    }

    /// Add a user to a group.
    pub async fn add_member(
        &self,
        principal: &user::Model,
        project_id: &str,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<user_group_member::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        self.projects
            .find_group(project_id, group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user group {group_id}")))?;
        let target = self.users.get_by_id(user_id).await?;
        if target.is_anonymous {
            return Err(AppError::BadRequest(
                "The anonymous user cannot join a group".to_string(),
            ));
        }

        self.projects
            .add_member(user_group_member::ActiveModel {
                group_id: Set(group_id.to_string()),
                user_id: Set(target.id),
                created_at: Set(Utc::now().into()),
            })
            .await
    }

    /// Remove a user from a group.
    pub async fn remove_member(
        &self,
        principal: &user::Model,
        project_id: &str,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<()> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        self.projects
            .find_group(project_id, group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user group {group_id}")))?;

        self.projects.remove_member(group_id, user_id).await
    }

    /// Membership facts and capabilities, for handlers that need them raw.
    pub async fn role_context(
        &self,
        principal: &user::Model,
        project_id: &str,
    ) -> AppResult<(ProjectContext, Capabilities, Role)> {
        self.context.load(principal, project_id).await
    }
}

/// A private project cannot accept contributions from the anonymous
/// sentinel; `true` silently tightens to `auth`.
const fn coerce_everyone_contributes(
    is_private: bool,
    requested: EveryoneContributes,
) -> EveryoneContributes {
    match (is_private, requested) {
        (true, EveryoneContributes::True) => EveryoneContributes::Auth,
        (_, other) => other,
    }
}

/// Moderation implies contribution.
const fn coerce_group_capabilities(can_contribute: bool, can_moderate: bool) -> (bool, bool) {
    (can_contribute || can_moderate, can_moderate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn private_project_tightens_open_contribution() {
        assert_eq!(
            coerce_everyone_contributes(true, EveryoneContributes::True),
            EveryoneContributes::Auth
        );
        assert_eq!(
            coerce_everyone_contributes(false, EveryoneContributes::True),
            EveryoneContributes::True
        );
        assert_eq!(
            coerce_everyone_contributes(true, EveryoneContributes::False),
            EveryoneContributes::False
        );
    }

    #[test]
    fn moderating_group_always_contributes() {
        assert_eq!(coerce_group_capabilities(false, true), (true, true));
        assert_eq!(coerce_group_capabilities(false, false), (false, false));
        assert_eq!(coerce_group_capabilities(true, false), (true, false));
    }
}
