//! Per-request role context loading.

use geonote_common::AppResult;
use geonote_db::entities::user;
use geonote_db::repositories::ProjectRepository;

use crate::roles::{self, Capabilities, ProjectContext, Role};

/// Loads the membership facts for a (principal, project) pair and resolves
/// the role. Every service goes through this before consulting the policy.
#[derive(Clone)]
pub struct ContextLoader {
    project_repo: ProjectRepository,
}

impl ContextLoader {
    /// Create a new context loader.
    #[must_use]
    pub const fn new(project_repo: ProjectRepository) -> Self {
        Self { project_repo }
    }

    /// Load the context for a project the principal is acting on.
    ///
    /// Fails with `ProjectNotFound` when the project row does not exist;
    /// deleted projects are returned so the policy can hide them itself.
    pub async fn load(
        &self,
        principal: &user::Model,
        project_id: &str,
    ) -> AppResult<(ProjectContext, Capabilities, Role)> {
        let project = self.project_repo.get_by_id(project_id).await?;

        let (is_admin, member_groups) = if principal.is_anonymous {
            (false, vec![])
        } else {
            (
                self.project_repo.is_admin(project_id, &principal.id).await?,
                self.project_repo
                    .groups_for_user(project_id, &principal.id)
                    .await?,
            )
        };
        let has_public_grouping = self.project_repo.has_public_grouping(project_id).await?;

        let ctx = ProjectContext {
            project,
            is_admin,
            member_groups,
            has_public_grouping,
        };
        let (role, caps) = roles::resolve(principal, &ctx);
        Ok((ctx, caps, role))
    }
}
