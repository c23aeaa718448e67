//! Principal and role resolution.
//!
//! Pure given its inputs: the resolver never touches the database. Callers
//! load the membership facts once per request and pass them in.

use geonote_db::entities::{project, user, user_group};
use serde::Serialize;

/// Role of a principal on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    Watcher,
    Viewer,
    Contributor,
    Moderator,
    Admin,
    Superuser,
}

/// Capability booleans of a principal on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub can_access: bool,
    pub can_contribute: bool,
    pub can_moderate: bool,
    pub is_admin: bool,
}

/// Membership facts needed to resolve a role on one project.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub project: project::Model,
    /// Principal is listed in the project's administrators.
    pub is_admin: bool,
    /// Groups of this project the principal is a member of.
    pub member_groups: Vec<user_group::Model>,
    /// Project has at least one non-private active grouping.
    pub has_public_grouping: bool,
}

/// Resolve role and capabilities for a principal on a project.
#[must_use]
pub fn resolve(principal: &user::Model, ctx: &ProjectContext) -> (Role, Capabilities) {
    let project = &ctx.project;
    let active = project.status == project::ProjectStatus::Active;

    if principal.is_superuser {
        return (
            Role::Superuser,
            Capabilities {
                can_access: active,
                can_contribute: true,
                can_moderate: true,
                is_admin: true,
            },
        );
    }

    let is_admin = ctx.is_admin;
    let in_any_group = !ctx.member_groups.is_empty();

    let can_moderate = is_admin || ctx.member_groups.iter().any(|g| g.can_moderate);

    let can_contribute = can_moderate
        || ctx.member_groups.iter().any(|g| g.can_contribute)
        || project.everyone_contributes == project::EveryoneContributes::True
        || (project.everyone_contributes == project::EveryoneContributes::Auth
            && !principal.is_anonymous);

    let can_access = active
        && (is_admin
            || (!project.is_private && ctx.has_public_grouping)
            || in_any_group
            || can_contribute);

    let role = if is_admin {
        Role::Admin
    } else if can_moderate {
        Role::Moderator
    } else if can_contribute {
        Role::Contributor
    } else if in_any_group {
        Role::Viewer
    } else if principal.is_anonymous {
        Role::Anonymous
    } else {
        Role::Watcher
    };

    (
        role,
        Capabilities {
            can_access,
            can_contribute,
            can_moderate,
            is_admin,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(anonymous: bool, superuser: bool) -> user::Model {
        user::Model {
            id: "u1".to_string(),
            display_name: "Alice".to_string(),
            display_name_lower: "alice".to_string(),
            email: "alice@example.com".to_string(),
            email_lower: "alice@example.com".to_string(),
            password_hash: None,
            token: None,
            is_anonymous: anonymous,
            is_superuser: superuser,
            created_at: Utc::now().into(),
        }
    }

    fn project(
        is_private: bool,
        everyone: project::EveryoneContributes,
        status: project::ProjectStatus,
    ) -> project::Model {
        project::Model {
            id: "p1".to_string(),
            name: "Test".to_string(),
            description: None,
            is_private,
            status,
            everyone_contributes: everyone,
            creator_id: "u0".to_string(),
            geographic_extent: None,
            created_at: Utc::now().into(),
        }
    }

    fn group(can_contribute: bool, can_moderate: bool) -> user_group::Model {
        user_group::Model {
            id: "g1".to_string(),
            project_id: "p1".to_string(),
            name: "Group".to_string(),
            description: None,
            can_contribute,
            can_moderate,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn admin_gets_all_capabilities() {
        let ctx = ProjectContext {
            project: project(true, project::EveryoneContributes::False, project::ProjectStatus::Active),
            is_admin: true,
            member_groups: vec![],
            has_public_grouping: false,
        };
        let (role, caps) = resolve(&user(false, false), &ctx);
        assert_eq!(role, Role::Admin);
        assert!(caps.can_access && caps.can_contribute && caps.can_moderate && caps.is_admin);
    }

    #[test]
    fn moderating_group_implies_contribute() {
        let ctx = ProjectContext {
            project: project(true, project::EveryoneContributes::False, project::ProjectStatus::Active),
            is_admin: false,
            member_groups: vec![group(false, true)],
            has_public_grouping: false,
        };
        let (role, caps) = resolve(&user(false, false), &ctx);
        assert_eq!(role, Role::Moderator);
        assert!(caps.can_moderate && caps.can_contribute && caps.can_access);
        assert!(!caps.is_admin);
    }

    #[test]
    fn anonymous_on_open_project_can_contribute() {
        let ctx = ProjectContext {
            project: project(false, project::EveryoneContributes::True, project::ProjectStatus::Active),
            is_admin: false,
            member_groups: vec![],
            has_public_grouping: true,
        };
        let (role, caps) = resolve(&user(true, false), &ctx);
        assert_eq!(role, Role::Contributor);
        assert!(caps.can_contribute && caps.can_access);
    }

    #[test]
    fn anonymous_on_auth_project_cannot_contribute() {
        let ctx = ProjectContext {
            project: project(false, project::EveryoneContributes::Auth, project::ProjectStatus::Active),
            is_admin: false,
            member_groups: vec![],
            has_public_grouping: true,
        };
        let (role, caps) = resolve(&user(true, false), &ctx);
        assert_eq!(role, Role::Anonymous);
        assert!(!caps.can_contribute);
        assert!(caps.can_access);
    }

    #[test]
    fn signed_in_watcher_on_public_project() {
        let ctx = ProjectContext {
            project: project(false, project::EveryoneContributes::False, project::ProjectStatus::Active),
            is_admin: false,
            member_groups: vec![],
            has_public_grouping: true,
        };
        let (role, caps) = resolve(&user(false, false), &ctx);
        assert_eq!(role, Role::Watcher);
        assert!(caps.can_access);
        assert!(!caps.can_contribute);
    }

    #[test]
    fn private_project_without_membership_denies_access() {
        let ctx = ProjectContext {
            project: project(true, project::EveryoneContributes::False, project::ProjectStatus::Active),
            is_admin: false,
            member_groups: vec![],
            has_public_grouping: true,
        };
        let (_, caps) = resolve(&user(false, false), &ctx);
        assert!(!caps.can_access);
    }

    #[test]
    fn viewer_group_grants_access_only() {
        let ctx = ProjectContext {
            project: project(true, project::EveryoneContributes::False, project::ProjectStatus::Active),
            is_admin: false,
            member_groups: vec![group(false, false)],
            has_public_grouping: false,
        };
        let (role, caps) = resolve(&user(false, false), &ctx);
        assert_eq!(role, Role::Viewer);
        assert!(caps.can_access);
        assert!(!caps.can_contribute && !caps.can_moderate);
    }

    #[test]
    fn superuser_ignores_membership_but_not_status() {
        let inactive = ProjectContext {
            project: project(true, project::EveryoneContributes::False, project::ProjectStatus::Inactive),
            is_admin: false,
            member_groups: vec![],
            has_public_grouping: false,
        };
        let (role, caps) = resolve(&user(false, true), &inactive);
        assert_eq!(role, Role::Superuser);
        assert!(caps.is_admin && caps.can_moderate && caps.can_contribute);
        assert!(!caps.can_access);
    }

    #[test]
    fn inactive_project_denies_access_to_members() {
        let ctx = ProjectContext {
            project: project(false, project::EveryoneContributes::Auth, project::ProjectStatus::Inactive),
            is_admin: false,
            member_groups: vec![group(true, false)],
            has_public_grouping: true,
        };
        let (_, caps) = resolve(&user(false, false), &ctx);
        assert!(!caps.can_access);
        assert!(caps.can_contribute);
    }
}
