//! The access policy: one decision procedure for every surface.
//!
//! All deleted-hiding, inactive masking and lane semantics live here so no
//! handler re-implements the status mapping. Functions return `Ok(())` for
//! allow and an [`AppError`] naming the exit label otherwise.

use geonote_common::{AppError, AppResult};
use geonote_db::entities::contribution::{self, ContributionStatus};
use geonote_db::entities::project::{EveryoneContributes, ProjectStatus};
use geonote_db::entities::user;

use crate::lifecycle;
use crate::roles::{Capabilities, ProjectContext};

/// One of the three contribution access lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// `all-contributions`: the moderation lane.
    All,
    /// `my-contributions`: the creator lane.
    Mine,
    /// `{grouping_id}`: the viewer lane, filtered by the grouping predicate.
    Grouping,
}

/// Whether the principal would have access if the project were active.
/// Used to distinguish forbidden from not-found on inactive projects.
fn would_access(ctx: &ProjectContext, caps: &Capabilities) -> bool {
    caps.is_admin
        || (!ctx.project.is_private && ctx.has_public_grouping)
        || !ctx.member_groups.is_empty()
        || caps.can_contribute
}

/// Gate for reading the project and its metadata surfaces.
pub fn project_read(ctx: &ProjectContext, caps: &Capabilities) -> AppResult<()> {
    match ctx.project.status {
        ProjectStatus::Deleted => Err(AppError::ProjectNotFound(ctx.project.id.clone())),
        ProjectStatus::Inactive => {
            if caps.is_admin {
                Ok(())
            } else if would_access(ctx, caps) {
                Err(AppError::Forbidden("Project is inactive".to_string()))
            } else {
                Err(AppError::ProjectNotFound(ctx.project.id.clone()))
            }
        }
        ProjectStatus::Active => {
            if caps.can_access {
                Ok(())
            } else {
                Err(AppError::Forbidden(
                    "You are not allowed to access this project".to_string(),
                ))
            }
        }
    }
}

/// Gate for administrative mutations of the project and its configuration
/// (settings, categories, groupings, user groups).
pub fn project_admin_write(
    principal: &user::Model,
    ctx: &ProjectContext,
    caps: &Capabilities,
) -> AppResult<()> {
    if ctx.project.status == ProjectStatus::Deleted {
        return Err(AppError::ProjectNotFound(ctx.project.id.clone()));
    }
    if principal.is_anonymous {
        return Err(AppError::Unauthorized);
    }
    if !caps.is_admin {
        // Hide the project entirely from principals who cannot see it
        project_read(ctx, caps)?;
        return Err(AppError::Forbidden(
            "Administrator permission required".to_string(),
        ));
    }
    Ok(())
}

/// Gate for creating a contribution.
pub fn contribution_create(
    principal: &user::Model,
    ctx: &ProjectContext,
    caps: &Capabilities,
) -> AppResult<()> {
    match ctx.project.status {
        ProjectStatus::Deleted => Err(AppError::ProjectNotFound(ctx.project.id.clone())),
        ProjectStatus::Inactive => {
            if caps.is_admin {
                Err(AppError::Forbidden("Project is inactive".to_string()))
            } else {
                Err(AppError::ProjectNotFound(ctx.project.id.clone()))
            }
        }
        ProjectStatus::Active => {
            if caps.can_contribute {
                Ok(())
            } else if principal.is_anonymous
                && ctx.project.everyone_contributes == EveryoneContributes::Auth
            {
                Err(AppError::Unauthorized)
            } else {
                Err(AppError::Forbidden(
                    "You are not allowed to contribute to this project".to_string(),
                ))
            }
        }
    }
}

/// Gate for reading a single contribution through one of the three lanes.
///
/// `grouping_admits` is the compiled grouping predicate result and only
/// consulted on the grouping lane.
pub fn contribution_read(
    lane: Lane,
    principal: &user::Model,
    caps: &Capabilities,
    contribution: &contribution::Model,
    grouping_admits: bool,
) -> AppResult<()> {
    if contribution.status == ContributionStatus::Deleted {
        return Err(AppError::ContributionNotFound(contribution.id.clone()));
    }
    let is_creator = contribution.creator_id == principal.id;

    // Drafts are visible to their creator only, on every lane
    if contribution.status == ContributionStatus::Draft && !is_creator {
        return Err(AppError::ContributionNotFound(contribution.id.clone()));
    }

    match lane {
        Lane::All => {
            if caps.can_moderate {
                Ok(())
            } else {
                Err(AppError::Forbidden(
                    "Moderator permission required".to_string(),
                ))
            }
        }
        Lane::Mine => {
            if principal.is_anonymous {
                return Err(AppError::Unauthorized);
            }
            if is_creator {
                Ok(())
            } else if caps.is_admin {
                Err(AppError::ContributionNotFound(contribution.id.clone()))
            } else {
                Err(AppError::Forbidden(
                    "You are not the creator of this contribution".to_string(),
                ))
            }
        }
        Lane::Grouping => {
            // Non-active contributions never surface through a grouping,
            // except pending/review rows the moderator already sees
            let status_ok = contribution.status == ContributionStatus::Active
                || (caps.can_moderate
                    && matches!(
                        contribution.status,
                        ContributionStatus::Pending | ContributionStatus::Review
                    ));
            if status_ok && grouping_admits {
                Ok(())
            } else {
                Err(AppError::ContributionNotFound(contribution.id.clone()))
            }
        }
    }
}

/// Decision for an update: which status the contribution moves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateDecision {
    pub new_status: ContributionStatus,
}

/// Gate for updating a contribution (content and/or status).
///
/// `requested_status` is what the payload asked for, if anything. Illegal
/// state transitions yield `Forbidden`; system-managed states yield
/// `BadRequest`.
pub fn contribution_update(
    principal: &user::Model,
    ctx: &ProjectContext,
    caps: &Capabilities,
    contribution: &contribution::Model,
    requested_status: Option<ContributionStatus>,
    default_status: geonote_db::entities::category::DefaultStatus,
) -> AppResult<UpdateDecision> {
    if contribution.status == ContributionStatus::Deleted {
        return Err(AppError::ContributionNotFound(contribution.id.clone()));
    }
    if ctx.project.status == ProjectStatus::Inactive {
        if caps.is_admin {
            return Err(AppError::Forbidden("Project is inactive".to_string()));
        }
        return Err(AppError::ProjectNotFound(ctx.project.id.clone()));
    }

    let is_creator = contribution.creator_id == principal.id;

    if contribution.status == ContributionStatus::Draft && !is_creator {
        return Err(AppError::ContributionNotFound(contribution.id.clone()));
    }

    let may_edit = match contribution.status {
        ContributionStatus::Draft => is_creator,
        ContributionStatus::Pending => is_creator || caps.can_moderate,
        ContributionStatus::Active | ContributionStatus::Review => caps.can_moderate,
        ContributionStatus::Deleted => false,
    };
    if !may_edit {
        return Err(AppError::Forbidden(
            "You are not allowed to update this contribution".to_string(),
        ));
    }

    let new_status = match requested_status {
        None => contribution.status,
        Some(ContributionStatus::Review) => {
            return Err(AppError::BadRequest(
                "Review status is managed through review comments".to_string(),
            ));
        }
        Some(ContributionStatus::Deleted) => {
            return Err(AppError::BadRequest(
                "Use the delete operation to remove a contribution".to_string(),
            ));
        }
        Some(ContributionStatus::Draft) => {
            if contribution.status == ContributionStatus::Draft {
                ContributionStatus::Draft
            } else {
                return Err(AppError::Forbidden(
                    "A published contribution cannot return to draft".to_string(),
                ));
            }
        }
        Some(ContributionStatus::Active) => match contribution.status {
            // Owner submit: moderators publish, others get the default
            ContributionStatus::Draft => lifecycle::submit_status(default_status, caps.can_moderate),
            ContributionStatus::Pending => {
                if caps.can_moderate {
                    ContributionStatus::Active
                } else {
                    return Err(AppError::Forbidden(
                        "Moderator permission required to approve".to_string(),
                    ));
                }
            }
            _ => {
                return Err(AppError::Forbidden(
                    "Illegal status transition".to_string(),
                ));
            }
        },
        Some(ContributionStatus::Pending) => match contribution.status {
            ContributionStatus::Draft | ContributionStatus::Pending => ContributionStatus::Pending,
            ContributionStatus::Active => {
                if caps.can_moderate {
                    ContributionStatus::Pending
                } else {
                    return Err(AppError::Forbidden(
                        "Moderator permission required to unpublish".to_string(),
                    ));
                }
            }
            _ => {
                return Err(AppError::Forbidden(
                    "Illegal status transition".to_string(),
                ));
            }
        },
    };

    if !lifecycle::can_transition(contribution.status, new_status) {
        return Err(AppError::Forbidden("Illegal status transition".to_string()));
    }

    Ok(UpdateDecision { new_status })
}

/// Gate for (soft-)deleting a contribution.
pub fn contribution_delete(
    principal: &user::Model,
    ctx: &ProjectContext,
    caps: &Capabilities,
    contribution: &contribution::Model,
) -> AppResult<()> {
    if contribution.status == ContributionStatus::Deleted {
        return Err(AppError::ContributionNotFound(contribution.id.clone()));
    }
    if ctx.project.status == ProjectStatus::Inactive {
        if caps.is_admin {
            return Err(AppError::Forbidden("Project is inactive".to_string()));
        }
        return Err(AppError::ProjectNotFound(ctx.project.id.clone()));
    }

    let is_creator = contribution.creator_id == principal.id;
    if contribution.status == ContributionStatus::Draft && !is_creator {
        return Err(AppError::ContributionNotFound(contribution.id.clone()));
    }
    if is_creator || caps.can_moderate {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not allowed to delete this contribution".to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use geonote_db::entities::category::DefaultStatus;
    use geonote_db::entities::{project, user_group};
    use serde_json::json;

    fn principal(id: &str, anonymous: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            display_name: id.to_string(),
            display_name_lower: id.to_lowercase(),
            email: format!("{id}@example.com"),
            email_lower: format!("{id}@example.com"),
            password_hash: None,
            token: None,
            is_anonymous: anonymous,
            is_superuser: false,
            created_at: Utc::now().into(),
        }
    }

    fn ctx(status: ProjectStatus, is_private: bool, is_admin: bool) -> ProjectContext {
        ProjectContext {
            project: project::Model {
                id: "p1".to_string(),
                name: "Test".to_string(),
                description: None,
                is_private,
                status,
                everyone_contributes: EveryoneContributes::False,
                creator_id: "owner".to_string(),
                geographic_extent: None,
                created_at: Utc::now().into(),
            },
            is_admin,
            member_groups: vec![],
            has_public_grouping: true,
        }
    }

    fn caps(can_access: bool, can_contribute: bool, can_moderate: bool, is_admin: bool) -> Capabilities {
        Capabilities { can_access, can_contribute, can_moderate, is_admin }
    }

    fn contribution(status: ContributionStatus, creator: &str) -> contribution::Model {
        contribution::Model {
            id: "o1".to_string(),
            project_id: "p1".to_string(),
            category_id: "c1".to_string(),
            location_id: "l1".to_string(),
            status,
            properties: json!({}),
            creator_id: creator.to_string(),
            updator_id: None,
            version: 1,
            display_field: None,
            num_media: 0,
            num_comments: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn deleted_project_hides_from_everyone() {
        let ctx = ctx(ProjectStatus::Deleted, false, true);
        let err = project_read(&ctx, &caps(true, true, true, true)).unwrap_err();
        assert!(matches!(err, AppError::ProjectNotFound(_)));
    }

    #[test]
    fn inactive_project_forbidden_for_members_hidden_for_strangers() {
        let member_ctx = ProjectContext {
            member_groups: vec![user_group::Model {
                id: "g1".to_string(),
                project_id: "p1".to_string(),
                name: "G".to_string(),
                description: None,
                can_contribute: false,
                can_moderate: false,
                created_at: Utc::now().into(),
            }],
            ..ctx(ProjectStatus::Inactive, true, false)
        };
        assert!(matches!(
            project_read(&member_ctx, &caps(false, false, false, false)),
            Err(AppError::Forbidden(_))
        ));

        let stranger_ctx = ctx(ProjectStatus::Inactive, true, false);
        let stranger_ctx = ProjectContext { has_public_grouping: false, ..stranger_ctx };
        assert!(matches!(
            project_read(&stranger_ctx, &caps(false, false, false, false)),
            Err(AppError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn private_active_project_is_forbidden_not_hidden() {
        let ctx = ctx(ProjectStatus::Active, true, false);
        assert!(matches!(
            project_read(&ctx, &caps(false, false, false, false)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn anonymous_create_on_auth_project_is_unauthorized() {
        let mut c = ctx(ProjectStatus::Active, false, false);
        c.project.everyone_contributes = EveryoneContributes::Auth;
        let err = contribution_create(&principal("anon", true), &c, &caps(true, false, false, false))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn anonymous_create_on_private_project_is_forbidden() {
        let c = ctx(ProjectStatus::Active, true, false);
        let err = contribution_create(&principal("anon", true), &c, &caps(false, false, false, false))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn my_lane_admin_gets_not_found() {
        let admin = principal("admin", false);
        let c = contribution(ContributionStatus::Active, "someone-else");
        let err = contribution_read(Lane::Mine, &admin, &caps(true, true, true, true), &c, false)
            .unwrap_err();
        assert!(matches!(err, AppError::ContributionNotFound(_)));
    }

    #[test]
    fn my_lane_non_creator_gets_forbidden() {
        let user = principal("user", false);
        let c = contribution(ContributionStatus::Active, "someone-else");
        let err = contribution_read(Lane::Mine, &user, &caps(true, false, false, false), &c, false)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn grouping_lane_hides_non_matching_contribution() {
        let user = principal("user", false);
        let c = contribution(ContributionStatus::Active, "creator");
        let err = contribution_read(Lane::Grouping, &user, &caps(true, false, false, false), &c, false)
            .unwrap_err();
        assert!(matches!(err, AppError::ContributionNotFound(_)));

        assert!(
            contribution_read(Lane::Grouping, &user, &caps(true, false, false, false), &c, true)
                .is_ok()
        );
    }

    #[test]
    fn draft_is_invisible_to_non_creator() {
        let moderator = principal("mod", false);
        let c = contribution(ContributionStatus::Draft, "creator");
        let err = contribution_read(Lane::All, &moderator, &caps(true, true, true, false), &c, false)
            .unwrap_err();
        assert!(matches!(err, AppError::ContributionNotFound(_)));
    }

    #[test]
    fn draft_submit_lands_in_default_status() {
        let creator = principal("creator", false);
        let c = contribution(ContributionStatus::Draft, "creator");
        let decision = contribution_update(
            &creator,
            &ctx(ProjectStatus::Active, false, false),
            &caps(true, true, false, false),
            &c,
            Some(ContributionStatus::Active),
            DefaultStatus::Pending,
        )
        .unwrap();
        assert_eq!(decision.new_status, ContributionStatus::Pending);
    }

    #[test]
    fn moderator_approves_pending() {
        let moderator = principal("mod", false);
        let c = contribution(ContributionStatus::Pending, "creator");
        let decision = contribution_update(
            &moderator,
            &ctx(ProjectStatus::Active, false, false),
            &caps(true, true, true, false),
            &c,
            Some(ContributionStatus::Active),
            DefaultStatus::Pending,
        )
        .unwrap();
        assert_eq!(decision.new_status, ContributionStatus::Active);
    }

    #[test]
    fn creator_cannot_approve_own_pending() {
        let creator = principal("creator", false);
        let c = contribution(ContributionStatus::Pending, "creator");
        let err = contribution_update(
            &creator,
            &ctx(ProjectStatus::Active, false, false),
            &caps(true, true, false, false),
            &c,
            Some(ContributionStatus::Active),
            DefaultStatus::Pending,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn creator_may_edit_own_pending_content() {
        let creator = principal("creator", false);
        let c = contribution(ContributionStatus::Pending, "creator");
        let decision = contribution_update(
            &creator,
            &ctx(ProjectStatus::Active, false, false),
            &caps(true, true, false, false),
            &c,
            None,
            DefaultStatus::Pending,
        )
        .unwrap();
        assert_eq!(decision.new_status, ContributionStatus::Pending);
    }

    #[test]
    fn requesting_review_is_a_bad_request() {
        let moderator = principal("mod", false);
        let c = contribution(ContributionStatus::Active, "creator");
        let err = contribution_update(
            &moderator,
            &ctx(ProjectStatus::Active, false, false),
            &caps(true, true, true, false),
            &c,
            Some(ContributionStatus::Review),
            DefaultStatus::Pending,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn delete_by_creator_or_moderator_only() {
        let stranger = principal("stranger", false);
        let c = contribution(ContributionStatus::Active, "creator");
        let active_ctx = ctx(ProjectStatus::Active, false, false);
        assert!(matches!(
            contribution_delete(&stranger, &active_ctx, &caps(true, false, false, false), &c),
            Err(AppError::Forbidden(_))
        ));

        let creator = principal("creator", false);
        assert!(contribution_delete(&creator, &active_ctx, &caps(true, true, false, false), &c).is_ok());
    }

    #[test]
    fn deleted_contribution_yields_not_found_everywhere() {
        let moderator = principal("mod", false);
        let c = contribution(ContributionStatus::Deleted, "creator");
        let active_ctx = ctx(ProjectStatus::Active, false, false);
        let all_caps = caps(true, true, true, true);
        assert!(matches!(
            contribution_read(Lane::All, &moderator, &all_caps, &c, true),
            Err(AppError::ContributionNotFound(_))
        ));
        assert!(matches!(
            contribution_delete(&moderator, &active_ctx, &all_caps, &c),
            Err(AppError::ContributionNotFound(_))
        ));
    }
}
