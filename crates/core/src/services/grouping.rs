//! Data grouping, rule and access management.

use chrono::Utc;
use geonote_common::{AppError, AppResult, IdGenerator};
use geonote_db::entities::grouping::GroupingStatus;
use geonote_db::entities::rule::RuleStatus;
use geonote_db::entities::{grouping, grouping_access, rule, user};
use geonote_db::repositories::{GroupingRepository, ProjectRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::fields::CategorySchema;
use crate::filter;
use crate::policy;
use crate::roles::{Capabilities, ProjectContext};
use crate::services::category::CategoryService;
use crate::services::context::ContextLoader;

/// Input for creating a data grouping.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupingInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

/// Input for updating a data grouping.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateGroupingInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_private: Option<bool>,
}

/// Input for creating or updating a rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRuleInput {
    pub category_id: String,
    pub min_date: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub max_date: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub constraints: Option<serde_json::Value>,
}

/// Service for data groupings, their rules and access records.
#[derive(Clone)]
pub struct GroupingService {
    groupings: GroupingRepository,
    projects: ProjectRepository,
    categories: CategoryService,
    context: ContextLoader,
    ids: IdGenerator,
}

impl GroupingService {
    /// Create a new grouping service.
    #[must_use]
    pub const fn new(
        groupings: GroupingRepository,
        projects: ProjectRepository,
        categories: CategoryService,
        context: ContextLoader,
        ids: IdGenerator,
    ) -> Self {
        Self {
            groupings,
            projects,
            categories,
            context,
            ids,
        }
    }

    /// Whether the grouping's metadata is visible to the principal.
    pub async fn can_view(
        &self,
        ctx: &ProjectContext,
        caps: &Capabilities,
        grouping: &grouping::Model,
    ) -> AppResult<bool> {
        if !grouping.is_private || caps.is_admin {
            return Ok(true);
        }
        let member_ids: Vec<String> = ctx.member_groups.iter().map(|g| g.id.clone()).collect();
        let access = self
            .groupings
            .access_for_groups(&grouping.id, &member_ids)
            .await?;
        Ok(access.iter().any(|a| a.can_view))
    }

    /// Whether the data behind the grouping is readable by the principal.
    pub async fn can_read(
        &self,
        ctx: &ProjectContext,
        caps: &Capabilities,
        grouping: &grouping::Model,
    ) -> AppResult<bool> {
        if !grouping.is_private || caps.is_admin {
            return Ok(true);
        }
        let member_ids: Vec<String> = ctx.member_groups.iter().map(|g| g.id.clone()).collect();
        let access = self
            .groupings
            .access_for_groups(&grouping.id, &member_ids)
            .await?;
        Ok(access.iter().any(|a| a.can_read))
    }

    /// Groupings of a project the principal may see.
    pub async fn list(
        &self,
        principal: &user::Model,
        project_id: &str,
    ) -> AppResult<Vec<grouping::Model>> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_read(&ctx, &caps)?;

        let mut visible = vec![];
        for grouping in self.groupings.list(project_id).await? {
            if self.can_view(&ctx, &caps, &grouping).await? {
                visible.push(grouping);
            }
        }
        Ok(visible)
    }

    /// A single grouping's metadata. Private groupings the principal has no
    /// view grant for are indistinguishable from missing ones.
    pub async fn get(
        &self,
        principal: &user::Model,
        project_id: &str,
        grouping_id: &str,
    ) -> AppResult<grouping::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_read(&ctx, &caps)?;

        let grouping = self.get_existing(project_id, grouping_id).await?;
        if self.can_view(&ctx, &caps, &grouping).await? {
            Ok(grouping)
        } else {
            Err(AppError::NotFound(format!("grouping {grouping_id}")))
        }
    }

    /// Create a grouping.
    pub async fn create(
        &self,
        principal: &user::Model,
        project_id: &str,
        input: CreateGroupingInput,
    ) -> AppResult<grouping::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        input.validate()?;

        self.groupings
            .create(grouping::ActiveModel {
                id: Set(self.ids.generate()),
                project_id: Set(project_id.to_string()),
                name: Set(input.name),
                description: Set(input.description),
                is_private: Set(input.is_private),
                status: Set(GroupingStatus::Active),
                creator_id: Set(principal.id.clone()),
                created_at: Set(Utc::now().into()),
            })
            .await
    }

    /// Update a grouping.
    pub async fn update(
        &self,
        principal: &user::Model,
        project_id: &str,
        grouping_id: &str,
        input: UpdateGroupingInput,
    ) -> AppResult<grouping::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        input.validate()?;

        let grouping = self.get_existing(project_id, grouping_id).await?;

        let mut model: grouping::ActiveModel = grouping.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(is_private) = input.is_private {
            model.is_private = Set(is_private);
        }
        self.groupings.update(model).await
    }

    /// Soft-delete a grouping.
    pub async fn delete(
        &self,
        principal: &user::Model,
        project_id: &str,
        grouping_id: &str,
    ) -> AppResult<()> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        let grouping = self.get_existing(project_id, grouping_id).await?;
        let mut model: grouping::ActiveModel = grouping.into();
        model.status = Set(GroupingStatus::Deleted);
        self.groupings.update(model).await?;
        Ok(())
    }

    // ==================== Rules ====================

    /// Active rules of a grouping, for principals who may view it.
    pub async fn rules(
        &self,
        principal: &user::Model,
        project_id: &str,
        grouping_id: &str,
    ) -> AppResult<Vec<rule::Model>> {
        self.get(principal, project_id, grouping_id).await?;
        self.groupings.rules(grouping_id).await
    }

    /// Add a rule to a grouping. Constraint keys are validated against the
    /// pinned category's active fields.
    pub async fn create_rule(
        &self,
        principal: &user::Model,
        project_id: &str,
        grouping_id: &str,
        input: CreateRuleInput,
    ) -> AppResult<rule::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        self.get_existing(project_id, grouping_id).await?;
        let schema = self.rule_category(project_id, &input.category_id).await?;
        check_rule_input(&schema, &input)?;

        self.groupings
            .create_rule(rule::ActiveModel {
                id: Set(self.ids.generate()),
                grouping_id: Set(grouping_id.to_string()),
                category_id: Set(input.category_id),
                min_date: Set(input.min_date.map(Into::into)),
                max_date: Set(input.max_date.map(Into::into)),
                constraints: Set(input.constraints),
                status: Set(RuleStatus::Active),
            })
            .await
    }

    /// Replace a rule's filter. The pinned category cannot change.
    pub async fn update_rule(
        &self,
        principal: &user::Model,
        project_id: &str,
        grouping_id: &str,
        rule_id: &str,
        input: CreateRuleInput,
    ) -> AppResult<rule::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        self.get_existing(project_id, grouping_id).await?;
        let rule = self
            .groupings
            .find_rule(grouping_id, rule_id)
            .await?
            .filter(|r| r.status == RuleStatus::Active)
            .ok_or_else(|| AppError::NotFound(format!("rule {rule_id}")))?;
        if rule.category_id != input.category_id {
            return Err(AppError::BadRequest(
                "A rule stays pinned to its category".to_string(),
            ));
        }

        let schema = self.rule_category(project_id, &input.category_id).await?;
        check_rule_input(&schema, &input)?;

        let mut model: rule::ActiveModel = rule.into();
        model.min_date = Set(input.min_date.map(Into::into));
        model.max_date = Set(input.max_date.map(Into::into));
        model.constraints = Set(input.constraints);
        self.groupings.update_rule(model).await
    }

    /// Retire a rule.
    pub async fn delete_rule(
        &self,
        principal: &user::Model,
        project_id: &str,
        grouping_id: &str,
        rule_id: &str,
    ) -> AppResult<()> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        self.get_existing(project_id, grouping_id).await?;
        let rule = self
            .groupings
            .find_rule(grouping_id, rule_id)
            .await?
            .filter(|r| r.status == RuleStatus::Active)
            .ok_or_else(|| AppError::NotFound(format!("rule {rule_id}")))?;

        let mut model: rule::ActiveModel = rule.into();
        model.status = Set(RuleStatus::Deleted);
        self.groupings.update_rule(model).await?;
        Ok(())
    }

    // ==================== Access records ====================

    /// Access records of a grouping.
    pub async fn access_records(
        &self,
        principal: &user::Model,
        project_id: &str,
        grouping_id: &str,
    ) -> AppResult<Vec<grouping_access::Model>> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        self.get_existing(project_id, grouping_id).await?;
        self.groupings.access_records(grouping_id).await
    }

    /// Grant (or re-grant with different rights) a user group access to a
    /// grouping.
    pub async fn grant_access(
        &self,
        principal: &user::Model,
        project_id: &str,
        grouping_id: &str,
        group_id: &str,
        can_read: bool,
    ) -> AppResult<grouping_access::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;

        self.get_existing(project_id, grouping_id).await?;
        self.projects
            .find_group(project_id, group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user group {group_id}")))?;

        let existing = self
            .groupings
            .access_for_groups(grouping_id, &[group_id.to_string()])
            .await?;
        if !existing.is_empty() {
            self.groupings.revoke_access(grouping_id, group_id).await?;
        }

        self.groupings
            .grant_access(grouping_access::ActiveModel {
                grouping_id: Set(grouping_id.to_string()),
                group_id: Set(group_id.to_string()),
                can_view: Set(true),
                can_read: Set(can_read),
            })
            .await
    }

    /// Revoke a user group's access to a grouping.
    pub async fn revoke_access(
        &self,
        principal: &user::Model,
        project_id: &str,
        grouping_id: &str,
        group_id: &str,
    ) -> AppResult<()> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_admin_write(principal, &ctx, &caps)?;
        self.get_existing(project_id, grouping_id).await?;
        self.groupings.revoke_access(grouping_id, group_id).await
    }

    // ==================== Internals ====================

    /// A grouping row that exists and is not deleted.
    async fn get_existing(
        &self,
        project_id: &str,
        grouping_id: &str,
    ) -> AppResult<grouping::Model> {
        self.groupings
            .find_by_id(project_id, grouping_id)
            .await?
            .filter(|g| g.status != GroupingStatus::Deleted)
            .ok_or_else(|| AppError::NotFound(format!("grouping {grouping_id}")))
    }

    /// The schema of a category a rule may pin: it must exist in the
    /// project and be active.
    async fn rule_category(
        &self,
        project_id: &str,
        category_id: &str,
    ) -> AppResult<CategorySchema> {
        let schemas = self.categories.schemas(project_id).await?;
        schemas
            .iter()
            .find(|s| s.id == category_id && s.active)
            .cloned()
            .ok_or_else(|| {
                AppError::BadRequest("Rule references an unknown or inactive category".to_string())
            })
    }
}

/// Validate the date window and constraint objects of a rule payload.
fn check_rule_input(schema: &CategorySchema, input: &CreateRuleInput) -> AppResult<()> {
    if let (Some(min), Some(max)) = (input.min_date, input.max_date) {
        if min > max {
            return Err(AppError::BadRequest(
                "Minimum date must not exceed maximum date".to_string(),
            ));
        }
    }
    if let Some(constraints) = &input.constraints {
        filter::validate_constraints(schema, constraints)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geonote_db::entities::category::DefaultStatus;
    use serde_json::json;

    use super::*;
    use crate::fields::{FieldSchema, FieldType};

    fn schema() -> CategorySchema {
        CategorySchema {
            id: "c1".to_string(),
            project_id: "p1".to_string(),
            name: "Trees".to_string(),
            description: None,
            active: true,
            default_status: DefaultStatus::Active,
            display_field_id: None,
            fields: vec![FieldSchema {
                id: "f1".to_string(),
                key: "height".to_string(),
                name: "Height".to_string(),
                description: None,
                required: false,
                active: true,
                order: 0,
                field_type: FieldType::Numeric {
                    minval: None,
                    maxval: None,
                },
            }],
        }
    }

    #[test]
    fn rule_input_rejects_inverted_date_window() {
        let input = CreateRuleInput {
            category_id: "c1".to_string(),
            min_date: Some("2026-02-01T00:00:00+00:00".parse().unwrap()),
            max_date: Some("2026-01-01T00:00:00+00:00".parse().unwrap()),
            constraints: None,
        };
        assert!(check_rule_input(&schema(), &input).is_err());
    }

    #[test]
    fn rule_input_rejects_unknown_constraint_key() {
        let input = CreateRuleInput {
            category_id: "c1".to_string(),
            min_date: None,
            max_date: None,
            constraints: Some(json!({"girth": {"minval": 1}})),
        };
        assert!(check_rule_input(&schema(), &input).is_err());

        let ok = CreateRuleInput {
            constraints: Some(json!({"height": {"minval": 1}})),
            ..input
        };
        assert!(check_rule_input(&schema(), &ok).is_ok());
    }
}
