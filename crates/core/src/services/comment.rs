//! Comment threads and review-state coupling.
//!
//! Review comments drive the contribution's `review` status: opening one
//! moves an active contribution into review, resolving the last open one
//! moves it back. Both changes land in the same transaction as the comment
//! write.

use chrono::Utc;
use geonote_common::{AppError, AppResult, IdGenerator};
use geonote_db::entities::comment::{CommentStatus, ReviewStatus};
use geonote_db::entities::contribution::ContributionStatus;
use geonote_db::entities::{comment, contribution, user};
use geonote_db::repositories::CommentRepository;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::policy::Lane;
use crate::services::contribution::ContributionService;

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 10_000))]
    pub text: String,
    pub responds_to: Option<String>,
    /// `open` flags the comment as a review request.
    pub review_status: Option<ReviewStatus>,
}

/// Input for updating a comment.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCommentInput {
    #[validate(length(min = 1, max = 10_000))]
    pub text: Option<String>,
    /// Only `resolved` is accepted, and only by moderators.
    pub review_status: Option<ReviewStatus>,
}

/// Service for comments.
#[derive(Clone)]
pub struct CommentService {
    comments: CommentRepository,
    contributions: ContributionService,
    ids: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comments: CommentRepository,
        contributions: ContributionService,
        ids: IdGenerator,
    ) -> Self {
        Self {
            comments,
            contributions,
            ids,
        }
    }

    /// Active comments of a contribution, oldest first.
    pub async fn list(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
    ) -> AppResult<Vec<comment::Model>> {
        self.contributions
            .load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;
        self.comments.list(contribution_id).await
    }

    /// Attach a comment to a contribution.
    pub async fn create(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        let (_, _, contribution, _) = self
            .contributions
            .load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;
        input.validate()?;

        if principal.is_anonymous {
            return Err(AppError::Unauthorized);
        }
        if contribution.status == ContributionStatus::Draft {
            return Err(AppError::BadRequest(
                "Comments cannot be attached to drafts".to_string(),
            ));
        }
        if input.review_status == Some(ReviewStatus::Resolved) {
            return Err(AppError::BadRequest(
                "A new comment cannot start out resolved".to_string(),
            ));
        }
        if let Some(parent_id) = &input.responds_to {
            self.comments
                .find_by_id(contribution_id, parent_id)
                .await?
                .filter(|c| c.status == CommentStatus::Active)
                .ok_or_else(|| {
                    AppError::BadRequest(
                        "Parent comment does not belong to this contribution".to_string(),
                    )
                })?;
        }

        let opens_review = input.review_status == Some(ReviewStatus::Open);
        let mut parent: contribution::ActiveModel = contribution.clone().into();
        parent.num_comments = Set(contribution.num_comments + 1);
        if opens_review && contribution.status == ContributionStatus::Active {
            parent.status = Set(ContributionStatus::Review);
        }

        let model = comment::ActiveModel {
            id: Set(self.ids.generate()),
            contribution_id: Set(contribution_id.to_string()),
            creator_id: Set(principal.id.clone()),
            text: Set(input.text),
            responds_to: Set(input.responds_to),
            review_status: Set(input.review_status),
            status: Set(CommentStatus::Active),
            created_at: Set(Utc::now().into()),
        };
        self.comments.create_with_contribution(model, parent).await
    }

    /// Edit a comment's text or resolve its review flag.
    pub async fn update(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
        comment_id: &str,
        input: UpdateCommentInput,
    ) -> AppResult<comment::Model> {
        let (_, caps, contribution, _) = self
            .contributions
            .load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;
        input.validate()?;

        let comment = self.get_active(contribution_id, comment_id).await?;

        if input.text.is_some() && comment.creator_id != principal.id {
            return Err(AppError::Forbidden(
                "Only the author may edit a comment".to_string(),
            ));
        }

        let resolving = match input.review_status {
            None => false,
            Some(ReviewStatus::Open) => {
                return Err(AppError::BadRequest(
                    "A review flag is opened at creation time".to_string(),
                ));
            }
            Some(ReviewStatus::Resolved) => {
                if !caps.can_moderate {
                    return Err(AppError::Forbidden(
                        "Moderator permission required to resolve a review".to_string(),
                    ));
                }
                if comment.review_status != Some(ReviewStatus::Open) {
                    return Err(AppError::BadRequest(
                        "Comment has no open review flag".to_string(),
                    ));
                }
                true
            }
        };

        // Resolving the last open review returns the contribution to active.
        let parent = if resolving
            && contribution.status == ContributionStatus::Review
            && self.comments.count_open_reviews(contribution_id).await? <= 1
        {
            let mut model: contribution::ActiveModel = contribution.into();
            model.status = Set(ContributionStatus::Active);
            Some(model)
        } else {
            None
        };

        let mut model: comment::ActiveModel = comment.into();
        if let Some(text) = input.text {
            model.text = Set(text);
        }
        if resolving {
            model.review_status = Set(Some(ReviewStatus::Resolved));
        }
        self.comments.update_with_contribution(model, parent).await
    }

    /// Soft-delete a comment and its direct responses.
    pub async fn delete(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
        comment_id: &str,
    ) -> AppResult<()> {
        let (_, caps, contribution, _) = self
            .contributions
            .load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;

        let comment = self.get_active(contribution_id, comment_id).await?;
        if comment.creator_id != principal.id && !caps.can_moderate {
            return Err(AppError::Forbidden(
                "Only the author or a moderator may delete a comment".to_string(),
            ));
        }

        let responses = self.comments.responses(comment_id).await?;
        let removed = 1 + responses.len();
        let open_in_thread = responses
            .iter()
            .chain(std::iter::once(&comment))
            .filter(|c| c.review_status == Some(ReviewStatus::Open))
            .count();
        let open_total = self.comments.count_open_reviews(contribution_id).await?;

        let mut parent: contribution::ActiveModel = contribution.clone().into();
        parent.num_comments = Set((contribution.num_comments - removed as i32).max(0));
        // Removing the last open review flags ends the review.
        if contribution.status == ContributionStatus::Review
            && open_total <= open_in_thread as u64
        {
            parent.status = Set(ContributionStatus::Active);
        }

        self.comments.soft_delete_thread(comment_id, parent).await?;
        Ok(())
    }

    async fn get_active(
        &self,
        contribution_id: &str,
        comment_id: &str,
    ) -> AppResult<comment::Model> {
        self.comments
            .find_by_id(contribution_id, comment_id)
            .await?
            .filter(|c| c.status == CommentStatus::Active)
            .ok_or_else(|| AppError::NotFound(format!("comment {comment_id}")))
    }
}
