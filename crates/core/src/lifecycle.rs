//! Contribution lifecycle state machine.
//!
//! ```text
//! draft ──(owner submit)──► pending ──(moderator approve)──► active
//! draft ──(owner submit, no moderation)──► active
//! active ──(open review comment)──► review
//! review ──(all review comments resolved)──► active
//! {draft, active, pending, review} ──(delete)──► deleted (terminal)
//! ```

use geonote_db::entities::category::DefaultStatus;
use geonote_db::entities::contribution::ContributionStatus;

/// Whether the state machine permits moving between two states at all.
/// Capability checks live in [`crate::policy`].
#[must_use]
pub const fn can_transition(from: ContributionStatus, to: ContributionStatus) -> bool {
    use ContributionStatus::{Active, Deleted, Draft, Pending, Review};
    matches!(
        (from, to),
        (Draft, Draft | Active | Pending | Deleted)
            | (Pending, Active | Pending | Deleted)
            | (Active, Pending | Review | Deleted)
            | (Review, Active | Deleted)
    )
}

/// Status a submitted draft (or a fresh contribution) lands in.
///
/// Moderators publish directly; everyone else gets the category's default.
#[must_use]
pub const fn submit_status(default_status: DefaultStatus, can_moderate: bool) -> ContributionStatus {
    if can_moderate {
        ContributionStatus::Active
    } else {
        match default_status {
            DefaultStatus::Active => ContributionStatus::Active,
            DefaultStatus::Pending => ContributionStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_is_terminal() {
        for to in [
            ContributionStatus::Draft,
            ContributionStatus::Active,
            ContributionStatus::Pending,
            ContributionStatus::Review,
            ContributionStatus::Deleted,
        ] {
            assert!(!can_transition(ContributionStatus::Deleted, to));
        }
    }

    #[test]
    fn draft_can_be_submitted_or_deleted() {
        assert!(can_transition(ContributionStatus::Draft, ContributionStatus::Pending));
        assert!(can_transition(ContributionStatus::Draft, ContributionStatus::Active));
        assert!(can_transition(ContributionStatus::Draft, ContributionStatus::Deleted));
        assert!(!can_transition(ContributionStatus::Active, ContributionStatus::Draft));
    }

    #[test]
    fn review_only_returns_to_active() {
        assert!(can_transition(ContributionStatus::Review, ContributionStatus::Active));
        assert!(!can_transition(ContributionStatus::Review, ContributionStatus::Pending));
    }

    #[test]
    fn submit_status_respects_moderation() {
        assert_eq!(
            submit_status(DefaultStatus::Pending, false),
            ContributionStatus::Pending
        );
        assert_eq!(
            submit_status(DefaultStatus::Pending, true),
            ContributionStatus::Active
        );
        assert_eq!(
            submit_status(DefaultStatus::Active, false),
            ContributionStatus::Active
        );
    }
}
