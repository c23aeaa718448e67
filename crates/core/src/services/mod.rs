//! Business logic services.

#![allow(missing_docs)]

pub mod category;
pub mod comment;
pub mod context;
pub mod contribution;
pub mod grouping;
pub mod location;
pub mod media;
pub mod project;
pub mod user;

pub use category::{
    CategoryService, CreateCategoryInput, CreateFieldInput, CreateLookupValueInput,
    UpdateCategoryInput, UpdateFieldInput,
};
pub use comment::{CommentService, CreateCommentInput, UpdateCommentInput};
pub use context::ContextLoader;
pub use contribution::{
    ContributionFeature, ContributionMeta, ContributionService, CreateContributionInput,
    LocationInput, LocationMeta, UpdateContributionInput,
};
pub use grouping::{CreateGroupingInput, CreateRuleInput, GroupingService, UpdateGroupingInput};
pub use location::{LocationService, UpdateLocationInput};
pub use media::{CreateMediaInput, MediaRecord, MediaService};
pub use project::{
    CreateGroupInput, CreateProjectInput, ProjectService, UpdateGroupInput, UpdateProjectInput,
};
pub use user::{CreateUserInput, UserService};
