//! Repositories for database access.

mod category;
mod comment;
mod contribution;
mod grouping;
mod location;
mod media_file;
mod project;
mod user;

pub use category::CategoryRepository;
pub use comment::CommentRepository;
pub use contribution::{ContributionRepository, ContributionUpdate};
pub use grouping::GroupingRepository;
pub use location::LocationRepository;
pub use media_file::MediaFileRepository;
pub use project::ProjectRepository;
pub use user::UserRepository;
