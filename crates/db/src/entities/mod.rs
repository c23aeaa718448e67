//! Database entities.

pub mod category;
pub mod comment;
pub mod contribution;
pub mod contribution_snapshot;
pub mod field;
pub mod grouping;
pub mod grouping_access;
pub mod location;
pub mod lookup_value;
pub mod media_file;
pub mod project;
pub mod project_admin;
pub mod rule;
pub mod user;
pub mod user_group;
pub mod user_group_member;

pub use category::Entity as Category;
pub use comment::Entity as Comment;
pub use contribution::Entity as Contribution;
pub use contribution_snapshot::Entity as ContributionSnapshot;
pub use field::Entity as Field;
pub use grouping::Entity as Grouping;
pub use grouping_access::Entity as GroupingAccess;
pub use location::Entity as Location;
pub use lookup_value::Entity as LookupValue;
pub use media_file::Entity as MediaFile;
pub use project::Entity as Project;
pub use project_admin::Entity as ProjectAdmin;
pub use rule::Entity as Rule;
pub use user::Entity as User;
pub use user_group::Entity as UserGroup;
pub use user_group_member::Entity as UserGroupMember;
