//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20260101_000001_create_user_table;
mod m20260101_000002_create_project_tables;
mod m20260101_000003_create_user_group_tables;
mod m20260101_000004_create_category_tables;
mod m20260101_000005_create_location_table;
mod m20260101_000006_create_contribution_tables;
mod m20260101_000007_create_comment_table;
mod m20260101_000008_create_media_file_table;
mod m20260101_000009_create_grouping_tables;
mod m20260101_000010_seed_anonymous_user;

pub use m20260101_000010_seed_anonymous_user::ANONYMOUS_USER_ID;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_user_table::Migration),
            Box::new(m20260101_000002_create_project_tables::Migration),
            Box::new(m20260101_000003_create_user_group_tables::Migration),
            Box::new(m20260101_000004_create_category_tables::Migration),
            Box::new(m20260101_000005_create_location_table::Migration),
            Box::new(m20260101_000006_create_contribution_tables::Migration),
            Box::new(m20260101_000007_create_comment_table::Migration),
            Box::new(m20260101_000008_create_media_file_table::Migration),
            Box::new(m20260101_000009_create_grouping_tables::Migration),
            Box::new(m20260101_000010_seed_anonymous_user::Migration),
        ]
    }
}
