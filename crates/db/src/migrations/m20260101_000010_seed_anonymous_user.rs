//! Seed the anonymous sentinel user.
//!
//! Anonymous contributions on open projects are attributed to this fixed
//! row so every contribution has a creator.

use sea_orm_migration::prelude::*;

/// Fixed ID of the anonymous sentinel row.
pub const ANONYMOUS_USER_ID: &str = "00000000000000000000000000";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let insert = Query::insert()
            .into_table(User::Table)
            .columns([
                User::Id,
                User::DisplayName,
                User::DisplayNameLower,
                User::Email,
                User::EmailLower,
                User::IsAnonymous,
            ])
            .values_panic([
                ANONYMOUS_USER_ID.into(),
                "AnonymousUser".into(),
                "anonymoususer".into(),
                "anonymous@invalid.local".into(),
                "anonymous@invalid.local".into(),
                true.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(User::Table)
            .and_where(Expr::col(User::Id).eq(ANONYMOUS_USER_ID))
            .to_owned();

        manager.exec_stmt(delete).await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    DisplayName,
    DisplayNameLower,
    Email,
    EmailLower,
    IsAnonymous,
}
