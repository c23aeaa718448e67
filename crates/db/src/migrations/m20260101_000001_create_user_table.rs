//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(User::Id).string_len(32).not_null().primary_key())
                    .col(
                        ColumnDef::new(User::DisplayName)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(User::DisplayNameLower).string_len(128).not_null())
                    .col(ColumnDef::new(User::Email).string_len(256).not_null().unique_key())
                    .col(ColumnDef::new(User::EmailLower).string_len(256).not_null())
                    .col(ColumnDef::new(User::PasswordHash).string_len(256))
                    .col(ColumnDef::new(User::Token).string_len(64).unique_key())
                    .col(ColumnDef::new(User::IsAnonymous).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::IsSuperuser).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: case-insensitive sign-in lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_user_display_name_lower")
                    .table(User::Table)
                    .col(User::DisplayNameLower)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_email_lower")
                    .table(User::Table)
                    .col(User::EmailLower)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
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
    PasswordHash,
    Token,
    IsAnonymous,
    IsSuperuser,
    CreatedAt,
}
