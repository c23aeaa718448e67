//! Create comment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Comment::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Comment::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Comment::ContributionId).string_len(32).not_null())
                    .col(ColumnDef::new(Comment::CreatorId).string_len(32).not_null())
                    .col(ColumnDef::new(Comment::Text).text().not_null())
                    .col(ColumnDef::new(Comment::RespondsTo).string_len(32))
                    .col(ColumnDef::new(Comment::ReviewStatus).string_len(10))
                    .col(ColumnDef::new(Comment::Status).string_len(20).not_null().default("active"))
                    .col(
                        ColumnDef::new(Comment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_contribution_id")
                    .table(Comment::Table)
                    .col(Comment::ContributionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_comment_contribution_id")
                    .from(Comment::Table, Comment::ContributionId)
                    .to(Contribution::Table, Contribution::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_comment_responds_to")
                    .from(Comment::Table, Comment::RespondsTo)
                    .to(Comment::Table, Comment::Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
    ContributionId,
    CreatorId,
    Text,
    RespondsTo,
    ReviewStatus,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum Contribution {
    Table,
    Id,
}
