//! Create media file table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MediaFile::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MediaFile::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(MediaFile::ContributionId).string_len(32).not_null())
                    .col(ColumnDef::new(MediaFile::CreatorId).string_len(32).not_null())
                    .col(ColumnDef::new(MediaFile::Name).string_len(256).not_null())
                    .col(ColumnDef::new(MediaFile::Description).text())
                    .col(ColumnDef::new(MediaFile::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(MediaFile::StorageKey).string_len(512).not_null())
                    .col(
                        ColumnDef::new(MediaFile::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(MediaFile::CreatedAt)
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
                    .name("idx_media_file_contribution_id")
                    .table(MediaFile::Table)
                    .col(MediaFile::ContributionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_media_file_contribution_id")
                    .from(MediaFile::Table, MediaFile::ContributionId)
                    .to(Contribution::Table, Contribution::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MediaFile::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MediaFile {
    Table,
    Id,
    ContributionId,
    CreatorId,
    Name,
    Description,
    Kind,
    StorageKey,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum Contribution {
    Table,
    Id,
}
