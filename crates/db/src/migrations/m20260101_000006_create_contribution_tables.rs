//! Create contribution and snapshot tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contribution::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Contribution::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Contribution::ProjectId).string_len(32).not_null())
                    .col(ColumnDef::new(Contribution::CategoryId).string_len(32).not_null())
                    .col(ColumnDef::new(Contribution::LocationId).string_len(32).not_null())
                    .col(ColumnDef::new(Contribution::Status).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Contribution::Properties)
                            .json_binary()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(Contribution::CreatorId).string_len(32).not_null())
                    .col(ColumnDef::new(Contribution::UpdatorId).string_len(32))
                    .col(ColumnDef::new(Contribution::Version).integer().not_null().default(1))
                    .col(ColumnDef::new(Contribution::DisplayField).string_len(512))
                    .col(ColumnDef::new(Contribution::NumMedia).integer().not_null().default(0))
                    .col(ColumnDef::new(Contribution::NumComments).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Contribution::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Contribution::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Composite index: grouping filters always pin project, category
        // and status before touching properties
        manager
            .create_index(
                Index::create()
                    .name("idx_contribution_project_category_status")
                    .table(Contribution::Table)
                    .col(Contribution::ProjectId)
                    .col(Contribution::CategoryId)
                    .col(Contribution::Status)
                    .to_owned(),
            )
            .await?;

        // Index: my-contributions lane
        manager
            .create_index(
                Index::create()
                    .name("idx_contribution_project_creator")
                    .table(Contribution::Table)
                    .col(Contribution::ProjectId)
                    .col(Contribution::CreatorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contribution_location_id")
                    .table(Contribution::Table)
                    .col(Contribution::LocationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_contribution_project_id")
                    .from(Contribution::Table, Contribution::ProjectId)
                    .to(Project::Table, Project::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_contribution_category_id")
                    .from(Contribution::Table, Contribution::CategoryId)
                    .to(Category::Table, Category::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_contribution_location_id")
                    .from(Contribution::Table, Contribution::LocationId)
                    .to(Location::Table, Location::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContributionSnapshot::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContributionSnapshot::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContributionSnapshot::ContributionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ContributionSnapshot::Status).string_len(20).not_null())
                    .col(ColumnDef::new(ContributionSnapshot::Properties).json_binary().not_null())
                    .col(ColumnDef::new(ContributionSnapshot::Version).integer().not_null())
                    .col(ColumnDef::new(ContributionSnapshot::UpdatorId).string_len(32))
                    .col(
                        ColumnDef::new(ContributionSnapshot::CreatedAt)
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
                    .name("idx_contribution_snapshot_contribution_id")
                    .table(ContributionSnapshot::Table)
                    .col(ContributionSnapshot::ContributionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_contribution_snapshot_contribution_id")
                    .from(ContributionSnapshot::Table, ContributionSnapshot::ContributionId)
                    .to(Contribution::Table, Contribution::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContributionSnapshot::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contribution::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Contribution {
    Table,
    Id,
    ProjectId,
    CategoryId,
    LocationId,
    Status,
    Properties,
    CreatorId,
    UpdatorId,
    Version,
    DisplayField,
    NumMedia,
    NumComments,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ContributionSnapshot {
    Table,
    Id,
    ContributionId,
    Status,
    Properties,
    Version,
    UpdatorId,
    CreatedAt,
}

#[derive(Iden)]
enum Project {
    Table,
    Id,
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
}

#[derive(Iden)]
enum Location {
    Table,
    Id,
}
