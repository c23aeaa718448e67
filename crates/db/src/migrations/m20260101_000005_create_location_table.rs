//! Create location table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Location::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Location::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Location::Name).string_len(128))
                    .col(ColumnDef::new(Location::Description).text())
                    .col(ColumnDef::new(Location::Geometry).json_binary().not_null())
                    .col(ColumnDef::new(Location::IsPrivate).boolean().not_null().default(false))
                    .col(ColumnDef::new(Location::PrivateForProject).string_len(32))
                    .col(ColumnDef::new(Location::CreatorId).string_len(32).not_null())
                    .col(ColumnDef::new(Location::Version).integer().not_null().default(1))
                    .col(
                        ColumnDef::new(Location::CreatedAt)
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
                    .name("idx_location_private_for_project")
                    .table(Location::Table)
                    .col(Location::PrivateForProject)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_location_private_for_project")
                    .from(Location::Table, Location::PrivateForProject)
                    .to(Project::Table, Project::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Location::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Location {
    Table,
    Id,
    Name,
    Description,
    Geometry,
    IsPrivate,
    PrivateForProject,
    CreatorId,
    Version,
    CreatedAt,
}

#[derive(Iden)]
enum Project {
    Table,
    Id,
}
