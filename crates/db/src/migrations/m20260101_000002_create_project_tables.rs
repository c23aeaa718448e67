//! Create project and project administrator tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Project::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Project::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Project::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Project::Description).text())
                    .col(ColumnDef::new(Project::IsPrivate).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Project::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Project::EveryoneContributes)
                            .string_len(20)
                            .not_null()
                            .default("auth"),
                    )
                    .col(ColumnDef::new(Project::CreatorId).string_len(32).not_null())
                    .col(ColumnDef::new(Project::GeographicExtent).json_binary())
                    .col(
                        ColumnDef::new(Project::CreatedAt)
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
                    .name("idx_project_creator_id")
                    .table(Project::Table)
                    .col(Project::CreatorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_project_creator_id")
                    .from(Project::Table, Project::CreatorId)
                    .to(User::Table, User::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProjectAdmin::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProjectAdmin::ProjectId).string_len(32).not_null())
                    .col(ColumnDef::new(ProjectAdmin::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(ProjectAdmin::Contact).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(ProjectAdmin::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(ProjectAdmin::ProjectId)
                            .col(ProjectAdmin::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_project_admin_project_id")
                    .from(ProjectAdmin::Table, ProjectAdmin::ProjectId)
                    .to(Project::Table, Project::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_project_admin_user_id")
                    .from(ProjectAdmin::Table, ProjectAdmin::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectAdmin::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Project::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Project {
    Table,
    Id,
    Name,
    Description,
    IsPrivate,
    Status,
    EveryoneContributes,
    CreatorId,
    GeographicExtent,
    CreatedAt,
}

#[derive(Iden)]
enum ProjectAdmin {
    Table,
    ProjectId,
    UserId,
    Contact,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
