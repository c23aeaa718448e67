//! Create user group and membership tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserGroup::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserGroup::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(UserGroup::ProjectId).string_len(32).not_null())
                    .col(ColumnDef::new(UserGroup::Name).string_len(128).not_null())
                    .col(ColumnDef::new(UserGroup::Description).text())
                    .col(
                        ColumnDef::new(UserGroup::CanContribute)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UserGroup::CanModerate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UserGroup::CreatedAt)
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
                    .name("idx_user_group_project_id")
                    .table(UserGroup::Table)
                    .col(UserGroup::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_user_group_project_id")
                    .from(UserGroup::Table, UserGroup::ProjectId)
                    .to(Project::Table, Project::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserGroupMember::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserGroupMember::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(UserGroupMember::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(UserGroupMember::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserGroupMember::GroupId)
                            .col(UserGroupMember::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: membership lookups by user
        manager
            .create_index(
                Index::create()
                    .name("idx_user_group_member_user_id")
                    .table(UserGroupMember::Table)
                    .col(UserGroupMember::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_user_group_member_group_id")
                    .from(UserGroupMember::Table, UserGroupMember::GroupId)
                    .to(UserGroup::Table, UserGroup::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_user_group_member_user_id")
                    .from(UserGroupMember::Table, UserGroupMember::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserGroupMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserGroup::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserGroup {
    Table,
    Id,
    ProjectId,
    Name,
    Description,
    CanContribute,
    CanModerate,
    CreatedAt,
}

#[derive(Iden)]
enum UserGroupMember {
    Table,
    GroupId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum Project {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
