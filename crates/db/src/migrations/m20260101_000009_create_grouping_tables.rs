//! Create data grouping, rule and access tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Grouping::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Grouping::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Grouping::ProjectId).string_len(32).not_null())
                    .col(ColumnDef::new(Grouping::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Grouping::Description).text())
                    .col(ColumnDef::new(Grouping::IsPrivate).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Grouping::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Grouping::CreatorId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Grouping::CreatedAt)
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
                    .name("idx_grouping_project_id")
                    .table(Grouping::Table)
                    .col(Grouping::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_grouping_project_id")
                    .from(Grouping::Table, Grouping::ProjectId)
                    .to(Project::Table, Project::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rule::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rule::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Rule::GroupingId).string_len(32).not_null())
                    .col(ColumnDef::new(Rule::CategoryId).string_len(32).not_null())
                    .col(ColumnDef::new(Rule::MinDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Rule::MaxDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Rule::Constraints).json_binary())
                    .col(ColumnDef::new(Rule::Status).string_len(20).not_null().default("active"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rule_grouping_id")
                    .table(Rule::Table)
                    .col(Rule::GroupingId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_rule_grouping_id")
                    .from(Rule::Table, Rule::GroupingId)
                    .to(Grouping::Table, Grouping::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_rule_category_id")
                    .from(Rule::Table, Rule::CategoryId)
                    .to(Category::Table, Category::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupingAccess::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GroupingAccess::GroupingId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupingAccess::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupingAccess::CanView).boolean().not_null().default(true))
                    .col(ColumnDef::new(GroupingAccess::CanRead).boolean().not_null().default(false))
                    .primary_key(
                        Index::create()
                            .col(GroupingAccess::GroupingId)
                            .col(GroupingAccess::GroupId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_grouping_access_grouping_id")
                    .from(GroupingAccess::Table, GroupingAccess::GroupingId)
                    .to(Grouping::Table, Grouping::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_grouping_access_group_id")
                    .from(GroupingAccess::Table, GroupingAccess::GroupId)
                    .to(UserGroup::Table, UserGroup::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupingAccess::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rule::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Grouping::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Grouping {
    Table,
    Id,
    ProjectId,
    Name,
    Description,
    IsPrivate,
    Status,
    CreatorId,
    CreatedAt,
}

#[derive(Iden)]
enum Rule {
    Table,
    Id,
    GroupingId,
    CategoryId,
    MinDate,
    MaxDate,
    Constraints,
    Status,
}

#[derive(Iden)]
enum GroupingAccess {
    Table,
    GroupingId,
    GroupId,
    CanView,
    CanRead,
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
enum UserGroup {
    Table,
    Id,
}
