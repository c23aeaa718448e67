//! Create category, field and lookup value tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Category::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Category::ProjectId).string_len(32).not_null())
                    .col(ColumnDef::new(Category::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Category::Description).text())
                    .col(
                        ColumnDef::new(Category::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Category::DefaultStatus)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Category::Order).integer().not_null().default(0))
                    .col(ColumnDef::new(Category::DisplayFieldId).string_len(32))
                    .col(ColumnDef::new(Category::CreatorId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Category::CreatedAt)
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
                    .name("idx_category_project_id")
                    .table(Category::Table)
                    .col(Category::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_category_project_id")
                    .from(Category::Table, Category::ProjectId)
                    .to(Project::Table, Project::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Field::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Field::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Field::CategoryId).string_len(32).not_null())
                    .col(ColumnDef::new(Field::Key).string_len(128).not_null())
                    .col(ColumnDef::new(Field::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Field::Description).text())
                    .col(ColumnDef::new(Field::Required).boolean().not_null().default(false))
                    .col(ColumnDef::new(Field::Order).integer().not_null().default(0))
                    .col(ColumnDef::new(Field::Status).string_len(20).not_null().default("active"))
                    .col(ColumnDef::new(Field::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(Field::Config).json_binary().not_null().default("{}"))
                    .col(
                        ColumnDef::new(Field::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Keys are the property names of payloads; unique per category
        manager
            .create_index(
                Index::create()
                    .name("idx_field_category_id_key")
                    .table(Field::Table)
                    .col(Field::CategoryId)
                    .col(Field::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_field_category_id")
                    .from(Field::Table, Field::CategoryId)
                    .to(Category::Table, Category::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LookupValue::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LookupValue::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(LookupValue::FieldId).string_len(32).not_null())
                    .col(ColumnDef::new(LookupValue::Name).string_len(128).not_null())
                    .col(ColumnDef::new(LookupValue::Symbol).string_len(256))
                    .col(
                        ColumnDef::new(LookupValue::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(LookupValue::Order).integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lookup_value_field_id")
                    .table(LookupValue::Table)
                    .col(LookupValue::FieldId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_lookup_value_field_id")
                    .from(LookupValue::Table, LookupValue::FieldId)
                    .to(Field::Table, Field::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LookupValue::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Field::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Category::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
    ProjectId,
    Name,
    Description,
    Status,
    DefaultStatus,
    Order,
    DisplayFieldId,
    CreatorId,
    CreatedAt,
}

#[derive(Iden)]
enum Field {
    Table,
    Id,
    CategoryId,
    Key,
    Name,
    Description,
    Required,
    Order,
    Status,
    Kind,
    Config,
    CreatedAt,
}

#[derive(Iden)]
enum LookupValue {
    Table,
    Id,
    FieldId,
    Name,
    Symbol,
    Status,
    Order,
}

#[derive(Iden)]
enum Project {
    Table,
    Id,
}
