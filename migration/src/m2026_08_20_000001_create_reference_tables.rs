//! Migration to create the reference tables.
//!
//! Creates the categories, departments and areas tables. These hold slowly
//! changing reference data that signals point into; they are seeded at
//! startup and managed outside the aggregate mutation surface.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Slug).text().not_null().unique_key())
                    .col(ColumnDef::new(Categories::Name).text().not_null())
                    .col(ColumnDef::new(Categories::PublicName).text().null())
                    .col(ColumnDef::new(Categories::ParentId).big_integer().null())
                    .col(ColumnDef::new(Categories::HandlingMessage).text().null())
                    .col(
                        ColumnDef::new(Categories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_categories_parent_id")
                            .from(Categories::Table, Categories::ParentId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Departments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Departments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Departments::Code).text().not_null().unique_key())
                    .col(ColumnDef::new(Departments::Name).text().not_null())
                    .col(
                        ColumnDef::new(Departments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Areas::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Areas::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Areas::AreaType).text().not_null())
                    .col(ColumnDef::new(Areas::Code).text().not_null())
                    .col(ColumnDef::new(Areas::Name).text().not_null())
                    // GeoJSON polygon: [[[lon, lat], ...]] exterior ring first
                    .col(ColumnDef::new(Areas::Geometry).json_binary().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_areas_area_type")
                    .table(Areas::Table)
                    .col(Areas::AreaType)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Areas::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Departments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Slug,
    Name,
    PublicName,
    ParentId,
    HandlingMessage,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Departments {
    Table,
    Id,
    Code,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Areas {
    Table,
    Id,
    AreaType,
    Code,
    Name,
    Geometry,
}
