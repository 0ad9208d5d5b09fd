//! Migration to create the versioned sub-entity tables.
//!
//! Locations, statuses, category assignments, reporters, priorities, types
//! and notes are append-only: a mutation inserts a new row and repoints the
//! owning signal, existing rows are never updated or deleted. Together,
//! ordered by created_at, these rows are the history of a signal.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Locations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Locations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Locations::SignalId).big_integer().not_null())
                    .col(ColumnDef::new(Locations::Lon).double().not_null())
                    .col(ColumnDef::new(Locations::Lat).double().not_null())
                    .col(ColumnDef::new(Locations::Address).json_binary().null())
                    .col(ColumnDef::new(Locations::Stadsdeel).text().null())
                    .col(ColumnDef::new(Locations::AreaTypeCode).text().null())
                    .col(ColumnDef::new(Locations::AreaCode).text().null())
                    .col(ColumnDef::new(Locations::AreaName).text().null())
                    .col(ColumnDef::new(Locations::CreatedBy).text().null())
                    .col(
                        ColumnDef::new(Locations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_locations_signal_id")
                            .from(Locations::Table, Locations::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Statuses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Statuses::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Statuses::SignalId).big_integer().not_null())
                    .col(ColumnDef::new(Statuses::State).text().not_null())
                    .col(ColumnDef::new(Statuses::Text).text().null())
                    .col(
                        ColumnDef::new(Statuses::SendEmail)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Statuses::TargetApi).text().null())
                    .col(ColumnDef::new(Statuses::EmailOverride).text().null())
                    .col(ColumnDef::new(Statuses::CreatedBy).text().null())
                    .col(
                        ColumnDef::new(Statuses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_statuses_signal_id")
                            .from(Statuses::Table, Statuses::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The creation-mail guard counts `reported` rows per signal.
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_statuses_signal_state ON statuses (signal_id, state)"
                    .to_string(),
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CategoryAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CategoryAssignments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CategoryAssignments::SignalId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CategoryAssignments::CategoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CategoryAssignments::StoredHandlingMessage).text().null())
                    .col(ColumnDef::new(CategoryAssignments::CreatedBy).text().null())
                    .col(
                        ColumnDef::new(CategoryAssignments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_assignments_signal_id")
                            .from(CategoryAssignments::Table, CategoryAssignments::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_assignments_category_id")
                            .from(CategoryAssignments::Table, CategoryAssignments::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reporters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reporters::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reporters::SignalId).big_integer().not_null())
                    .col(ColumnDef::new(Reporters::Email).text().null())
                    .col(ColumnDef::new(Reporters::Phone).text().null())
                    .col(
                        ColumnDef::new(Reporters::SharingAllowed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Reporters::CreatedBy).text().null())
                    .col(
                        ColumnDef::new(Reporters::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reporters_signal_id")
                            .from(Reporters::Table, Reporters::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Priorities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Priorities::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Priorities::SignalId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Priorities::Priority)
                            .text()
                            .not_null()
                            .default("normal"),
                    )
                    .col(ColumnDef::new(Priorities::CreatedBy).text().null())
                    .col(
                        ColumnDef::new(Priorities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_priorities_signal_id")
                            .from(Priorities::Table, Priorities::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Types::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Types::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Types::SignalId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Types::Name)
                            .text()
                            .not_null()
                            .default("SIG"),
                    )
                    .col(ColumnDef::new(Types::CreatedBy).text().null())
                    .col(
                        ColumnDef::new(Types::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_types_signal_id")
                            .from(Types::Table, Types::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notes::SignalId).big_integer().not_null())
                    .col(ColumnDef::new(Notes::Text).text().not_null())
                    .col(ColumnDef::new(Notes::CreatedBy).text().null())
                    .col(
                        ColumnDef::new(Notes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notes_signal_id")
                            .from(Notes::Table, Notes::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Table::drop().table(Notes::Table).to_owned(),
            Table::drop().table(Types::Table).to_owned(),
            Table::drop().table(Priorities::Table).to_owned(),
            Table::drop().table(Reporters::Table).to_owned(),
            Table::drop().table(CategoryAssignments::Table).to_owned(),
            Table::drop().table(Statuses::Table).to_owned(),
            Table::drop().table(Locations::Table).to_owned(),
        ] {
            manager.drop_table(table).await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Signals {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Locations {
    Table,
    Id,
    SignalId,
    Lon,
    Lat,
    Address,
    Stadsdeel,
    AreaTypeCode,
    AreaCode,
    AreaName,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Statuses {
    Table,
    Id,
    SignalId,
    State,
    Text,
    SendEmail,
    TargetApi,
    EmailOverride,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CategoryAssignments {
    Table,
    Id,
    SignalId,
    CategoryId,
    StoredHandlingMessage,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Reporters {
    Table,
    Id,
    SignalId,
    Email,
    Phone,
    SharingAllowed,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Priorities {
    Table,
    Id,
    SignalId,
    Priority,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Types {
    Table,
    Id,
    SignalId,
    Name,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Notes {
    Table,
    Id,
    SignalId,
    Text,
    CreatedBy,
    CreatedAt,
}
