//! Migration to create the signals table.
//!
//! The signals table is the aggregate root: it carries the current pointers
//! into the append-only revision tables, the optional parent reference for
//! split/promoted signals, and the version counter used for optimistic
//! concurrency control by the actions API.

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
                    .table(Signals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Signals::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Signals::ParentId).big_integer().null())
                    .col(ColumnDef::new(Signals::Source).text().not_null().default("online"))
                    .col(ColumnDef::new(Signals::Text).text().not_null())
                    .col(ColumnDef::new(Signals::TextExtra).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Signals::IncidentDateStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Signals::IncidentDateEnd)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    // Optimistic lock counter, bumped by every aggregate mutation.
                    .col(
                        ColumnDef::new(Signals::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Signals::LocationId).big_integer().null())
                    .col(ColumnDef::new(Signals::StatusId).big_integer().null())
                    .col(ColumnDef::new(Signals::CategoryAssignmentId).big_integer().null())
                    .col(ColumnDef::new(Signals::ReporterId).big_integer().null())
                    .col(ColumnDef::new(Signals::PriorityId).big_integer().null())
                    .col(ColumnDef::new(Signals::TypeId).big_integer().null())
                    .col(
                        ColumnDef::new(Signals::DirectingDepartmentsId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Signals::RoutingDepartmentsId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Signals::UserAssignmentId).big_integer().null())
                    .col(
                        ColumnDef::new(Signals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Signals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_signals_parent_id")
                            .from(Signals::Table, Signals::ParentId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Parent/child lookups drive the max-children invariant check.
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_signals_parent_id ON signals (parent_id)"
                    .to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Signals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Signals {
    Table,
    Id,
    ParentId,
    Source,
    Text,
    TextExtra,
    IncidentDateStart,
    IncidentDateEnd,
    Version,
    LocationId,
    StatusId,
    CategoryAssignmentId,
    ReporterId,
    PriorityId,
    TypeId,
    DirectingDepartmentsId,
    RoutingDepartmentsId,
    UserAssignmentId,
    CreatedAt,
    UpdatedAt,
}
