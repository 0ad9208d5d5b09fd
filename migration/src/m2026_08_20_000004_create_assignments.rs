//! Migration to create the department-relation and user-assignment tables.
//!
//! A signal_departments row snapshots a set of departments (directing or
//! routing) assigned to a signal; a signal_users row snapshots the assigned
//! handler. Like the other sub-entities these are append-only versions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SignalDepartments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SignalDepartments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SignalDepartments::SignalId)
                            .big_integer()
                            .not_null(),
                    )
                    // 'directing' or 'routing'
                    .col(
                        ColumnDef::new(SignalDepartments::RelationType)
                            .text()
                            .not_null(),
                    )
                    // JSON array of department ids; the set is immutable per row.
                    .col(
                        ColumnDef::new(SignalDepartments::DepartmentIds)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SignalDepartments::CreatedBy).text().null())
                    .col(
                        ColumnDef::new(SignalDepartments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_signal_departments_signal_id")
                            .from(SignalDepartments::Table, SignalDepartments::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SignalUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SignalUsers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SignalUsers::SignalId).big_integer().not_null())
                    .col(ColumnDef::new(SignalUsers::UserEmail).text().null())
                    .col(ColumnDef::new(SignalUsers::CreatedBy).text().null())
                    .col(
                        ColumnDef::new(SignalUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_signal_users_signal_id")
                            .from(SignalUsers::Table, SignalUsers::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SignalUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SignalDepartments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Signals {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum SignalDepartments {
    Table,
    Id,
    SignalId,
    RelationType,
    DepartmentIds,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SignalUsers {
    Table,
    Id,
    SignalId,
    UserEmail,
    CreatedBy,
    CreatedAt,
}
