//! Migration to create the attachments table.
//!
//! Attachment rows reference stored files by storage key; the bytes live in
//! the storage backend. There is no pointer from signals to attachments, so
//! attachment creation does not need the aggregate claim.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Attachments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attachments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Attachments::SignalId).big_integer().not_null())
                    .col(ColumnDef::new(Attachments::StorageKey).text().not_null())
                    .col(ColumnDef::new(Attachments::MimeType).text().null())
                    .col(ColumnDef::new(Attachments::CreatedBy).text().null())
                    .col(
                        ColumnDef::new(Attachments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attachments_signal_id")
                            .from(Attachments::Table, Attachments::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Attachments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Signals {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Attachments {
    Table,
    Id,
    SignalId,
    StorageKey,
    MimeType,
    CreatedBy,
    CreatedAt,
}
