//! Database migrations for the Signalen API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_08_20_000001_create_reference_tables;
mod m2026_08_20_000002_create_signals;
mod m2026_08_20_000003_create_signal_revisions;
mod m2026_08_20_000004_create_assignments;
mod m2026_08_20_000005_create_attachments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_08_20_000001_create_reference_tables::Migration),
            Box::new(m2026_08_20_000002_create_signals::Migration),
            Box::new(m2026_08_20_000003_create_signal_revisions::Migration),
            Box::new(m2026_08_20_000004_create_assignments::Migration),
            Box::new(m2026_08_20_000005_create_attachments::Migration),
        ]
    }
}
