//! Note entity model
//!
//! Free-form history entries. Written by staff through the actions API and
//! by the mail rule engine to record sent (or refused) emails.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[schema(as = Note)]
#[sea_orm(table_name = "notes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning signal
    pub signal_id: i64,

    pub text: String,

    pub created_by: Option<String>,

    pub created_at: DateTime<FixedOffset>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::signal::Entity",
        from = "Column::SignalId",
        to = "super::signal::Column::Id"
    )]
    Signal,
}

impl Related<super::signal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Signal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
