//! Reporter entity model
//!
//! One row per reporter version of a signal, append-only. Contact details
//! are optional: anonymous reports carry neither email nor phone, and the
//! mail rule engine treats an absent email as "send nothing".

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[schema(as = Reporter)]
#[sea_orm(table_name = "reporters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning signal
    pub signal_id: i64,

    pub email: Option<String>,

    pub phone: Option<String>,

    /// Whether the reporter consented to sharing contact details
    pub sharing_allowed: bool,

    pub created_by: Option<String>,

    pub created_at: DateTime<FixedOffset>,
}

impl Model {
    /// True when a non-empty email address is on file.
    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
    }
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
