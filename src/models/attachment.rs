//! Attachment entity model
//!
//! References to stored files; the bytes live in the storage backend. There
//! is no pointer from signals to attachments, which is why attachment
//! creation skips the aggregate claim.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[schema(as = Attachment)]
#[sea_orm(table_name = "attachments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning signal
    pub signal_id: i64,

    /// Key of the stored file in the storage backend
    pub storage_key: String,

    pub mime_type: Option<String>,

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
