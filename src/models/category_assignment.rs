//! CategoryAssignment entity model
//!
//! One row per category (re)classification of a signal, append-only. The
//! handling message of the category is snapshotted at assignment time so
//! later edits to the category do not rewrite history or sent mail.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[schema(as = CategoryAssignment)]
#[sea_orm(table_name = "category_assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning signal
    pub signal_id: i64,

    /// Assigned category
    pub category_id: i64,

    /// Handling message of the category at assignment time
    pub stored_handling_message: Option<String>,

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
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::signal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Signal.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
