//! Category entity model
//!
//! Reference data: the two-level category tree signals are classified into.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[schema(as = Category)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// URL-safe identifier
    pub slug: String,

    pub name: String,

    /// Name shown to reporters, when it differs from the internal one
    pub public_name: Option<String>,

    /// Parent category for sub-categories
    pub parent_id: Option<i64>,

    /// Default handling message snapshotted onto assignments
    pub handling_message: Option<String>,

    pub created_at: DateTime<FixedOffset>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
    #[sea_orm(has_many = "super::category_assignment::Entity")]
    CategoryAssignments,
}

impl Related<super::category_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CategoryAssignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
