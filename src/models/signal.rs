//! Signal entity model
//!
//! The aggregate root of the domain: one reported nuisance/incident. Holds
//! the current pointers into the append-only sub-entity tables, the parent
//! reference for split/promoted signals and the optimistic lock counter the
//! actions API claims before every mutation.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use utoipa::ToSchema;

/// Signal aggregate root.
///
/// The pointer columns reference the most recent row of each sub-entity
/// kind. They are nullable only because the aggregate row is inserted before
/// its first sub-entity versions inside the create_initial transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[schema(as = Signal)]
#[sea_orm(table_name = "signals")]
pub struct Model {
    /// Unique identifier for the signal (primary key)
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Parent signal, set only for child signals (one level deep)
    pub parent_id: Option<i64>,

    /// Channel the report came in through (online, phone, ...)
    pub source: String,

    /// Free-text description of the reported problem
    pub text: String,

    /// Additional free text supplied by the reporter
    pub text_extra: String,

    /// When the reported incident started
    pub incident_date_start: DateTime<FixedOffset>,

    /// When the reported incident ended, if known
    pub incident_date_end: Option<DateTime<FixedOffset>>,

    /// Optimistic lock counter, bumped by every aggregate mutation
    pub version: i64,

    /// Current location version
    pub location_id: Option<i64>,

    /// Current status version
    pub status_id: Option<i64>,

    /// Current category assignment version
    pub category_assignment_id: Option<i64>,

    /// Current reporter version
    pub reporter_id: Option<i64>,

    /// Current priority version
    pub priority_id: Option<i64>,

    /// Current type version
    pub type_id: Option<i64>,

    /// Current directing-departments relation
    pub directing_departments_id: Option<i64>,

    /// Current routing-departments relation
    pub routing_departments_id: Option<i64>,

    /// Current user assignment
    pub user_assignment_id: Option<i64>,

    /// Timestamp when the signal was created
    pub created_at: DateTime<FixedOffset>,

    /// Timestamp when the signal was last mutated
    pub updated_at: DateTime<FixedOffset>,
}

impl Model {
    /// A child signal has a parent; it may never become a parent itself.
    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
    #[sea_orm(has_many = "super::status::Entity")]
    Statuses,
    #[sea_orm(has_many = "super::location::Entity")]
    Locations,
    #[sea_orm(has_many = "super::note::Entity")]
    Notes,
    #[sea_orm(has_many = "super::attachment::Entity")]
    Attachments,
}

impl Related<super::status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Statuses.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Locations.def()
    }
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl Related<super::attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
