//! SignalDepartments entity model
//!
//! One row per department-relation version of a signal, append-only. The
//! same table backs both relation kinds: a directing relation names the
//! departments steering a parent signal, a routing relation names the
//! departments a signal was routed to for handling.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use utoipa::ToSchema;
use serde_json::Value as JsonValue;

pub const REL_DIRECTING: &str = "directing";
pub const REL_ROUTING: &str = "routing";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[schema(as = SignalDepartments)]
#[sea_orm(table_name = "signal_departments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning signal
    pub signal_id: i64,

    /// 'directing' or 'routing'
    pub relation_type: String,

    /// JSON array of department ids; the set is immutable per row
    #[sea_orm(column_type = "JsonBinary")]
    pub department_ids: JsonValue,

    pub created_by: Option<String>,

    pub created_at: DateTime<FixedOffset>,
}

impl Model {
    /// Department ids in this relation, in insertion order.
    pub fn department_ids(&self) -> Vec<i64> {
        self.department_ids
            .as_array()
            .map(|ids| ids.iter().filter_map(|v| v.as_i64()).collect())
            .unwrap_or_default()
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
