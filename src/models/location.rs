//! Location entity model
//!
//! One row per location version of a signal, append-only. The area fields
//! are derived from the geometry via the area lookup when that feature is
//! enabled; otherwise they hold whatever the caller supplied.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use utoipa::ToSchema;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[schema(as = Location)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning signal
    pub signal_id: i64,

    /// Longitude of the reported problem
    pub lon: f64,

    /// Latitude of the reported problem
    pub lat: f64,

    /// Structured address, when geocoded
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub address: Option<JsonValue>,

    /// Borough code derived from the geometry
    pub stadsdeel: Option<String>,

    /// Area type the area fields were derived against
    pub area_type_code: Option<String>,

    /// Code of the smallest enclosing area
    pub area_code: Option<String>,

    /// Name of the smallest enclosing area
    pub area_name: Option<String>,

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
