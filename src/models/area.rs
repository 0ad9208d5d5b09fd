//! Area entity model
//!
//! Reference data for the area lookup: typed polygons (boroughs, districts)
//! used to derive location area fields from a point geometry.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[schema(as = Area)]
#[sea_orm(table_name = "areas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Kind of area this polygon describes (e.g. "district")
    pub area_type: String,

    pub code: String,

    pub name: String,

    /// GeoJSON polygon coordinates: [[[lon, lat], ...]] exterior ring first
    #[sea_orm(column_type = "JsonBinary")]
    pub geometry: JsonValue,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
