//! Area lookup collaborator.
//!
//! Exposes "find the smallest enclosing polygon of a given type for a
//! point". Used by the actions API to derive borough/area fields from a
//! location's geometry. Treated as fallible and slow: lookup failures are
//! logged by the caller and leave caller-provided values untouched.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::models::area;

/// A matched area, as far as location derivation cares.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaMatch {
    pub code: String,
    pub name: String,
}

#[async_trait]
pub trait AreaLookup: Send + Sync {
    /// Smallest polygon of `area_type` containing (`lon`, `lat`), if any.
    async fn find_enclosing(
        &self,
        area_type: &str,
        lon: f64,
        lat: f64,
    ) -> anyhow::Result<Option<AreaMatch>>;
}

/// Area lookup backed by the `areas` reference table.
pub struct DbAreaLookup {
    db: DatabaseConnection,
}

impl DbAreaLookup {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AreaLookup for DbAreaLookup {
    async fn find_enclosing(
        &self,
        area_type: &str,
        lon: f64,
        lat: f64,
    ) -> anyhow::Result<Option<AreaMatch>> {
        let candidates = area::Entity::find()
            .filter(area::Column::AreaType.eq(area_type))
            .all(&self.db)
            .await?;

        let mut best: Option<(f64, AreaMatch)> = None;
        for candidate in candidates {
            let Some(ring) = exterior_ring(&candidate.geometry) else {
                tracing::warn!(area_id = candidate.id, "area has malformed geometry; skipping");
                continue;
            };
            if !contains_point(&ring, lon, lat) {
                continue;
            }
            // Smallest polygon wins; ring area is a good enough proxy.
            let size = ring_area(&ring);
            if best.as_ref().is_none_or(|(best_size, _)| size < *best_size) {
                best = Some((
                    size,
                    AreaMatch {
                        code: candidate.code,
                        name: candidate.name,
                    },
                ));
            }
        }
        Ok(best.map(|(_, area)| area))
    }
}

/// Exterior ring of a GeoJSON polygon coordinates value: [[[lon, lat], ...]].
fn exterior_ring(geometry: &serde_json::Value) -> Option<Vec<(f64, f64)>> {
    let ring = geometry.as_array()?.first()?.as_array()?;
    let mut points = Vec::with_capacity(ring.len());
    for pair in ring {
        let pair = pair.as_array()?;
        points.push((pair.first()?.as_f64()?, pair.get(1)?.as_f64()?));
    }
    (points.len() >= 3).then_some(points)
}

/// Ray casting point-in-polygon test against the exterior ring.
fn contains_point(ring: &[(f64, f64)], lon: f64, lat: f64) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if ((yi > lat) != (yj > lat))
            && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Shoelace area of the ring (absolute value, planar approximation).
fn ring_area(ring: &[(f64, f64)]) -> f64 {
    let mut doubled = 0.0;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        doubled += (xj + xi) * (yj - yi);
        j = i;
    }
    (doubled / 2.0).abs()
}

/// Lookup that never matches; used when no area data is loaded and in tests.
pub struct NoopAreaLookup;

#[async_trait]
impl AreaLookup for NoopAreaLookup {
    async fn find_enclosing(
        &self,
        _area_type: &str,
        _lon: f64,
        _lat: f64,
    ) -> anyhow::Result<Option<AreaMatch>> {
        Ok(None)
    }
}
