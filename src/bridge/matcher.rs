//! Nearest-entity matching for raw path endpoints.
//!
//! A solve reports path endpoints as bare coordinates. To attribute a path to
//! a pair of entities each coordinate is resolved to the nearest entity
//! antenna within a tolerance radius.
//!
//! The index is a uniform grid keyed by integer cell coordinates with a cell
//! edge equal to the tolerance, so every candidate within range lies in the
//! 3×3×3 block of cells around the query point. It is rebuilt from scratch for
//! every solve and never mutated afterwards.

use std::collections::HashMap;

use super::types::EntityId;
use crate::engine::Vec3;

/// Cell edge used when the tolerance is zero or not a usable number.
const MIN_CELL_SIZE: f64 = 1e-6;

type CellKey = (i64, i64, i64);

/// Static spatial index over entity antenna positions.
pub struct SpatialIndex {
    cell_size: f64,
    tolerance2: f64,
    points: Vec<(EntityId, Vec3)>,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl SpatialIndex {
    /// Build the index over `points` for queries with the given tolerance (meters).
    pub fn build(points: &[(EntityId, Vec3)], tolerance: f64) -> Self {
        let cell_size = if tolerance.is_finite() && tolerance > MIN_CELL_SIZE { tolerance } else { MIN_CELL_SIZE };
        // Non-finite positions can never be within tolerance of anything
        let mut points: Vec<(EntityId, Vec3)> = points.iter().filter(|(_, position)| position.is_finite()).copied().collect();
        // Ties resolve to the lowest id
        points.sort_by_key(|(id, _)| *id);

        let mut cells: HashMap<CellKey, Vec<usize>> = HashMap::new();
        for (idx, (_, position)) in points.iter().enumerate() {
            cells.entry(cell_of(position, cell_size)).or_default().push(idx);
        }

        Self {
            cell_size,
            tolerance2: tolerance * tolerance,
            points,
            cells,
        }
    }

    /// Nearest entity within tolerance of `query`, inclusive.
    pub fn nearest(&self, query: &Vec3) -> Option<EntityId> {
        if !query.is_finite() {
            return None;
        }
        let (cx, cy, cz) = cell_of(query, self.cell_size);
        let mut best: Option<(f64, usize)> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = (cx.saturating_add(dx), cy.saturating_add(dy), cz.saturating_add(dz));
                    let Some(bucket) = self.cells.get(&key) else {
                        continue;
                    };
                    for &idx in bucket {
                        let d2 = self.points[idx].1.distance2(query);
                        if d2.is_nan() || d2 > self.tolerance2 {
                            continue;
                        }
                        let better = match best {
                            Some((best_d2, best_idx)) => d2 < best_d2 || (d2 == best_d2 && idx < best_idx),
                            None => true,
                        };
                        if better {
                            best = Some((d2, idx));
                        }
                    }
                }
            }
        }

        best.map(|(_, idx)| self.points[idx].0)
    }
}

fn cell_of(p: &Vec3, cell_size: f64) -> CellKey {
    ((p.x / cell_size).floor() as i64, (p.y / cell_size).floor() as i64, (p.z / cell_size).floor() as i64)
}

/// Resolve each endpoint to the nearest entity within `tolerance`.
///
/// Pure function: the result is parallel to `endpoints`, `None` where no
/// entity is close enough.
pub fn match_endpoints(entities: &[(EntityId, Vec3)], endpoints: &[Vec3], tolerance: f64) -> Vec<Option<EntityId>> {
    let index = SpatialIndex::build(entities, tolerance);
    endpoints.iter().map(|p| index.nearest(p)).collect()
}
