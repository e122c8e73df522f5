//! Type definitions for the bridge.
//!
//! Contains the data model shared by the ledger, cache and resolver:
//! - Entity identifiers, including the calibration sentinel
//! - Poses as reported by the mobility simulator
//! - Per-pair cached propagation results
//! - Path candidates produced by one solve

use num_complex::Complex64;

use crate::engine::{InteractionKind, Vec3};

/// Identifier of a tracked entity as used by the mobility simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Reserved "no entity" id used by calibration probes.
    pub const SENTINEL: EntityId = EntityId(0);

    pub fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }

    /// Scene object name for this entity, e.g. `car_7`.
    pub fn object_name(self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.0)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position, heading and optional velocity of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    /// Heading in degrees, clockwise from north.
    pub heading: f64,
    pub velocity: Option<Vec3>,
}

/// Aggregated propagation result for one ordered (source, target) pair.
///
/// The three vectors are parallel: index `i` describes the same path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RayCacheEntry {
    pub coefficients: Vec<Complex64>,
    pub delays: Vec<f64>,
    pub los: Vec<bool>,
}

impl RayCacheEntry {
    pub fn push(&mut self, path: &MatchedPath) {
        self.coefficients.push(path.coefficient);
        self.delays.push(path.delay);
        self.los.push(path.is_los());
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }
}

/// One path from a solve with its raw endpoint coordinates resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPath {
    pub source: Vec3,
    pub target: Vec3,
    pub coefficient: Complex64,
    pub delay: f64,
    pub interactions: Vec<InteractionKind>,
}

impl MatchedPath {
    /// A path is line-of-sight when it interacts with nothing along the way.
    pub fn is_los(&self) -> bool {
        self.interactions.iter().all(|kind| *kind == InteractionKind::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(interactions: Vec<InteractionKind>) -> MatchedPath {
        MatchedPath {
            source: Vec3::ZERO,
            target: Vec3::ZERO,
            coefficient: Complex64::new(0.1, 0.0),
            delay: 1e-7,
            interactions,
        }
    }

    #[test]
    fn sentinel_and_object_names() {
        assert!(EntityId(0).is_sentinel());
        assert!(!EntityId(3).is_sentinel());
        assert_eq!(EntityId(12).object_name("car"), "car_12");
    }

    #[test]
    fn los_requires_an_empty_trace() {
        assert!(path(vec![]).is_los());
        assert!(path(vec![InteractionKind::None, InteractionKind::None]).is_los());
        assert!(!path(vec![InteractionKind::Specular, InteractionKind::None]).is_los());
        assert!(!path(vec![InteractionKind::Refraction]).is_los());
    }

    #[test]
    fn entry_keeps_parallel_lists() {
        let mut entry = RayCacheEntry::default();
        entry.push(&path(vec![]));
        entry.push(&path(vec![InteractionKind::Diffuse]));
        assert_eq!(entry.len(), 2);
        assert_eq!(entry.delays.len(), 2);
        assert_eq!(entry.los, vec![true, false]);
    }
}
