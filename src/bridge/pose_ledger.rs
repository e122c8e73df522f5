//! Reported and committed poses per entity.
//!
//! Every location update is recorded as the entity's *reported* pose. The
//! *committed* pose, the one mirrored into the engine's scene, only follows
//! when the reported pose has drifted far enough from it: by at least the
//! position threshold (Euclidean) or the angle threshold (shortest angular
//! distance). An entity seen for the first time is always committed.

use log::debug;
use std::collections::BTreeMap;

use super::types::{EntityId, Pose};

pub struct PoseLedger {
    position_threshold: f64,
    angle_threshold: f64,
    reported: BTreeMap<EntityId, Pose>,
    committed: BTreeMap<EntityId, Pose>,
}

impl PoseLedger {
    pub fn new(position_threshold: f64, angle_threshold: f64) -> Self {
        Self {
            position_threshold,
            angle_threshold,
            reported: BTreeMap::new(),
            committed: BTreeMap::new(),
        }
    }

    /// Record a reported pose and commit it if it crosses a threshold.
    ///
    /// # Returns
    ///
    /// `true` if the committed pose changed, meaning the scene must be
    /// synchronized and every cached result is stale.
    pub fn update(&mut self, id: EntityId, pose: Pose) -> bool {
        self.reported.insert(id, pose);

        let changed = match self.committed.get(&id) {
            Some(old) => {
                let moved = old.position.distance(&pose.position);
                let turned = angular_distance(old.heading, pose.heading);
                let changed = moved >= self.position_threshold || turned >= self.angle_threshold;
                if changed {
                    debug!("Update needed for entity {}: moved {:.3} m, turned {:.3} deg", id, moved, turned);
                }
                changed
            }
            None => {
                debug!("First update ever for entity {}, forcing commit", id);
                true
            }
        };

        if changed {
            self.committed.insert(id, pose);
        }
        changed
    }

    pub fn reported(&self, id: EntityId) -> Option<&Pose> {
        self.reported.get(&id)
    }

    pub fn committed(&self, id: EntityId) -> Option<&Pose> {
        self.committed.get(&id)
    }

    /// Committed poses of every known entity, ordered by id.
    pub fn committed_poses(&self) -> impl Iterator<Item = (EntityId, &Pose)> {
        self.committed.iter().map(|(id, pose)| (*id, pose))
    }

    /// Force every committed pose to the latest reported value.
    ///
    /// Bypasses the thresholds; used when matching has to be retried against
    /// the freshest positions.
    pub fn commit_all_reported(&mut self) {
        for (id, pose) in &self.reported {
            self.committed.insert(*id, *pose);
        }
    }
}

/// Shortest angular distance between two headings, in degrees (0..=180).
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}
