//! Mirrors committed poses into the engine's scene graph.
//!
//! The engine cannot move a transmit/receive endpoint once placed. Whenever an
//! entity's body moves its two endpoints are removed, and they are created again
//! at `position + antenna_offset` right before the next solve.

use log::{debug, error};
use std::f64::consts::PI;

use super::types::{EntityId, Pose};
use crate::engine::{EngineError, Endpoint, EndpointRole, SceneEngine, Vec3};

pub struct SceneSynchronizer {
    object_prefix: String,
    antenna_offset: Vec3,
}

impl SceneSynchronizer {
    pub fn new(object_prefix: impl Into<String>, antenna_offset: Vec3) -> Self {
        Self {
            object_prefix: object_prefix.into(),
            antenna_offset,
        }
    }

    pub fn object_name(&self, id: EntityId) -> String {
        id.object_name(&self.object_prefix)
    }

    fn endpoint_name(&self, id: EntityId, role: EndpointRole) -> String {
        match role {
            EndpointRole::Transmitter => format!("{}_tx_antenna", self.object_name(id)),
            EndpointRole::Receiver => format!("{}_rx_antenna", self.object_name(id)),
        }
    }

    /// Where an entity's endpoints sit for a given body pose.
    pub fn antenna_position(&self, pose: &Pose) -> Vec3 {
        pose.position + self.antenna_offset
    }

    /// Push a committed pose into the scene and drop the entity's endpoints.
    ///
    /// A missing scene object is logged and skipped; the endpoints are removed
    /// regardless so they get recreated at the new pose.
    ///
    /// # Returns
    ///
    /// `true` if the body was found and updated.
    pub fn sync<E: SceneEngine + ?Sized>(&self, engine: &mut E, id: EntityId, pose: &Pose) -> bool {
        let name = self.object_name(id);
        let found = match engine.object_mut(&name) {
            Some(object) => {
                object.position = pose.position;
                object.orientation = Vec3::new(heading_to_yaw(pose.heading), 0.0, 0.0);
                object.velocity = pose.velocity.unwrap_or(Vec3::ZERO);
                debug!("Updated {} position in the scene", name);
                true
            }
            None => {
                error!("No {} in the scene, check the scene file", name);
                false
            }
        };

        self.remove_endpoints(engine, id);
        found
    }

    /// Move only the body position and place fresh endpoints next to it.
    ///
    /// Used when matching is retried against the latest reported positions.
    pub fn relocate<E: SceneEngine + ?Sized>(&self, engine: &mut E, id: EntityId, pose: &Pose) -> Result<(), EngineError> {
        let name = self.object_name(id);
        match engine.object_mut(&name) {
            Some(object) => object.position = pose.position,
            None => {
                error!("No {} in the scene for forced update, check the scene file", name);
                return Ok(());
            }
        }
        self.remove_endpoints(engine, id);
        self.ensure_endpoints(engine, id, pose)?;
        debug!("Forced update for {} and its endpoints", name);
        Ok(())
    }

    /// Create whichever of the entity's endpoints are missing.
    ///
    /// # Returns
    ///
    /// Number of endpoints created (0, 1 or 2).
    pub fn ensure_endpoints<E: SceneEngine + ?Sized>(&self, engine: &mut E, id: EntityId, pose: &Pose) -> Result<usize, EngineError> {
        let position = self.antenna_position(pose);
        let mut created = 0;
        for role in [EndpointRole::Transmitter, EndpointRole::Receiver] {
            let name = self.endpoint_name(id, role);
            if engine.endpoint(&name).is_some() {
                continue;
            }
            engine.add_endpoint(Endpoint {
                name: name.clone(),
                role,
                position,
                orientation: Vec3::ZERO,
            })?;
            debug!("Added {:?} endpoint {}", role, name);
            created += 1;
        }
        Ok(created)
    }

    fn remove_endpoints<E: SceneEngine + ?Sized>(&self, engine: &mut E, id: EntityId) {
        for role in [EndpointRole::Transmitter, EndpointRole::Receiver] {
            engine.remove_endpoint(&self.endpoint_name(id, role));
        }
    }
}

/// Convert a simulator heading (degrees, clockwise from north) to scene yaw (radians).
pub fn heading_to_yaw(heading: f64) -> f64 {
    ((360.0 - heading).rem_euclid(360.0) + 90.0) * PI / 180.0
}
