//! The explicitly owned bridge state.
//!
//! One `BridgeContext` holds the pose ledger, the ray cache and the engine
//! handle for the whole process lifetime. The server loop passes it by mutable
//! reference into every handler; nothing else touches the engine.

use log::{debug, info};
use std::time::Instant;

use super::pose_ledger::PoseLedger;
use super::ray_cache::RayCache;
use super::synchronizer::SceneSynchronizer;
use super::types::{EntityId, Pose};
use crate::config::BridgeConfig;
use crate::engine::{SceneEngine, SolverParams, Vec3};

pub struct BridgeContext<E: SceneEngine> {
    pub(super) engine: E,
    pub(super) ledger: PoseLedger,
    pub(super) cache: RayCache,
    pub(super) synchronizer: SceneSynchronizer,
    pub(super) solver_params: SolverParams,
    pub(super) match_tolerance: f64,
    pub(super) time_checker: bool,
}

impl<E: SceneEngine> BridgeContext<E> {
    pub fn new(engine: E, config: &BridgeConfig) -> Self {
        Self {
            engine,
            ledger: PoseLedger::new(config.position_threshold, config.angle_threshold),
            cache: RayCache::default(),
            synchronizer: SceneSynchronizer::new(config.dynamic_objects_name.clone(), Vec3::from(config.antenna_displacement)),
            solver_params: config.solver_params(),
            match_tolerance: config.match_tolerance(),
            time_checker: config.time_checker,
        }
    }

    /// Record a location update for `id`.
    ///
    /// When the committed pose changes the scene object is updated, the
    /// entity's endpoints are dropped and the whole ray cache is discarded.
    ///
    /// # Returns
    ///
    /// `true` if the update crossed a threshold (or was the first one).
    pub fn update_pose(&mut self, id: EntityId, pose: Pose) -> bool {
        let started = Instant::now();
        let changed = self.ledger.update(id, pose);
        if changed {
            self.synchronizer.sync(&mut self.engine, id, &pose);
            self.cache.clear();
            debug!("Ray cache cleared after entity {} moved", id);
        }
        if self.time_checker {
            info!("Location update took: {:.3} ms", started.elapsed().as_secs_f64() * 1000.0);
        }
        changed
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn ledger(&self) -> &PoseLedger {
        &self.ledger
    }

    pub fn cache(&self) -> &RayCache {
        &self.cache
    }

    /// Antenna positions derived from every committed pose, ordered by id.
    pub(super) fn antenna_positions(&self) -> Vec<(EntityId, Vec3)> {
        self.ledger.committed_poses().map(|(id, pose)| (id, self.synchronizer.antenna_position(pose))).collect()
    }
}
