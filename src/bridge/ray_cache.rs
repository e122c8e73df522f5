//! Per-pair memo of solved propagation paths.
//!
//! Entries are keyed by the ordered (source, target) entity pair and created
//! lazily from the output of a whole-scene solve. Any committed pose change
//! discards the entire cache, since moved geometry can affect every path.
//!
//! On a miss the bridge:
//! 1. Ensures every known entity has its transmit/receive endpoints
//! 2. Solves the whole scene once
//! 3. Resolves each raw path's endpoint indices to coordinates
//! 4. Matches both coordinates to the nearest entity antenna
//! 5. Groups matched paths per ordered pair and stores every group
//!
//! If the requested pair is still missing, positions are refreshed from the
//! latest reports and the same solve output is matched again, without a second
//! solver run.

use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::time::Instant;

use super::context::BridgeContext;
use super::matcher::match_endpoints;
use super::types::{EntityId, MatchedPath, RayCacheEntry};
use crate::engine::{EngineError, SceneEngine, SolveOutput, Vec3};

type PairKey = (EntityId, EntityId);

#[derive(Default)]
pub struct RayCache {
    entries: HashMap<PairKey, RayCacheEntry>,
    clears: u64,
}

impl RayCache {
    pub fn get(&self, source: EntityId, target: EntityId) -> Option<&RayCacheEntry> {
        self.entries.get(&(source, target))
    }

    pub fn contains(&self, source: EntityId, target: EntityId) -> bool {
        self.entries.contains_key(&(source, target))
    }

    pub fn insert(&mut self, source: EntityId, target: EntityId, entry: RayCacheEntry) {
        self.entries.insert((source, target), entry);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.clears += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of times the cache has been discarded.
    pub fn clear_count(&self) -> u64 {
        self.clears
    }
}

/// Turn raw solve output into path candidates with endpoint coordinates.
///
/// Paths whose indices do not fit the reported endpoint arrays are logged and
/// skipped; the rest are kept.
pub fn resolve_candidates(output: &SolveOutput) -> Vec<MatchedPath> {
    let mut candidates = Vec::with_capacity(output.paths.len());
    for (idx, path) in output.paths.iter().enumerate() {
        let (Some(source), Some(target)) = (output.sources.get(path.source), output.targets.get(path.target)) else {
            error!(
                "Path {} references source {} / target {} outside the solve output ({} sources, {} targets), skipping",
                idx,
                path.source,
                path.target,
                output.sources.len(),
                output.targets.len()
            );
            continue;
        };
        candidates.push(MatchedPath {
            source: *source,
            target: *target,
            coefficient: path.coefficient,
            delay: path.delay,
            interactions: path.interactions.clone(),
        });
    }
    candidates
}

/// Match candidates to entities and aggregate them per ordered pair.
///
/// Candidates with an unmatched endpoint are dropped with a warning. Paths
/// from an entity to itself are never stored.
pub fn group_paths(candidates: &[MatchedPath], antennas: &[(EntityId, Vec3)], tolerance: f64) -> HashMap<PairKey, RayCacheEntry> {
    let sources: Vec<Vec3> = candidates.iter().map(|c| c.source).collect();
    let targets: Vec<Vec3> = candidates.iter().map(|c| c.target).collect();
    let source_ids = match_endpoints(antennas, &sources, tolerance);
    let target_ids = match_endpoints(antennas, &targets, tolerance);

    let mut groups: HashMap<PairKey, RayCacheEntry> = HashMap::new();
    for (idx, candidate) in candidates.iter().enumerate() {
        match (source_ids[idx], target_ids[idx]) {
            (Some(source), Some(target)) => {
                if source != target {
                    groups.entry((source, target)).or_default().push(candidate);
                }
            }
            (None, _) => warn!("No entity within tolerance for source of path {} at {:?}", idx, candidate.source),
            (_, None) => warn!("No entity within tolerance for target of path {} at {:?}", idx, candidate.target),
        }
    }
    groups
}

impl<E: SceneEngine> BridgeContext<E> {
    /// Cached entry for the ordered pair, solving the scene on a miss.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the pair cannot be matched even after the retry, or when
    /// `source == target`. Solver failures are returned as errors.
    pub fn get_or_compute(&mut self, source: EntityId, target: EntityId) -> Result<Option<&RayCacheEntry>, EngineError> {
        if source == target {
            debug!("Paths from entity {} to itself are never computed", source);
            return Ok(None);
        }
        if !self.cache.contains(source, target) {
            debug!("Rays for {}-{} not computed yet", source, target);
            self.compute_all(source, target)?;
        }
        Ok(self.cache.get(source, target))
    }

    fn compute_all(&mut self, source: EntityId, target: EntityId) -> Result<(), EngineError> {
        let started = Instant::now();
        let committed: Vec<_> = self.ledger.committed_poses().map(|(id, pose)| (id, *pose)).collect();
        for (id, pose) in &committed {
            self.synchronizer.ensure_endpoints(&mut self.engine, *id, pose)?;
        }

        let output = self.engine.solve(&self.solver_params)?;
        if self.time_checker {
            info!("Ray tracing took: {:.3} ms", started.elapsed().as_secs_f64() * 1000.0);
        }

        let started = Instant::now();
        let candidates = resolve_candidates(&output);
        let groups = group_paths(&candidates, &self.antenna_positions(), self.match_tolerance);
        if self.time_checker {
            info!("Matching rays to entities took: {:.3} ms", started.elapsed().as_secs_f64() * 1000.0);
        }
        debug!("Solve produced {} paths, {} matched pairs", output.paths.len(), groups.len());
        for ((src, tgt), entry) in groups {
            debug!("Cached {} paths for {}-{}", entry.len(), src, tgt);
            self.cache.insert(src, tgt, entry);
        }

        if self.cache.contains(source, target) {
            return Ok(());
        }

        warn!("Pair {}-{} unmatched after solve, refreshing positions and matching again", source, target);
        let started = Instant::now();
        self.ledger.commit_all_reported();
        let refreshed: Vec<_> = self.ledger.committed_poses().map(|(id, pose)| (id, *pose)).collect();
        for (id, pose) in &refreshed {
            self.synchronizer.relocate(&mut self.engine, *id, pose)?;
        }

        let mut groups = group_paths(&candidates, &self.antenna_positions(), self.match_tolerance);
        if self.time_checker {
            info!("Matching rays to entities (second pass) took: {:.3} ms", started.elapsed().as_secs_f64() * 1000.0);
        }
        match groups.remove(&(source, target)) {
            Some(entry) => self.cache.insert(source, target, entry),
            None => warn!("No paths found for {}-{}", source, target),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::types::Pose;
    use crate::config::BridgeConfig;
    use crate::engine::scripted::ScriptedEngine;
    use crate::engine::{InteractionKind, RawPath};
    use num_complex::Complex64;

    const ANTENNA_Z: f64 = 1.5;

    fn pose(x: f64, y: f64) -> Pose {
        Pose {
            position: Vec3::new(x, y, 0.0),
            heading: 0.0,
            velocity: None,
        }
    }

    fn raw(source: usize, target: usize, re: f64, delay: f64, interactions: Vec<InteractionKind>) -> RawPath {
        RawPath {
            source,
            target,
            coefficient: Complex64::new(re, 0.0),
            delay,
            interactions,
        }
    }

    /// Entities 1 at the origin and 2 at (100, 0); two paths 1→2.
    fn two_entity_context() -> BridgeContext<ScriptedEngine> {
        let mut engine = ScriptedEngine::new().with_object("car_1").with_object("car_2");
        engine.output = SolveOutput {
            sources: vec![Vec3::new(0.0, 0.0, ANTENNA_Z), Vec3::new(100.0, 0.0, ANTENNA_Z)],
            targets: vec![Vec3::new(0.0, 0.0, ANTENNA_Z), Vec3::new(100.0, 0.0, ANTENNA_Z)],
            paths: vec![
                raw(0, 1, 0.01, 1e-7, vec![InteractionKind::None]),
                raw(0, 1, 0.02, 2e-7, vec![InteractionKind::Specular]),
            ],
        };
        let mut ctx = BridgeContext::new(engine, &BridgeConfig::default());
        ctx.update_pose(EntityId(1), pose(0.0, 0.0));
        ctx.update_pose(EntityId(2), pose(100.0, 0.0));
        ctx
    }

    #[test]
    fn miss_solves_once_and_caches_the_pair() {
        let mut ctx = two_entity_context();

        let entry = ctx.get_or_compute(EntityId(1), EntityId(2)).unwrap().unwrap().clone();
        assert_eq!(entry.coefficients, vec![Complex64::new(0.01, 0.0), Complex64::new(0.02, 0.0)]);
        assert_eq!(entry.delays, vec![1e-7, 2e-7]);
        assert_eq!(entry.los, vec![true, false]);
        assert_eq!(ctx.engine().solve_calls, 1);

        ctx.get_or_compute(EntityId(1), EntityId(2)).unwrap();
        assert_eq!(ctx.engine().solve_calls, 1);
    }

    #[test]
    fn endpoints_exist_before_solving() {
        let mut ctx = two_entity_context();
        ctx.get_or_compute(EntityId(1), EntityId(2)).unwrap();

        let endpoint = ctx.engine().endpoints.get("car_2_tx_antenna").unwrap();
        assert_eq!(endpoint.position, Vec3::new(100.0, 0.0, ANTENNA_Z));
        assert_eq!(ctx.engine().endpoints.len(), 4);
        assert_eq!(ctx.engine().last_params.as_ref().map(|p| p.max_depth), Some(5));
    }

    #[test]
    fn qualifying_move_clears_the_whole_cache_once() {
        let mut ctx = two_entity_context();
        ctx.engine.output.paths.push(raw(1, 0, 0.03, 1e-7, vec![]));
        ctx.get_or_compute(EntityId(1), EntityId(2)).unwrap();
        assert!(ctx.cache().contains(EntityId(1), EntityId(2)));
        assert!(ctx.cache().contains(EntityId(2), EntityId(1)));
        assert_eq!(ctx.engine().solve_calls, 1);
        let clears = ctx.cache().clear_count();

        // Only entity 1 moves, yet the pair cached for 2→1 goes too
        assert!(ctx.update_pose(EntityId(1), pose(0.0, 3.0)));
        assert!(ctx.cache().is_empty());
        assert!(!ctx.cache().contains(EntityId(1), EntityId(2)));
        assert!(!ctx.cache().contains(EntityId(2), EntityId(1)));
        assert_eq!(ctx.cache().clear_count(), clears + 1);
    }

    #[test]
    fn sub_threshold_move_keeps_cache() {
        let mut ctx = two_entity_context();
        ctx.get_or_compute(EntityId(1), EntityId(2)).unwrap();
        let clears = ctx.cache().clear_count();

        assert!(!ctx.update_pose(EntityId(1), pose(0.0, 3.0 - 1e-6)));
        assert_eq!(ctx.cache().clear_count(), clears);
        assert_eq!(ctx.cache().len(), 1);

        ctx.get_or_compute(EntityId(1), EntityId(2)).unwrap();
        assert_eq!(ctx.engine().solve_calls, 1);
    }

    #[test]
    fn unmatched_pair_retries_matching_without_a_second_solve() {
        let mut config = BridgeConfig::default();
        config.match_tolerance = Some(1.0);
        let mut engine = ScriptedEngine::new().with_object("car_1").with_object("car_2");
        // The solver already sees entity 2 at its latest reported position
        engine.output = SolveOutput {
            sources: vec![Vec3::new(0.0, 0.0, ANTENNA_Z)],
            targets: vec![Vec3::new(102.0, 0.0, ANTENNA_Z)],
            paths: vec![raw(0, 0, 0.05, 3e-7, vec![])],
        };
        let mut ctx = BridgeContext::new(engine, &config);
        ctx.update_pose(EntityId(1), pose(0.0, 0.0));
        ctx.update_pose(EntityId(2), pose(100.0, 0.0));
        assert!(!ctx.update_pose(EntityId(2), pose(102.0, 0.0)));

        let entry = ctx.get_or_compute(EntityId(1), EntityId(2)).unwrap().cloned();
        assert_eq!(entry.map(|e| e.delays), Some(vec![3e-7]));
        assert_eq!(ctx.engine().solve_calls, 1);
        assert_eq!(ctx.ledger().committed(EntityId(2)).map(|p| p.position.x), Some(102.0));
        assert_eq!(ctx.engine().objects["car_2"].position.x, 102.0);
    }

    #[test]
    fn pair_absent_after_retry_yields_none() {
        let mut ctx = two_entity_context();
        assert!(ctx.get_or_compute(EntityId(2), EntityId(1)).unwrap().is_none());
        assert_eq!(ctx.engine().solve_calls, 1);
        // The solve still populated the pair that did match
        assert!(ctx.cache().contains(EntityId(1), EntityId(2)));
    }

    #[test]
    fn self_pair_never_solves() {
        let mut ctx = two_entity_context();
        assert!(ctx.get_or_compute(EntityId(1), EntityId(1)).unwrap().is_none());
        assert_eq!(ctx.engine().solve_calls, 0);
    }

    #[test]
    fn solver_failure_propagates() {
        let mut ctx = two_entity_context();
        ctx.engine.fail_solve = true;
        assert!(matches!(ctx.get_or_compute(EntityId(1), EntityId(2)), Err(EngineError::Solver(_))));
    }

    #[test]
    fn malformed_paths_are_skipped() {
        let output = SolveOutput {
            sources: vec![Vec3::ZERO],
            targets: vec![Vec3::ZERO],
            paths: vec![raw(0, 0, 0.1, 1e-7, vec![]), raw(3, 0, 0.1, 1e-7, vec![]), raw(0, 9, 0.1, 1e-7, vec![])],
        };
        assert_eq!(resolve_candidates(&output).len(), 1);
    }

    #[test]
    fn grouping_drops_unmatched_and_self_paths() {
        let antennas = vec![(EntityId(1), Vec3::new(0.0, 0.0, 0.0)), (EntityId(2), Vec3::new(50.0, 0.0, 0.0))];
        let candidate = |source: Vec3, target: Vec3| MatchedPath {
            source,
            target,
            coefficient: Complex64::new(0.1, 0.0),
            delay: 1e-7,
            interactions: vec![],
        };
        let candidates = vec![
            candidate(Vec3::new(0.5, 0.0, 0.0), Vec3::new(49.5, 0.0, 0.0)),
            candidate(Vec3::new(25.0, 0.0, 0.0), Vec3::new(49.5, 0.0, 0.0)),
            candidate(Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 0.5, 0.0)),
            candidate(Vec3::new(50.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.0)),
        ];

        let groups = group_paths(&candidates, &antennas, 3.0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&(EntityId(1), EntityId(2))].len(), 1);
        assert_eq!(groups[&(EntityId(2), EntityId(1))].len(), 1);
    }
}
