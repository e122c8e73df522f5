//! Externally visible link metrics.
//!
//! Each query ensures the pair's cache entry exists, then reduces it:
//! - path loss: coherent sum of coefficients, in dB (300 when there is no gain)
//! - delay: smallest absolute path delay (1e5 when none qualifies)
//! - line-of-sight: the per-path flags, unreduced
//!
//! A query naming the sentinel entity answers with the neutral value and never
//! reaches the cache or the engine.

use log::info;
use std::time::Instant;

use super::context::BridgeContext;
use super::signal_calculations::{NO_DELAY_SECONDS, UNREACHABLE_PATH_LOSS_DB, min_delay, path_loss_db};
use super::types::EntityId;
use crate::engine::{EngineError, SceneEngine};

/// Neutral answer for sentinel queries.
const NEUTRAL_METRIC: f64 = 0.0;

/// Line-of-sight answer for a pair.
#[derive(Debug, Clone, PartialEq)]
pub enum LosReport {
    /// Sentinel query; no lookup was made.
    Neutral,
    /// One flag per cached path (empty when the pair has no entry).
    Paths(Vec<bool>),
}

fn involves_sentinel(a: EntityId, b: EntityId) -> bool {
    a.is_sentinel() || b.is_sentinel()
}

impl<E: SceneEngine> BridgeContext<E> {
    /// Path loss (dB) from `source` to `target`.
    pub fn path_loss(&mut self, source: EntityId, target: EntityId) -> Result<f64, EngineError> {
        if involves_sentinel(source, target) {
            return Ok(NEUTRAL_METRIC);
        }
        let started = Instant::now();
        let loss = match self.get_or_compute(source, target)? {
            Some(entry) => path_loss_db(&entry.coefficients),
            None => UNREACHABLE_PATH_LOSS_DB,
        };
        if self.time_checker {
            info!("Pathloss calculation took: {:.3} ms", started.elapsed().as_secs_f64() * 1000.0);
        }
        Ok(loss)
    }

    /// Minimum propagation delay (s) from `source` to `target`.
    pub fn delay(&mut self, source: EntityId, target: EntityId) -> Result<f64, EngineError> {
        if involves_sentinel(source, target) {
            return Ok(NEUTRAL_METRIC);
        }
        let started = Instant::now();
        let delay = match self.get_or_compute(source, target)? {
            Some(entry) => min_delay(&entry.delays),
            None => NO_DELAY_SECONDS,
        };
        if self.time_checker {
            info!("Delay calculation took: {:.3} ms", started.elapsed().as_secs_f64() * 1000.0);
        }
        Ok(delay)
    }

    /// Per-path line-of-sight flags from `source` to `target`.
    pub fn line_of_sight(&mut self, source: EntityId, target: EntityId) -> Result<LosReport, EngineError> {
        if involves_sentinel(source, target) {
            return Ok(LosReport::Neutral);
        }
        let started = Instant::now();
        let flags = self.get_or_compute(source, target)?.map(|entry| entry.los.clone()).unwrap_or_default();
        if self.time_checker {
            info!("LOS calculation took: {:.3} ms", started.elapsed().as_secs_f64() * 1000.0);
        }
        Ok(LosReport::Paths(flags))
    }
}
