//! Bridge core between the mobility simulator and the propagation engine.
//!
//! Holds the latest known entity poses, mirrors them into the engine's scene,
//! and answers link-metric queries from a per-pair cache that is filled by
//! whole-scene solves and discarded whenever an entity moves far enough.
//!
//! ## Module Organization
//!
//! - `types`: Entity ids, poses and cached path data
//! - `pose_ledger`: Reported vs committed poses and movement thresholds
//! - `synchronizer`: Pushes committed poses and endpoints into the engine
//! - `matcher`: Nearest-entity lookup for raw path endpoints
//! - `ray_cache`: Pair cache and the solve / match / group pipeline
//! - `resolver`: Path loss, delay and line-of-sight queries
//! - `signal_calculations`: Reductions from path lists to scalar metrics
//! - `context`: The owning state passed to every request handler

pub mod context;
pub mod matcher;
pub mod pose_ledger;
pub mod ray_cache;
pub mod resolver;
pub mod signal_calculations;
pub mod synchronizer;
pub mod types;

pub use context::BridgeContext;
pub use resolver::LosReport;
pub use types::{EntityId, Pose};
