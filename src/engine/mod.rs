//! Propagation engine boundary.
//!
//! The bridge never computes propagation itself. It drives an engine that owns
//! the scene graph through the narrow [`SceneEngine`] interface: look up and
//! mutate named bodies, add and remove transmit/receive endpoints, and run one
//! solve over the whole scene.
//!
//! ## Module Organization
//!
//! - `types`: Vectors, endpoints, solver parameters and raw solve output
//! - `scene`: JSON scene loading and validation
//! - `geometry`: Obstacle footprint intersection tests
//! - `geometric`: Built-in reference engine used by the binary

pub mod geometric;
pub mod geometry;
pub mod scene;
pub mod types;

#[cfg(test)]
pub mod scripted;

pub use types::{Endpoint, EndpointRole, InteractionKind, ObjectState, RawPath, SolveOutput, SolverParams, Vec3};

use scene::SceneLoadError;

/// Error raised by an engine operation.
#[derive(Debug)]
pub enum EngineError {
    /// The scene could not be loaded.
    Scene(SceneLoadError),
    /// An endpoint with the same name already exists.
    DuplicateEndpoint(String),
    /// The solver failed; the scene state is unknown afterwards.
    Solver(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Scene(err) => write!(f, "Scene error: {}", err),
            EngineError::DuplicateEndpoint(name) => write!(f, "Endpoint {} already exists", name),
            EngineError::Solver(msg) => write!(f, "Solver failed: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Scene(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SceneLoadError> for EngineError {
    fn from(err: SceneLoadError) -> Self {
        EngineError::Scene(err)
    }
}

/// Scene graph plus solver, as consumed by the bridge.
///
/// The engine does not support moving an endpoint in place; callers remove it
/// and add a new one at the new position.
pub trait SceneEngine {
    /// Mutable access to a named body, `None` if the scene has no such object.
    fn object_mut(&mut self, name: &str) -> Option<&mut ObjectState>;

    /// Look up an endpoint by name.
    fn endpoint(&self, name: &str) -> Option<&Endpoint>;

    /// Add a new endpoint. Fails if the name is already taken.
    fn add_endpoint(&mut self, endpoint: Endpoint) -> Result<(), EngineError>;

    /// Remove an endpoint, returning whether it existed.
    fn remove_endpoint(&mut self, name: &str) -> bool;

    /// Run one solve over every endpoint currently in the scene.
    fn solve(&mut self, params: &SolverParams) -> Result<SolveOutput, EngineError>;
}
