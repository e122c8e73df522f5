//! Scripted in-memory engine for tests.
//!
//! Returns a canned solve output and records every scene mutation so tests
//! can assert how often the solver ran and what the bridge pushed.

use std::collections::{BTreeMap, HashMap};

use super::types::{Endpoint, ObjectState, SolveOutput, SolverParams, Vec3};
use super::{EngineError, SceneEngine};

#[derive(Default)]
pub struct ScriptedEngine {
    pub objects: HashMap<String, ObjectState>,
    pub endpoints: BTreeMap<String, Endpoint>,
    pub output: SolveOutput,
    pub fail_solve: bool,
    pub solve_calls: usize,
    pub removed: Vec<String>,
    pub last_params: Option<SolverParams>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body so synchronization can find it.
    pub fn with_object(mut self, name: &str) -> Self {
        self.objects.insert(
            name.to_string(),
            ObjectState {
                position: Vec3::ZERO,
                orientation: Vec3::ZERO,
                velocity: Vec3::ZERO,
            },
        );
        self
    }
}

impl SceneEngine for ScriptedEngine {
    fn object_mut(&mut self, name: &str) -> Option<&mut ObjectState> {
        self.objects.get_mut(name)
    }

    fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    fn add_endpoint(&mut self, endpoint: Endpoint) -> Result<(), EngineError> {
        if self.endpoints.contains_key(&endpoint.name) {
            return Err(EngineError::DuplicateEndpoint(endpoint.name));
        }
        self.endpoints.insert(endpoint.name.clone(), endpoint);
        Ok(())
    }

    fn remove_endpoint(&mut self, name: &str) -> bool {
        self.removed.push(name.to_string());
        self.endpoints.remove(name).is_some()
    }

    fn solve(&mut self, params: &SolverParams) -> Result<SolveOutput, EngineError> {
        self.solve_calls += 1;
        self.last_params = Some(params.clone());
        if self.fail_solve {
            return Err(EngineError::Solver("scripted failure".to_string()));
        }
        Ok(self.output.clone())
    }
}
