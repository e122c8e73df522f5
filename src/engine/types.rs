//! Data exchanged with a propagation engine.
//!
//! Contains:
//! - 3-D vector math used for positions, orientations and velocities
//! - Scene object and endpoint records
//! - Solver parameters and the raw solve output

use num_complex::Complex64;
use serde::Deserialize;
use std::ops::{Add, Sub};

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Simple 3-D vector in scene coordinates (meters).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance (avoids a sqrt when only comparing).
    pub fn distance2(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        self.distance2(other).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

/// Mutable state of a named body in the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectState {
    pub position: Vec3,
    /// Euler angles (yaw, pitch, roll) in radians.
    pub orientation: Vec3,
    pub velocity: Vec3,
}

/// Which side of a link an endpoint serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    Transmitter,
    Receiver,
}

/// A transmit or receive antenna placed in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub name: String,
    pub role: EndpointRole,
    pub position: Vec3,
    pub orientation: Vec3,
}

/// Interaction a path undergoes at one bounce.
///
/// `None` marks an unused depth slot in a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    None,
    Specular,
    Diffuse,
    Refraction,
}

/// Parameters for a single solve over the whole scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    pub max_depth: u32,
    pub max_num_paths_per_src: usize,
    pub samples_per_src: usize,
    pub los: bool,
    pub specular_reflection: bool,
    pub diffuse_reflection: bool,
    pub refraction: bool,
    pub synthetic_array: bool,
    pub seed: u64,
}

/// One propagation path as returned by the engine.
///
/// `source` and `target` index into [`SolveOutput::sources`] and
/// [`SolveOutput::targets`]. The engine does not guarantee they are in range.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPath {
    pub source: usize,
    pub target: usize,
    pub coefficient: Complex64,
    /// Propagation delay in seconds.
    pub delay: f64,
    pub interactions: Vec<InteractionKind>,
}

/// Flat result of one solve: raw endpoint coordinates plus every path found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveOutput {
    pub sources: Vec<Vec3>,
    pub targets: Vec<Vec3>,
    pub paths: Vec<RawPath>,
}
