//! Scene loading, parsing, and validation logic.
//!
//! A scene file is JSON describing the named dynamic bodies tracked by the
//! bridge and the static obstacles (building footprints with a height) used
//! by the geometric engine to decide line-of-sight and refraction.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;

use super::types::Vec3;

/// Error type for scene loading failures.
#[derive(Debug)]
pub enum SceneLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            SceneLoadError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
            SceneLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// Simple 2D point on the ground plane.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Rectangle footprint with two corners.
#[derive(Debug, Deserialize, Clone)]
pub struct RectPos {
    #[serde(rename = "top-left-position")]
    pub top_left: Point,
    #[serde(rename = "bottom-right-position")]
    pub bottom_right: Point,
}

/// Circle footprint defined by its center.
#[derive(Debug, Deserialize, Clone)]
pub struct CirclePos {
    #[serde(rename = "center_position")]
    pub center: Point,
    pub radius: f64,
}

/// Obstacles represented as tagged enum, extruded from the ground to `height`.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum Obstacle {
    #[serde(rename = "rectangle")]
    Rectangle {
        #[serde(flatten)]
        position: RectPos,
        height: f64,
    },
    #[serde(rename = "circle")]
    Circle {
        #[serde(flatten)]
        position: CirclePos,
        height: f64,
    },
}

impl Obstacle {
    pub fn height(&self) -> f64 {
        match self {
            Obstacle::Rectangle { height, .. } | Obstacle::Circle { height, .. } => *height,
        }
    }
}

/// A dynamic body the bridge may move, e.g. `car_7`.
#[derive(Debug, Deserialize, Clone)]
pub struct SceneObject {
    pub name: String,
    pub position: Vec3,
}

fn default_penetration_loss_db() -> f64 {
    10.0
}

fn default_diffuse_coefficient() -> f64 {
    0.2
}

/// Root structure representing the entire scene.
#[derive(Debug, Deserialize)]
pub struct Scene {
    /// Dynamic bodies addressable by name.
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    /// Static obstacles for line-of-sight checks.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Loss (dB) applied per obstacle a refracted path passes through.
    #[serde(default = "default_penetration_loss_db")]
    pub penetration_loss_db: f64,
    /// Amplitude scale of diffusely scattered ground paths (0..=1).
    #[serde(default = "default_diffuse_coefficient")]
    pub diffuse_coefficient: f64,
    /// Log-normal shadowing (dB) applied to each diffuse path; 0 disables it.
    #[serde(default)]
    pub diffuse_sigma_db: f64,
}

/// Load and parse a scene from a file.
pub fn load_scene(path: &str) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path))
        .map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;

    parse_scene(&data)
}

/// Parse and validate a scene from its JSON text.
pub fn parse_scene(data: &str) -> Result<Scene, SceneLoadError> {
    let scene: Scene = serde_json::from_str(data)
        .context("Invalid JSON format")
        .map_err(|e| SceneLoadError::ParseError(e.to_string()))?;

    validate_scene(&scene).map_err(SceneLoadError::ValidationError)?;

    Ok(scene)
}

/// Validate scene configuration.
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_OBJECTS: usize = 10000;

    if scene.objects.len() > MAX_OBJECTS {
        return Err(format!("Object count {} exceeds maximum of {}", scene.objects.len(), MAX_OBJECTS));
    }

    let mut names = HashSet::new();
    for object in &scene.objects {
        if object.name.is_empty() {
            return Err("Object names must not be empty".to_string());
        }
        if !names.insert(object.name.as_str()) {
            return Err(format!("Duplicate object name found: {}", object.name));
        }
        if !object.position.is_finite() {
            return Err(format!("Object {} has a non-finite position", object.name));
        }
    }

    if !(scene.penetration_loss_db >= 0.0) {
        return Err("Invalid penetration_loss_db, must be non-negative".to_string());
    }
    if !(0.0..=1.0).contains(&scene.diffuse_coefficient) {
        return Err(format!("Invalid diffuse_coefficient {}, must be within 0-1", scene.diffuse_coefficient));
    }
    if !(scene.diffuse_sigma_db >= 0.0) {
        return Err("Invalid diffuse_sigma_db, must be non-negative".to_string());
    }

    for (idx, obstacle) in scene.obstacles.iter().enumerate() {
        if !(obstacle.height() >= 0.0) {
            return Err(format!("Obstacle {} has negative height {}", idx, obstacle.height()));
        }
        match obstacle {
            Obstacle::Rectangle { position, .. } => {
                if position.top_left.x >= position.bottom_right.x || position.top_left.y >= position.bottom_right.y {
                    return Err(format!(
                        "Obstacle {} (rectangle) has invalid geometry: top-left ({}, {}) must be strictly less than bottom-right ({}, {})",
                        idx, position.top_left.x, position.top_left.y, position.bottom_right.x, position.bottom_right.y
                    ));
                }
            }
            Obstacle::Circle { position, .. } => {
                if !(position.radius > 0.0) {
                    return Err(format!("Obstacle {} (circle) has zero radius", idx));
                }
            }
        }
    }

    Ok(())
}
