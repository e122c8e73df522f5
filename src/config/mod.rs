//! Runtime configuration for the bridge.
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags (see [`cli::Cli`]). Every field has a default, so an
//! empty file or no file at all yields a working configuration.

pub mod cli;

use serde::Deserialize;
use std::path::Path;

use crate::engine::SolverParams;

/// Complete bridge configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Path to the JSON scene file
    pub scene: String,
    /// Carrier frequency in Hz
    pub frequency: f64,
    /// Bandwidth in Hz, reported at startup
    pub bandwidth: f64,
    /// Bind to loopback only instead of all interfaces
    pub local_machine: bool,
    pub port: u16,
    /// Minimum movement (m) that commits a new pose
    pub position_threshold: f64,
    /// Minimum heading change (deg) that commits a new pose
    pub angle_threshold: f64,
    /// Endpoint matching radius (m), defaults to the position threshold
    pub match_tolerance: Option<f64>,
    pub max_depth: u32,
    pub max_num_paths_per_src: usize,
    pub samples_per_src: usize,
    pub los: bool,
    pub specular_reflection: bool,
    pub diffuse_reflection: bool,
    pub refraction: bool,
    pub synthetic_array: bool,
    pub seed: u64,
    pub verbose: bool,
    /// Log wall time of each processing stage
    pub time_checker: bool,
    /// Compute device, `cpu` or `gpu:<n>`
    pub device: String,
    /// Scene object prefix; entity `n` is the object `<prefix>_<n>`
    pub dynamic_objects_name: String,
    /// Antenna offset from the body origin (m)
    pub antenna_displacement: [f64; 3],
    /// Kill other processes holding the UDP port before binding
    pub reclaim_port: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            scene: "scene.json".to_string(),
            frequency: 5.89e9,
            bandwidth: 10e6,
            local_machine: false,
            port: 8103,
            position_threshold: 3.0,
            angle_threshold: 90.0,
            match_tolerance: None,
            max_depth: 5,
            max_num_paths_per_src: 10_000,
            samples_per_src: 10_000,
            los: true,
            specular_reflection: true,
            diffuse_reflection: true,
            refraction: true,
            synthetic_array: true,
            seed: 42,
            verbose: false,
            time_checker: false,
            device: "cpu".to_string(),
            dynamic_objects_name: "car".to_string(),
            antenna_displacement: [0.0, 0.0, 1.5],
            reclaim_port: true,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the config.toml file
    ///
    /// # Returns
    /// * `Ok(BridgeConfig)` if the file was successfully loaded and parsed
    /// * `Err(String)` with a descriptive error message otherwise
    pub fn load(config_path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(config_path).map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        let non_negative = [
            ("position-threshold", self.position_threshold),
            ("angle-threshold", self.angle_threshold),
            ("match-tolerance", self.match_tolerance()),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a finite non-negative number, got {}", name, value));
            }
        }

        for (name, value) in [("frequency", self.frequency), ("bandwidth", self.bandwidth)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }

        if self.samples_per_src == 0 {
            return Err("samples-per-src must be at least 1".to_string());
        }
        if self.antenna_displacement.iter().any(|v| !v.is_finite()) {
            return Err(format!("antenna-displacement must be finite, got {:?}", self.antenna_displacement));
        }
        if self.dynamic_objects_name.is_empty() {
            return Err("dynamic-objects-name cannot be empty".to_string());
        }
        if self.scene.is_empty() {
            return Err("scene path cannot be empty".to_string());
        }
        Ok(())
    }

    /// Radius used to match path endpoints to entities.
    pub fn match_tolerance(&self) -> f64 {
        self.match_tolerance.unwrap_or(self.position_threshold)
    }

    pub fn solver_params(&self) -> SolverParams {
        SolverParams {
            max_depth: self.max_depth,
            max_num_paths_per_src: self.max_num_paths_per_src,
            samples_per_src: self.samples_per_src,
            los: self.los,
            specular_reflection: self.specular_reflection,
            diffuse_reflection: self.diffuse_reflection,
            refraction: self.refraction,
            synthetic_array: self.synthetic_array,
            seed: self.seed,
        }
    }

    /// Socket address the server binds to.
    pub fn bind_address(&self) -> String {
        let host = if self.local_machine { "127.0.0.1" } else { "0.0.0.0" };
        format!("{}:{}", host, self.port)
    }
}
