//! Command-line surface.

use anyhow::{Context, anyhow};
use clap::Parser;
use std::path::PathBuf;

use super::BridgeConfig;

/// UDP bridge between a mobility simulator and a ray-tracing propagation engine.
///
/// Flags override values read from `--config`.
#[derive(Debug, Parser)]
#[command(name = "raytrace-bridge", version, about)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// JSON scene file
    #[arg(long, alias = "path-to-xml-scenario")]
    pub scene: Option<String>,
    /// Carrier frequency in Hz
    #[arg(long)]
    pub frequency: Option<f64>,
    /// Bandwidth in Hz
    #[arg(long, alias = "bw")]
    pub bandwidth: Option<f64>,
    /// Simulator runs on the same machine, bind to loopback only
    #[arg(long)]
    pub local_machine: bool,
    /// UDP port
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Movement in meters that triggers a scene update
    #[arg(long)]
    pub position_threshold: Option<f64>,
    /// Heading change in degrees that triggers a scene update
    #[arg(long)]
    pub angle_threshold: Option<f64>,
    /// Radius in meters for matching path endpoints to entities
    #[arg(long)]
    pub match_tolerance: Option<f64>,
    /// Maximum number of interactions per path
    #[arg(long)]
    pub max_depth: Option<u32>,
    /// Maximum number of paths per source
    #[arg(long)]
    pub max_num_paths_per_src: Option<usize>,
    /// Number of samples per source
    #[arg(long)]
    pub samples_per_src: Option<usize>,
    /// Exclude line-of-sight paths
    #[arg(long)]
    pub disable_los: bool,
    /// Exclude specular reflections
    #[arg(long)]
    pub disable_specular_reflection: bool,
    /// Exclude diffuse reflections
    #[arg(long)]
    pub disable_diffuse_reflection: bool,
    /// Exclude refraction
    #[arg(long)]
    pub disable_refraction: bool,
    /// Disable the synthetic array approximation
    #[arg(long)]
    pub disable_synthetic_array: bool,
    /// Seed for random number generation
    #[arg(long)]
    pub seed: Option<u64>,
    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
    /// Log the time taken by each operation
    #[arg(long)]
    pub time_checker: bool,
    /// Compute device, `cpu` or `gpu:<n>`
    #[arg(long)]
    pub device: Option<String>,
    /// Scene object prefix; entity 7 is the object `<prefix>_7`
    #[arg(long)]
    pub dynamic_objects_name: Option<String>,
    /// Antenna offset from the body origin, as X Y Z in meters
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub antenna_displacement: Option<Vec<f64>>,
    /// Leave other processes bound to the UDP port alone at startup
    #[arg(long)]
    pub no_reclaim_port: bool,
}

impl Cli {
    /// Build the effective configuration: file (if any), then flags, then validation.
    pub fn resolve(&self) -> anyhow::Result<BridgeConfig> {
        let base = match &self.config {
            Some(path) => BridgeConfig::load(path).map_err(|e| anyhow!(e)).with_context(|| format!("Loading {}", path.display()))?,
            None => BridgeConfig::default(),
        };
        let config = self.apply(base)?;
        config.validate().map_err(|e| anyhow!(e)).context("Invalid configuration")?;
        Ok(config)
    }

    /// Overlay every flag given on the command line onto `config`.
    pub fn apply(&self, mut config: BridgeConfig) -> anyhow::Result<BridgeConfig> {
        if let Some(scene) = &self.scene {
            config.scene = scene.clone();
        }
        if let Some(frequency) = self.frequency {
            config.frequency = frequency;
        }
        if let Some(bandwidth) = self.bandwidth {
            config.bandwidth = bandwidth;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(threshold) = self.position_threshold {
            config.position_threshold = threshold;
        }
        if let Some(threshold) = self.angle_threshold {
            config.angle_threshold = threshold;
        }
        if self.match_tolerance.is_some() {
            config.match_tolerance = self.match_tolerance;
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        if let Some(max_paths) = self.max_num_paths_per_src {
            config.max_num_paths_per_src = max_paths;
        }
        if let Some(samples) = self.samples_per_src {
            config.samples_per_src = samples;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(name) = &self.dynamic_objects_name {
            config.dynamic_objects_name = name.clone();
        }
        if let Some(values) = &self.antenna_displacement {
            config.antenna_displacement = values
                .as_slice()
                .try_into()
                .map_err(|_| anyhow!("antenna-displacement takes exactly 3 values, got {}", values.len()))?;
        }

        config.local_machine |= self.local_machine;
        config.verbose |= self.verbose;
        config.time_checker |= self.time_checker;
        config.reclaim_port &= !self.no_reclaim_port;
        config.los &= !self.disable_los;
        config.specular_reflection &= !self.disable_specular_reflection;
        config.diffuse_reflection &= !self.disable_diffuse_reflection;
        config.refraction &= !self.disable_refraction;
        config.synthetic_array &= !self.disable_synthetic_array;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("raytrace-bridge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_flags_keep_defaults() {
        let config = parse(&[]).resolve().unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn flags_override_values() {
        let config = parse(&[
            "--path-to-xml-scenario",
            "city.json",
            "--bw",
            "20e6",
            "--port",
            "9100",
            "--local-machine",
            "--disable-refraction",
            "--disable-los",
            "--antenna-displacement",
            "0",
            "-0.5",
            "2",
            "--verbose",
        ])
        .resolve()
        .unwrap();

        assert_eq!(config.scene, "city.json");
        assert_eq!(config.bandwidth, 20e6);
        assert_eq!(config.bind_address(), "127.0.0.1:9100");
        assert!(!config.refraction);
        assert!(!config.los);
        assert!(config.specular_reflection);
        assert_eq!(config.antenna_displacement, [0.0, -0.5, 2.0]);
        assert!(config.verbose);
    }

    #[test]
    fn flags_win_over_file_values() {
        let file = BridgeConfig::parse("port = 7000\nseed = 1\nrefraction = false").unwrap();
        let config = parse(&["--seed", "9"]).apply(file).unwrap();

        assert_eq!(config.port, 7000);
        assert_eq!(config.seed, 9);
        assert!(!config.refraction);
    }

    #[test]
    fn port_reclaim_is_on_unless_opted_out() {
        assert!(parse(&[]).resolve().unwrap().reclaim_port);
        assert!(!parse(&["--no-reclaim-port"]).resolve().unwrap().reclaim_port);

        let file = BridgeConfig::parse("reclaim-port = false").unwrap();
        assert!(!parse(&[]).apply(file).unwrap().reclaim_port);
    }

    #[test]
    fn invalid_values_fail_resolution() {
        assert!(parse(&["--position-threshold=-2"]).resolve().is_err());
        assert!(Cli::try_parse_from(["raytrace-bridge", "--antenna-displacement", "1", "2"]).is_err());
    }
}
