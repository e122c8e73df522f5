//! Built-in geometric reference engine.
//!
//! A small stand-in for a full ray tracer so the bridge can run end to end
//! without an external solver. Per transmitter/receiver pair it emits:
//! - a direct path when the segment clears every obstacle
//! - a refracted path through obstacles when the direct one is blocked
//! - a specular ground reflection (image method, reflection coefficient -1)
//! - a few diffusely scattered ground paths sampled from a seeded RNG
//!
//! Amplitudes use the free-space term `λ / (4πd)` with phase `-2πd/λ`.

use log::{debug, warn};
use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, Uniform};
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;

use super::geometry::{count_obstructions, is_obstructed};
use super::scene::{Obstacle, Scene, load_scene};
use super::types::{Endpoint, EndpointRole, InteractionKind, ObjectState, RawPath, SPEED_OF_LIGHT, SolveOutput, SolverParams, Vec3};
use super::{EngineError, SceneEngine};

/// Endpoints closer than this (meters) are treated as co-located and get no paths.
const MIN_SEPARATION: f64 = 1e-3;

/// Upper bound on diffuse scatter samples drawn per link.
const DIFFUSE_SAMPLES_PER_LINK: usize = 4;

/// Path found between one transmitter and one receiver, before indexing.
struct LinkPath {
    coefficient: Complex64,
    length: f64,
    interactions: Vec<InteractionKind>,
}

pub struct GeometricEngine {
    wavelength: f64,
    objects: HashMap<String, ObjectState>,
    /// Ordered so source/target indices are stable between solves.
    endpoints: BTreeMap<String, Endpoint>,
    obstacles: Vec<Obstacle>,
    penetration_loss_db: f64,
    diffuse_coefficient: f64,
    diffuse_sigma_db: f64,
}

impl GeometricEngine {
    /// Build an engine for a parsed scene at the given carrier frequency (Hz).
    pub fn new(scene: Scene, frequency: f64) -> Self {
        let objects = scene
            .objects
            .into_iter()
            .map(|object| {
                let state = ObjectState {
                    position: object.position,
                    orientation: Vec3::ZERO,
                    velocity: Vec3::ZERO,
                };
                (object.name, state)
            })
            .collect();

        Self {
            wavelength: SPEED_OF_LIGHT / frequency,
            objects,
            endpoints: BTreeMap::new(),
            obstacles: scene.obstacles,
            penetration_loss_db: scene.penetration_loss_db,
            diffuse_coefficient: scene.diffuse_coefficient,
            diffuse_sigma_db: scene.diffuse_sigma_db,
        }
    }

    /// Load the scene file and build an engine on the requested compute device.
    ///
    /// Only `cpu` is available; any other device falls back to it with a warning.
    pub fn from_file(path: &str, frequency: f64, device: &str) -> Result<Self, EngineError> {
        if device != "cpu" {
            warn!("Compute device {} is not available to the geometric engine, using cpu", device);
        }
        let scene = load_scene(path)?;
        debug!("Loaded scene {} with {} objects and {} obstacles", path, scene.objects.len(), scene.obstacles.len());
        Ok(Self::new(scene, frequency))
    }

    fn free_space(&self, length: f64) -> Complex64 {
        let amplitude = self.wavelength / (4.0 * PI * length);
        Complex64::from_polar(amplitude, -2.0 * PI * length / self.wavelength)
    }

    /// Trace every path between a single transmitter and receiver.
    fn trace_link(&self, tx: &Vec3, rx: &Vec3, params: &SolverParams, rng: &mut StdRng) -> Result<Vec<LinkPath>, EngineError> {
        let mut paths = Vec::new();
        let direct = tx.distance(rx);
        if direct < MIN_SEPARATION {
            return Ok(paths);
        }

        let depth = params.max_depth as usize;
        let blocking = count_obstructions(tx, rx, &self.obstacles);
        if blocking == 0 {
            if params.los {
                paths.push(LinkPath {
                    coefficient: self.free_space(direct),
                    length: direct,
                    interactions: padded_trace(&[], depth),
                });
            }
        } else if params.refraction && blocking <= depth {
            let attenuation = 10f64.powf(-(blocking as f64) * self.penetration_loss_db / 20.0);
            paths.push(LinkPath {
                coefficient: self.free_space(direct) * attenuation,
                length: direct,
                interactions: padded_trace(&vec![InteractionKind::Refraction; blocking], depth),
            });
        }

        if depth == 0 || tx.z <= 0.0 || rx.z <= 0.0 {
            return Ok(paths);
        }

        if params.specular_reflection {
            let t = tx.z / (tx.z + rx.z);
            let ground = Vec3::new(tx.x + t * (rx.x - tx.x), tx.y + t * (rx.y - tx.y), 0.0);
            if !is_obstructed(tx, &ground, &self.obstacles) && !is_obstructed(&ground, rx, &self.obstacles) {
                let image = Vec3::new(tx.x, tx.y, -tx.z);
                let length = image.distance(rx);
                paths.push(LinkPath {
                    coefficient: -self.free_space(length),
                    length,
                    interactions: padded_trace(&[InteractionKind::Specular], depth),
                });
            }
        }

        if params.diffuse_reflection && self.diffuse_coefficient > 0.0 {
            let samples = DIFFUSE_SAMPLES_PER_LINK.min(params.samples_per_src);
            if samples == 0 {
                return Ok(paths);
            }
            let unit = Uniform::new(0.0_f64, 1.0);
            let shadowing = if self.diffuse_sigma_db > 0.0 {
                Some(Normal::new(0.0_f64, self.diffuse_sigma_db).map_err(|e| EngineError::Solver(format!("invalid diffuse sigma: {}", e)))?)
            } else {
                None
            };
            let center = Vec3::new((tx.x + rx.x) / 2.0, (tx.y + rx.y) / 2.0, 0.0);
            let radius = direct / 2.0;
            let scale = self.diffuse_coefficient / (samples as f64).sqrt();

            for _ in 0..samples {
                let angle = 2.0 * PI * unit.sample(rng);
                let r = radius * unit.sample(rng).sqrt();
                let scatter = Vec3::new(center.x + r * angle.cos(), center.y + r * angle.sin(), 0.0);
                if is_obstructed(tx, &scatter, &self.obstacles) || is_obstructed(&scatter, rx, &self.obstacles) {
                    continue;
                }
                let length = tx.distance(&scatter) + scatter.distance(rx);
                let shadow_db = shadowing.map(|normal| normal.sample(rng)).unwrap_or(0.0);
                let gain = scale * 10f64.powf(shadow_db / 20.0);
                paths.push(LinkPath {
                    coefficient: self.free_space(length) * gain,
                    length,
                    interactions: padded_trace(&[InteractionKind::Diffuse], depth),
                });
            }
        }

        Ok(paths)
    }
}

/// Interaction trace with one slot per depth, unused slots set to `None`.
fn padded_trace(kinds: &[InteractionKind], depth: usize) -> Vec<InteractionKind> {
    let mut trace = kinds.to_vec();
    if trace.len() < depth {
        trace.resize(depth, InteractionKind::None);
    }
    trace
}

impl SceneEngine for GeometricEngine {
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
        self.endpoints.remove(name).is_some()
    }

    fn solve(&mut self, params: &SolverParams) -> Result<SolveOutput, EngineError> {
        if !params.synthetic_array {
            debug!("Synthetic array disabled; single-element endpoints are traced the same way");
        }

        let sources: Vec<Vec3> = self.endpoints.values().filter(|e| e.role == EndpointRole::Transmitter).map(|e| e.position).collect();
        let targets: Vec<Vec3> = self.endpoints.values().filter(|e| e.role == EndpointRole::Receiver).map(|e| e.position).collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut paths = Vec::new();

        for (source, tx) in sources.iter().enumerate() {
            let mut emitted = 0;
            'targets: for (target, rx) in targets.iter().enumerate() {
                for link in self.trace_link(tx, rx, params, &mut rng)? {
                    if emitted >= params.max_num_paths_per_src {
                        break 'targets;
                    }
                    paths.push(RawPath {
                        source,
                        target,
                        coefficient: link.coefficient,
                        delay: link.length / SPEED_OF_LIGHT,
                        interactions: link.interactions,
                    });
                    emitted += 1;
                }
            }
        }

        debug!("Geometric solve: {} sources, {} targets, {} paths", sources.len(), targets.len(), paths.len());
        Ok(SolveOutput { sources, targets, paths })
    }
}
