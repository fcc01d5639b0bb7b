use super::{Backend, BackendError, BackendState, Platform, Session};
use crate::core::models::snapshot::BoxVectors;
use crate::core::models::topology::Topology;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MINIMIZER_MAX_ITERATIONS: usize = 10_000;
// kJ/mol/nm
const MINIMIZER_FORCE_TOLERANCE: f64 = 10.0;
const MINIMIZER_DAMPING: f64 = 0.5;

const PROPERTY_THREADS: &str = "Threads";

/// Particles tethered to fixed anchor points by identical harmonic springs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceSystem {
    /// Particle masses in daltons.
    pub masses: Vec<f64>,
    /// Rest positions in nanometers; also the initial positions of a new session.
    pub anchors: Vec<[f64; 3]>,
    /// Spring constant in kJ/mol/nm^2.
    pub spring_constant: f64,
    /// Edge lengths of the initial orthorhombic periodic box in nanometers.
    pub box_edges: [f64; 3],
}

impl ReferenceSystem {
    pub fn n_particles(&self) -> usize {
        self.masses.len()
    }
}

/// Velocity-Verlet integration with a fixed step size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceIntegrator {
    /// Step size in picoseconds.
    pub step_size: f64,
}

impl ReferenceIntegrator {
    pub fn new(step_size: f64) -> Self {
        Self { step_size }
    }
}

/// An in-process backend with two platforms, `Reference` and `CPU`.
///
/// Both platforms run the same numerics; `CPU` accepts a `Threads` property and
/// is rated faster, so it is the default.
#[derive(Debug, Clone)]
pub struct ReferenceBackend {
    platforms: Vec<Platform>,
}

impl Default for ReferenceBackend {
    fn default() -> Self {
        Self::with_platforms(vec![
            Platform::new("Reference", 1.0),
            Platform::new("CPU", 10.0),
        ])
    }
}

impl ReferenceBackend {
    pub fn with_platforms(platforms: Vec<Platform>) -> Self {
        Self { platforms }
    }

    fn check_properties(
        platform: &Platform,
        properties: &BTreeMap<String, String>,
    ) -> Result<(), BackendError> {
        for (key, value) in properties {
            let supported = platform.name() == "CPU" && key == PROPERTY_THREADS;
            if !supported {
                return Err(BackendError::UnsupportedProperty {
                    platform: platform.name().to_string(),
                    property: key.clone(),
                });
            }
            match value.parse::<usize>() {
                Ok(threads) if threads > 0 => {}
                _ => {
                    return Err(BackendError::SessionCreation {
                        platform: platform.name().to_string(),
                        reason: format!("'{}' is not a valid thread count", value),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_system(
        platform: &Platform,
        topology: &Topology,
        system: &ReferenceSystem,
        integrator: &ReferenceIntegrator,
    ) -> Result<(), BackendError> {
        let fail = |reason: String| BackendError::SessionCreation {
            platform: platform.name().to_string(),
            reason,
        };
        if system.masses.len() != topology.n_atoms || system.anchors.len() != topology.n_atoms {
            return Err(fail(format!(
                "system has {} masses and {} anchors but the topology has {} atoms",
                system.masses.len(),
                system.anchors.len(),
                topology.n_atoms
            )));
        }
        if let Some(mass) = system
            .masses
            .iter()
            .find(|m| !m.is_finite() || **m <= 0.0)
        {
            return Err(fail(format!("particle mass {} is not positive", mass)));
        }
        if !integrator.step_size.is_finite() || integrator.step_size <= 0.0 {
            return Err(fail(format!(
                "step size {} is not positive",
                integrator.step_size
            )));
        }
        Ok(())
    }
}

impl Backend for ReferenceBackend {
    type System = ReferenceSystem;
    type Integrator = ReferenceIntegrator;
    type Session = ReferenceSession;

    fn available_platforms(&self) -> Vec<Platform> {
        self.platforms.clone()
    }

    fn create_session(
        &self,
        topology: &Topology,
        system: &ReferenceSystem,
        integrator: &ReferenceIntegrator,
        platform: &Platform,
        properties: &BTreeMap<String, String>,
    ) -> Result<ReferenceSession, BackendError> {
        Self::check_properties(platform, properties)?;
        Self::check_system(platform, topology, system, integrator)?;

        let anchors: Vec<Point3<f64>> = system
            .anchors
            .iter()
            .map(|[x, y, z]| Point3::new(*x, *y, *z))
            .collect();
        let [bx, by, bz] = system.box_edges;

        Ok(ReferenceSession {
            platform: platform.clone(),
            masses: system.masses.clone(),
            spring_constant: system.spring_constant,
            step_size: integrator.step_size,
            positions: anchors.clone(),
            velocities: vec![Vector3::zeros(); anchors.len()],
            anchors,
            box_vectors: BoxVectors::orthorhombic(bx, by, bz),
        })
    }

    fn encode_system(&self, system: &ReferenceSystem) -> Result<String, BackendError> {
        toml::to_string(system).map_err(|e| BackendError::Encode {
            what: "system",
            reason: e.to_string(),
        })
    }

    fn decode_system(&self, text: &str) -> Result<ReferenceSystem, BackendError> {
        toml::from_str(text).map_err(|e| BackendError::Decode {
            what: "system",
            reason: e.to_string(),
        })
    }

    fn encode_integrator(&self, integrator: &ReferenceIntegrator) -> Result<String, BackendError> {
        toml::to_string(integrator).map_err(|e| BackendError::Encode {
            what: "integrator",
            reason: e.to_string(),
        })
    }

    fn decode_integrator(&self, text: &str) -> Result<ReferenceIntegrator, BackendError> {
        toml::from_str(text).map_err(|e| BackendError::Decode {
            what: "integrator",
            reason: e.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct ReferenceSession {
    platform: Platform,
    masses: Vec<f64>,
    anchors: Vec<Point3<f64>>,
    spring_constant: f64,
    step_size: f64,
    positions: Vec<Point3<f64>>,
    velocities: Vec<Vector3<f64>>,
    box_vectors: BoxVectors,
}

impl ReferenceSession {
    fn forces(&self) -> Vec<Vector3<f64>> {
        self.positions
            .iter()
            .zip(&self.anchors)
            .map(|(position, anchor)| -(position - anchor) * self.spring_constant)
            .collect()
    }

    fn potential_energy(&self) -> f64 {
        self.positions
            .iter()
            .zip(&self.anchors)
            .map(|(position, anchor)| 0.5 * self.spring_constant * (position - anchor).norm_squared())
            .sum()
    }

    fn kinetic_energy(&self) -> f64 {
        self.velocities
            .iter()
            .zip(&self.masses)
            .map(|(velocity, mass)| 0.5 * mass * velocity.norm_squared())
            .sum()
    }

    fn check_len(&self, found: usize) -> Result<(), BackendError> {
        if found != self.positions.len() {
            return Err(BackendError::ParticleCount {
                expected: self.positions.len(),
                found,
            });
        }
        Ok(())
    }
}

impl Session for ReferenceSession {
    fn platform(&self) -> &Platform {
        &self.platform
    }

    fn state(&self) -> Result<BackendState, BackendError> {
        Ok(BackendState {
            positions: self.positions.clone(),
            velocities: self.velocities.clone(),
            box_vectors: self.box_vectors,
            potential_energy: self.potential_energy(),
            kinetic_energy: self.kinetic_energy(),
        })
    }

    fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), BackendError> {
        self.check_len(positions.len())?;
        self.positions.copy_from_slice(positions);
        Ok(())
    }

    fn set_velocities(&mut self, velocities: &[Vector3<f64>]) -> Result<(), BackendError> {
        self.check_len(velocities.len())?;
        self.velocities.copy_from_slice(velocities);
        Ok(())
    }

    fn set_box_vectors(&mut self, box_vectors: &BoxVectors) -> Result<(), BackendError> {
        self.box_vectors = *box_vectors;
        Ok(())
    }

    fn step(&mut self, n_steps: usize) -> Result<(), BackendError> {
        let dt = self.step_size;
        let mut forces = self.forces();
        for _ in 0..n_steps {
            for i in 0..self.positions.len() {
                self.velocities[i] += forces[i] * (0.5 * dt / self.masses[i]);
                self.positions[i] += self.velocities[i] * dt;
            }
            forces = self.forces();
            for i in 0..self.positions.len() {
                self.velocities[i] += forces[i] * (0.5 * dt / self.masses[i]);
            }
        }
        Ok(())
    }

    fn minimize_energy(&mut self) -> Result<(), BackendError> {
        if self.spring_constant <= 0.0 {
            return Ok(());
        }
        let scale = MINIMIZER_DAMPING / self.spring_constant;
        for _ in 0..MINIMIZER_MAX_ITERATIONS {
            let forces = self.forces();
            let max_force = forces.iter().map(|f| f.norm()).fold(0.0, f64::max);
            if max_force < MINIMIZER_FORCE_TOLERANCE {
                break;
            }
            for (position, force) in self.positions.iter_mut().zip(&forces) {
                *position += force * scale;
            }
        }
        Ok(())
    }

    fn step_size(&self) -> f64 {
        self.step_size
    }
}
