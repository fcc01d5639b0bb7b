//! A call-counting backend for exercising engine caching rules in tests.

use super::{Backend, BackendError, BackendState, Platform, Session};
use crate::core::models::snapshot::BoxVectors;
use crate::core::models::topology::Topology;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Platform that can host only one session at a time.
pub(crate) const EXCLUSIVE_PLATFORM: &str = "Accelerator";

#[derive(Debug, Default)]
pub(crate) struct CallLog {
    pub sessions_created: Cell<usize>,
    pub state_queries: Cell<usize>,
    pub position_writes: Cell<usize>,
    pub velocity_writes: Cell<usize>,
    pub box_writes: Cell<usize>,
    pub steps: Cell<usize>,
    pub minimizations: Cell<usize>,
}

impl CallLog {
    fn bump(counter: &Cell<usize>, by: usize) {
        counter.set(counter.get() + by);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StubSystem {
    pub n_atoms: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StubIntegrator {
    pub step_size: f64,
    /// Positions turn into NaN once this many steps have been taken in total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diverge_after: Option<usize>,
}

impl StubIntegrator {
    pub fn new(step_size: f64) -> Self {
        Self {
            step_size,
            diverge_after: None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StubBackend {
    pub calls: Rc<CallLog>,
    device_in_use: Rc<Cell<bool>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            calls: Rc::new(CallLog::default()),
            device_in_use: Rc::new(Cell::new(false)),
        }
    }
}

impl Backend for StubBackend {
    type System = StubSystem;
    type Integrator = StubIntegrator;
    type Session = StubSession;

    fn available_platforms(&self) -> Vec<Platform> {
        vec![
            Platform::new("Reference", 1.0),
            Platform::new(EXCLUSIVE_PLATFORM, 100.0),
        ]
    }

    fn default_platform(&self) -> Result<Platform, BackendError> {
        self.resolve_platform("Reference")
            .ok_or(BackendError::NoPlatforms)
    }

    fn create_session(
        &self,
        topology: &Topology,
        system: &StubSystem,
        integrator: &StubIntegrator,
        platform: &Platform,
        properties: &BTreeMap<String, String>,
    ) -> Result<StubSession, BackendError> {
        if let Some(key) = properties.keys().find(|key| key.as_str() != "Precision") {
            return Err(BackendError::UnsupportedProperty {
                platform: platform.name().to_string(),
                property: key.clone(),
            });
        }
        if system.n_atoms != topology.n_atoms {
            return Err(BackendError::SessionCreation {
                platform: platform.name().to_string(),
                reason: "atom count differs from topology".to_string(),
            });
        }
        let device = if platform.name() == EXCLUSIVE_PLATFORM {
            if self.device_in_use.get() {
                return Err(BackendError::ResourceBusy {
                    resource: EXCLUSIVE_PLATFORM.to_string(),
                });
            }
            self.device_in_use.set(true);
            Some(Rc::clone(&self.device_in_use))
        } else {
            None
        };
        CallLog::bump(&self.calls.sessions_created, 1);

        let n = system.n_atoms;
        Ok(StubSession {
            platform: platform.clone(),
            calls: Rc::clone(&self.calls),
            device,
            integrator: integrator.clone(),
            steps_taken: 0,
            positions: (0..n).map(|i| Point3::new(i as f64 * 0.1, 0.0, 0.0)).collect(),
            velocities: vec![Vector3::new(0.0, 1.0, 0.0); n],
            box_vectors: BoxVectors::cubic(2.0),
        })
    }

    fn encode_system(&self, system: &StubSystem) -> Result<String, BackendError> {
        toml::to_string(system).map_err(|e| BackendError::Encode {
            what: "system",
            reason: e.to_string(),
        })
    }

    fn decode_system(&self, text: &str) -> Result<StubSystem, BackendError> {
        toml::from_str(text).map_err(|e| BackendError::Decode {
            what: "system",
            reason: e.to_string(),
        })
    }

    fn encode_integrator(&self, integrator: &StubIntegrator) -> Result<String, BackendError> {
        toml::to_string(integrator).map_err(|e| BackendError::Encode {
            what: "integrator",
            reason: e.to_string(),
        })
    }

    fn decode_integrator(&self, text: &str) -> Result<StubIntegrator, BackendError> {
        toml::from_str(text).map_err(|e| BackendError::Decode {
            what: "integrator",
            reason: e.to_string(),
        })
    }
}

#[derive(Debug)]
pub(crate) struct StubSession {
    platform: Platform,
    calls: Rc<CallLog>,
    device: Option<Rc<Cell<bool>>>,
    integrator: StubIntegrator,
    steps_taken: usize,
    positions: Vec<Point3<f64>>,
    velocities: Vec<Vector3<f64>>,
    box_vectors: BoxVectors,
}

impl Drop for StubSession {
    fn drop(&mut self) {
        if let Some(device) = &self.device {
            device.set(false);
        }
    }
}

impl Session for StubSession {
    fn platform(&self) -> &Platform {
        &self.platform
    }

    fn state(&self) -> Result<BackendState, BackendError> {
        CallLog::bump(&self.calls.state_queries, 1);
        Ok(BackendState {
            positions: self.positions.clone(),
            velocities: self.velocities.clone(),
            box_vectors: self.box_vectors,
            potential_energy: -1.0,
            kinetic_energy: 0.5 * self.velocities.len() as f64,
        })
    }

    fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), BackendError> {
        CallLog::bump(&self.calls.position_writes, 1);
        self.positions = positions.to_vec();
        Ok(())
    }

    fn set_velocities(&mut self, velocities: &[Vector3<f64>]) -> Result<(), BackendError> {
        CallLog::bump(&self.calls.velocity_writes, 1);
        self.velocities = velocities.to_vec();
        Ok(())
    }

    fn set_box_vectors(&mut self, box_vectors: &BoxVectors) -> Result<(), BackendError> {
        CallLog::bump(&self.calls.box_writes, 1);
        self.box_vectors = *box_vectors;
        Ok(())
    }

    fn step(&mut self, n_steps: usize) -> Result<(), BackendError> {
        CallLog::bump(&self.calls.steps, n_steps);
        self.steps_taken += n_steps;
        let diverged = self
            .integrator
            .diverge_after
            .is_some_and(|limit| self.steps_taken > limit);
        for position in &mut self.positions {
            if diverged {
                position.x = f64::NAN;
            } else {
                position.x += n_steps as f64 * self.integrator.step_size;
            }
        }
        Ok(())
    }

    fn minimize_energy(&mut self) -> Result<(), BackendError> {
        CallLog::bump(&self.calls.minimizations, 1);
        for position in &mut self.positions {
            position.y = 0.0;
        }
        Ok(())
    }

    fn step_size(&self) -> f64 {
        self.integrator.step_size
    }
}
