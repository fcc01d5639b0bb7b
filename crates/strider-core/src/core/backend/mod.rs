//! # Backend Module
//!
//! The boundary between the engine and the simulation library that does the physics.
//!
//! ## Overview
//!
//! A backend provides three things:
//!
//! - **Platforms** - named execution targets (precision or hardware modes) with a
//!   relative speed rating used to pick a default
//! - **Sessions** - live, stateful bindings of a topology, system and integrator to a
//!   platform; positions, velocities and box vectors live inside the session
//! - **An interchange codec** - opaque text encodings of the backend's system and
//!   integrator specifications, used for persisting engine configurations
//!
//! ## Key Components
//!
//! - [`Backend`] / [`Session`] - the collaborator traits
//! - [`reference`] - an in-process backend with harmonically anchored particles

pub mod reference;
#[cfg(test)]
pub(crate) mod stub;

use crate::core::models::snapshot::BoxVectors;
use crate::core::models::topology::Topology;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A named backend execution target.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    name: String,
    speed: f64,
}

impl Platform {
    pub fn new(name: impl Into<String>, speed: f64) -> Self {
        Self {
            name: name.into(),
            speed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative speed estimate; larger is faster.
    pub fn speed(&self) -> f64 {
        self.speed
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// How a session's platform should be chosen when it is created.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlatformChoice {
    /// Use the engine's configured platform, or the backend default if none is set.
    #[default]
    Default,
    /// Resolve a platform by name. The name `fastest` selects the highest-rated one.
    Named(String),
    /// Use this platform directly.
    Handle(Platform),
}

impl From<&str> for PlatformChoice {
    fn from(name: &str) -> Self {
        PlatformChoice::Named(name.to_string())
    }
}

impl From<String> for PlatformChoice {
    fn from(name: String) -> Self {
        PlatformChoice::Named(name)
    }
}

impl From<Platform> for PlatformChoice {
    fn from(platform: Platform) -> Self {
        PlatformChoice::Handle(platform)
    }
}

impl From<Option<&str>> for PlatformChoice {
    fn from(name: Option<&str>) -> Self {
        name.map_or(PlatformChoice::Default, PlatformChoice::from)
    }
}

/// Everything a session reports about its current state in one query.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendState {
    pub positions: Vec<Point3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
    pub box_vectors: BoxVectors,
    pub potential_energy: f64,
    pub kinetic_energy: f64,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend offers no platforms")]
    NoPlatforms,

    #[error("Failed to create session on platform '{platform}': {reason}")]
    SessionCreation { platform: String, reason: String },

    #[error("Platform '{platform}' does not support property '{property}'")]
    UnsupportedProperty { platform: String, property: String },

    #[error("Resource '{resource}' is held by another session")]
    ResourceBusy { resource: String },

    #[error("Expected {expected} particles but received {found}")]
    ParticleCount { expected: usize, found: usize },

    #[error("Failed to encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },

    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },
}

/// A live, stateful binding to the simulation backend.
///
/// Every call runs to completion on the calling thread.
pub trait Session {
    /// The platform this session was created on.
    fn platform(&self) -> &Platform;

    /// Queries positions, velocities, box vectors and energies.
    fn state(&self) -> Result<BackendState, BackendError>;

    fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), BackendError>;

    fn set_velocities(&mut self, velocities: &[Vector3<f64>]) -> Result<(), BackendError>;

    fn set_box_vectors(&mut self, box_vectors: &BoxVectors) -> Result<(), BackendError>;

    /// Advances the integrator by `n_steps` steps, blocking until done.
    fn step(&mut self, n_steps: usize) -> Result<(), BackendError>;

    /// Runs the backend's local energy minimization.
    fn minimize_energy(&mut self) -> Result<(), BackendError>;

    /// Integrator step size in picoseconds.
    fn step_size(&self) -> f64;
}

/// A simulation library the engine can drive.
pub trait Backend {
    type System: fmt::Debug;
    type Integrator: fmt::Debug;
    type Session: Session;

    fn available_platforms(&self) -> Vec<Platform>;

    /// Binds a topology, system and integrator into a new session on `platform`.
    fn create_session(
        &self,
        topology: &Topology,
        system: &Self::System,
        integrator: &Self::Integrator,
        platform: &Platform,
        properties: &BTreeMap<String, String>,
    ) -> Result<Self::Session, BackendError>;

    fn encode_system(&self, system: &Self::System) -> Result<String, BackendError>;

    fn decode_system(&self, text: &str) -> Result<Self::System, BackendError>;

    fn encode_integrator(&self, integrator: &Self::Integrator) -> Result<String, BackendError>;

    fn decode_integrator(&self, text: &str) -> Result<Self::Integrator, BackendError>;

    fn platform_names(&self) -> Vec<String> {
        self.available_platforms()
            .into_iter()
            .map(|platform| platform.name)
            .collect()
    }

    fn resolve_platform(&self, name: &str) -> Option<Platform> {
        self.available_platforms()
            .into_iter()
            .find(|platform| platform.name == name)
    }

    fn fastest_platform(&self) -> Option<Platform> {
        self.available_platforms()
            .into_iter()
            .max_by(|a, b| {
                a.speed
                    .partial_cmp(&b.speed)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// The platform used when the caller expresses no preference.
    fn default_platform(&self) -> Result<Platform, BackendError> {
        self.fastest_platform().ok_or(BackendError::NoPlatforms)
    }
}
