use crate::core::backend::Backend;
use crate::core::models::snapshot::SPATIAL_DIMENSIONS;
use crate::core::models::topology::Topology;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_STEPS_PER_FRAME: usize = 10;
pub const DEFAULT_FRAMES_MAX: usize = 5000;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

fn default_steps_per_frame() -> usize {
    DEFAULT_STEPS_PER_FRAME
}

/// Engine-level settings that do not affect the backend session itself.
///
/// `n_frames_max` is advisory: trajectory producers stop there, the engine
/// never enforces it. A missing `n_frames_max` in a persisted record means
/// "unbounded"; freshly built options default to [`DEFAULT_FRAMES_MAX`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineOptions {
    #[serde(default = "default_steps_per_frame")]
    pub n_steps_per_frame: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_frames_max: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            n_steps_per_frame: DEFAULT_STEPS_PER_FRAME,
            n_frames_max: Some(DEFAULT_FRAMES_MAX),
            platform: None,
        }
    }
}

impl EngineOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_steps_per_frame == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "n_steps_per_frame",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.n_frames_max == Some(0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "n_frames_max",
                reason: "must be at least 1 when present".to_string(),
            });
        }
        if self.platform.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::InvalidParameter {
                parameter: "platform",
                reason: "must not be empty when present".to_string(),
            });
        }
        Ok(())
    }
}

/// A sparse set of option overrides. Supplied keys win, the rest are inherited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialEngineOptions {
    pub n_steps_per_frame: Option<usize>,
    pub n_frames_max: Option<Option<usize>>,
    pub platform: Option<Option<String>>,
}

impl PartialEngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_steps_per_frame(mut self, steps: usize) -> Self {
        self.n_steps_per_frame = Some(steps);
        self
    }
    pub fn n_frames_max(mut self, frames: Option<usize>) -> Self {
        self.n_frames_max = Some(frames);
        self
    }
    pub fn platform(mut self, platform: Option<String>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn overlay(self, base: &EngineOptions) -> EngineOptions {
        EngineOptions {
            n_steps_per_frame: self.n_steps_per_frame.unwrap_or(base.n_steps_per_frame),
            n_frames_max: self.n_frames_max.unwrap_or(base.n_frames_max),
            platform: self.platform.unwrap_or_else(|| base.platform.clone()),
        }
    }
}

pub(crate) fn validate_topology(topology: &Topology) -> Result<(), ConfigError> {
    if topology.n_atoms == 0 {
        return Err(ConfigError::InvalidParameter {
            parameter: "topology.n_atoms",
            reason: "must be at least 1".to_string(),
        });
    }
    if topology.n_spatial != SPATIAL_DIMENSIONS {
        return Err(ConfigError::InvalidParameter {
            parameter: "topology.n_spatial",
            reason: format!(
                "only {}-dimensional systems are supported, got {}",
                SPATIAL_DIMENSIONS, topology.n_spatial
            ),
        });
    }
    if !topology.atom_names.is_empty() && topology.atom_names.len() != topology.n_atoms {
        return Err(ConfigError::InvalidParameter {
            parameter: "topology.atom_names",
            reason: format!(
                "{} names given for {} atoms",
                topology.atom_names.len(),
                topology.n_atoms
            ),
        });
    }
    Ok(())
}

/// An immutable description of a simulation setup.
///
/// Topology, system and integrator are reference counted so that derived
/// engines share them; whether two configurations use *the same* integrator is
/// decided by pointer identity, see [`EngineConfiguration::integrator`].
pub struct EngineConfiguration<B: Backend> {
    topology: Arc<Topology>,
    system: Arc<B::System>,
    integrator: Arc<B::Integrator>,
    backend_properties: BTreeMap<String, String>,
    options: EngineOptions,
}

impl<B: Backend> Clone for EngineConfiguration<B> {
    fn clone(&self) -> Self {
        Self {
            topology: Arc::clone(&self.topology),
            system: Arc::clone(&self.system),
            integrator: Arc::clone(&self.integrator),
            backend_properties: self.backend_properties.clone(),
            options: self.options.clone(),
        }
    }
}

impl<B: Backend> fmt::Debug for EngineConfiguration<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfiguration")
            .field("topology", &self.topology)
            .field("system", &self.system)
            .field("integrator", &self.integrator)
            .field("backend_properties", &self.backend_properties)
            .field("options", &self.options)
            .finish()
    }
}

impl<B: Backend> EngineConfiguration<B> {
    pub fn builder() -> EngineConfigurationBuilder<B> {
        EngineConfigurationBuilder::new()
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn system(&self) -> &Arc<B::System> {
        &self.system
    }

    pub fn integrator(&self) -> &Arc<B::Integrator> {
        &self.integrator
    }

    pub fn backend_properties(&self) -> &BTreeMap<String, String> {
        &self.backend_properties
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// A configuration sharing this one's topology and system, with the given
    /// replacements applied.
    pub(crate) fn with_overrides(
        &self,
        integrator: Option<Arc<B::Integrator>>,
        backend_properties: Option<BTreeMap<String, String>>,
        options: PartialEngineOptions,
    ) -> Result<Self, ConfigError> {
        let options = options.overlay(&self.options);
        options.validate()?;
        Ok(Self {
            topology: Arc::clone(&self.topology),
            system: Arc::clone(&self.system),
            integrator: integrator.unwrap_or_else(|| Arc::clone(&self.integrator)),
            backend_properties: backend_properties
                .unwrap_or_else(|| self.backend_properties.clone()),
            options,
        })
    }
}

pub struct EngineConfigurationBuilder<B: Backend> {
    topology: Option<Arc<Topology>>,
    system: Option<Arc<B::System>>,
    integrator: Option<Arc<B::Integrator>>,
    backend_properties: BTreeMap<String, String>,
    options: EngineOptions,
}

impl<B: Backend> Default for EngineConfigurationBuilder<B> {
    fn default() -> Self {
        Self {
            topology: None,
            system: None,
            integrator: None,
            backend_properties: BTreeMap::new(),
            options: EngineOptions::default(),
        }
    }
}

impl<B: Backend> EngineConfigurationBuilder<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topology(mut self, topology: impl Into<Arc<Topology>>) -> Self {
        self.topology = Some(topology.into());
        self
    }
    pub fn system(mut self, system: impl Into<Arc<B::System>>) -> Self {
        self.system = Some(system.into());
        self
    }
    pub fn integrator(mut self, integrator: impl Into<Arc<B::Integrator>>) -> Self {
        self.integrator = Some(integrator.into());
        self
    }
    pub fn backend_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.backend_properties.insert(key.into(), value.into());
        self
    }
    pub fn backend_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.backend_properties = properties;
        self
    }
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }
    pub fn n_steps_per_frame(mut self, steps: usize) -> Self {
        self.options.n_steps_per_frame = steps;
        self
    }
    pub fn n_frames_max(mut self, frames: Option<usize>) -> Self {
        self.options.n_frames_max = frames;
        self
    }
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.options.platform = Some(platform.into());
        self
    }

    pub fn build(self) -> Result<EngineConfiguration<B>, ConfigError> {
        let topology = self
            .topology
            .ok_or(ConfigError::MissingParameter("topology"))?;
        validate_topology(&topology)?;
        self.options.validate()?;

        Ok(EngineConfiguration {
            topology,
            system: self.system.ok_or(ConfigError::MissingParameter("system"))?,
            integrator: self
                .integrator
                .ok_or(ConfigError::MissingParameter("integrator"))?,
            backend_properties: self.backend_properties,
            options: self.options,
        })
    }
}
