use super::config::{EngineConfiguration, EngineOptions, validate_topology};
use super::error::EngineError;
use crate::core::backend::{Backend, BackendError};
use crate::core::models::topology::Topology;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options assumed for a record without an `[options]` table. A missing frame
/// limit reads as unbounded here, same as inside an `[options]` table.
fn persisted_default_options() -> EngineOptions {
    EngineOptions {
        n_frames_max: None,
        ..EngineOptions::default()
    }
}

/// The persisted form of an engine: configuration only, never session state.
///
/// `system_spec` and `integrator_spec` are produced by the backend's interchange
/// codec and are not interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedEngine {
    pub system_spec: String,
    pub integrator_spec: String,
    pub topology: Topology,
    #[serde(default = "persisted_default_options")]
    pub options: EngineOptions,
    #[serde(default)]
    pub backend_properties: BTreeMap<String, String>,
}

fn codec_error(source: BackendError) -> EngineError {
    EngineError::Serialization(source.to_string())
}

impl PersistedEngine {
    pub fn encode<B: Backend>(
        backend: &B,
        config: &EngineConfiguration<B>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            system_spec: backend.encode_system(config.system()).map_err(codec_error)?,
            integrator_spec: backend
                .encode_integrator(config.integrator())
                .map_err(codec_error)?,
            topology: Topology::clone(config.topology()),
            options: config.options().clone(),
            backend_properties: config.backend_properties().clone(),
        })
    }

    /// Rebuilds the configuration. Nothing is constructed if any part fails to decode.
    pub fn decode<B: Backend>(&self, backend: &B) -> Result<EngineConfiguration<B>, EngineError> {
        let system = backend
            .decode_system(&self.system_spec)
            .map_err(codec_error)?;
        let integrator = backend
            .decode_integrator(&self.integrator_spec)
            .map_err(codec_error)?;
        validate_topology(&self.topology)?;

        Ok(EngineConfiguration::builder()
            .topology(self.topology.clone())
            .system(Arc::new(system))
            .integrator(Arc::new(integrator))
            .backend_properties(self.backend_properties.clone())
            .options(self.options.clone())
            .build()?)
    }

    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string(self).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    pub fn from_toml(text: &str) -> Result<Self, EngineError> {
        toml::from_str(text).map_err(|e| EngineError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::reference::{ReferenceBackend, ReferenceIntegrator, ReferenceSystem};
    use crate::engine::config::{ConfigError, DEFAULT_STEPS_PER_FRAME};

    fn config() -> EngineConfiguration<ReferenceBackend> {
        EngineConfiguration::builder()
            .topology(Topology::with_atom_names(["Ar1", "Ar2"]))
            .system(ReferenceSystem {
                masses: vec![39.9, 39.9],
                anchors: vec![[0.0, 0.0, 0.0], [0.4, 0.0, 0.0]],
                spring_constant: 500.0,
                box_edges: [2.0, 2.0, 2.0],
            })
            .integrator(ReferenceIntegrator::new(0.002))
            .backend_property("Threads", "2")
            .n_steps_per_frame(25)
            .platform("CPU")
            .build()
            .unwrap()
    }

    #[test]
    fn encode_then_decode_preserves_configuration() {
        let backend = ReferenceBackend::default();
        let original = config();

        let record = PersistedEngine::encode(&backend, &original).unwrap();
        let restored = record.decode(&backend).unwrap();

        assert_eq!(restored.topology(), original.topology());
        assert_eq!(restored.options(), original.options());
        assert_eq!(restored.backend_properties(), original.backend_properties());
        assert_eq!(**restored.system(), **original.system());
        assert_eq!(**restored.integrator(), **original.integrator());
    }

    #[test]
    fn toml_text_survives_a_round_trip() {
        let backend = ReferenceBackend::default();
        let record = PersistedEngine::encode(&backend, &config()).unwrap();

        let text = record.to_toml().unwrap();
        let parsed = PersistedEngine::from_toml(&text).unwrap();

        assert_eq!(parsed, record);
    }

    #[test]
    fn unbounded_frames_survive_a_round_trip() {
        let backend = ReferenceBackend::default();
        let mut record = PersistedEngine::encode(&backend, &config()).unwrap();
        record.options.n_frames_max = None;

        let parsed = PersistedEngine::from_toml(&record.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.options.n_frames_max, None);
    }

    #[test]
    fn malformed_system_spec_is_a_serialization_error() {
        let backend = ReferenceBackend::default();
        let mut record = PersistedEngine::encode(&backend, &config()).unwrap();
        record.system_spec = "masses = \"heavy\"".to_string();

        let result = record.decode(&backend);
        assert!(matches!(result, Err(EngineError::Serialization(_))));
    }

    #[test]
    fn malformed_toml_is_a_serialization_error() {
        let result = PersistedEngine::from_toml("system_spec = ");
        assert!(matches!(result, Err(EngineError::Serialization(_))));
    }

    #[test]
    fn invalid_options_are_a_config_error() {
        let backend = ReferenceBackend::default();
        let mut record = PersistedEngine::encode(&backend, &config()).unwrap();
        record.options.n_steps_per_frame = 0;

        let result = record.decode(&backend);
        assert!(matches!(
            result,
            Err(EngineError::Config {
                source: ConfigError::InvalidParameter { .. }
            })
        ));
    }

    fn minimal_record_text(extra: &str) -> String {
        let backend = ReferenceBackend::default();
        let record = PersistedEngine::encode(&backend, &config()).unwrap();
        format!(
            "system_spec = {:?}\nintegrator_spec = {:?}\n{}[topology]\nn_atoms = 2\n",
            record.system_spec, record.integrator_spec, extra
        )
    }

    #[test]
    fn missing_options_table_means_unbounded_frames() {
        let parsed = PersistedEngine::from_toml(&minimal_record_text("")).unwrap();

        assert_eq!(parsed.options.n_steps_per_frame, DEFAULT_STEPS_PER_FRAME);
        assert_eq!(parsed.options.n_frames_max, None);
        assert_eq!(parsed.options.platform, None);
        assert!(parsed.backend_properties.is_empty());
    }

    #[test]
    fn options_table_without_frame_limit_means_unbounded_frames() {
        let text = minimal_record_text("[options]\nn_steps_per_frame = 4\n\n");

        let parsed = PersistedEngine::from_toml(&text).unwrap();

        assert_eq!(parsed.options.n_steps_per_frame, 4);
        assert_eq!(parsed.options.n_frames_max, None);
    }

    #[test]
    fn record_written_to_disk_restores_the_same_configuration() {
        let backend = ReferenceBackend::default();
        let original = config();
        let record = PersistedEngine::encode(&backend, &original).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine-record.toml");
        std::fs::write(&path, record.to_toml().unwrap()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let restored = PersistedEngine::from_toml(&text)
            .unwrap()
            .decode(&backend)
            .unwrap();

        assert_eq!(restored.topology(), original.topology());
        assert_eq!(restored.options(), original.options());
        assert_eq!(restored.backend_properties(), original.backend_properties());
        assert_eq!(**restored.integrator(), **original.integrator());
    }
}
