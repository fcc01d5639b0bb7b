pub mod defaults;
mod file;

use crate::cli::EngineArgs;
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use file::{FileFramesMax, FileIntegrator, FileOptions, FileSystem, FileTopology, parse_frames_max};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use strider::core::backend::reference::{ReferenceBackend, ReferenceIntegrator, ReferenceSystem};
use strider::engine::config::{EngineConfiguration, EngineOptions};
use strider::engine::error::EngineError;
use tracing::debug;

/// An engine configuration file as written by the user; every section is optional
/// until it is merged with the command line.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialEngineConfig {
    topology: Option<FileTopology>,
    system: Option<FileSystem>,
    integrator: Option<FileIntegrator>,
    options: Option<FileOptions>,
    properties: Option<BTreeMap<String, toml::Value>>,
}

fn property_text(value: toml::Value) -> String {
    match value {
        toml::Value::String(text) => text,
        other => other.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

impl PartialEngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading engine configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(
        mut self,
        args: &EngineArgs,
    ) -> Result<EngineConfiguration<ReferenceBackend>> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let system_config = self.system.take().unwrap_or_default();
        let masses = system_config.masses.ok_or_else(|| {
            CliError::Config(
                "A value for 'system.masses' is required in the config file.".to_string(),
            )
        })?;
        let anchors = match system_config.anchors {
            Some(anchors) => anchors,
            None => (0..masses.len()).map(|i| [i as f64 * 0.3, 0.0, 0.0]).collect(),
        };
        let edge = defaults.box_edge;
        let system = ReferenceSystem {
            spring_constant: system_config
                .spring_constant
                .unwrap_or(defaults.spring_constant),
            box_edges: system_config.box_edges.unwrap_or([edge, edge, edge]),
            masses,
            anchors,
        };

        let topology = self
            .topology
            .take()
            .unwrap_or_default()
            .into_topology(system.n_particles())?;

        let step_size = self
            .integrator
            .take()
            .unwrap_or_default()
            .step_size
            .ok_or_else(|| {
                CliError::Config(
                    "A value for 'integrator.step-size' is required either in the config file or via --set."
                        .to_string(),
                )
            })?;

        let file_options = self.options.take().unwrap_or_default();
        let n_frames_max = match (&args.frames_max, &file_options.frames_max) {
            (Some(cli), _) => parse_frames_max(cli)?,
            (None, Some(file)) => file.resolve()?,
            (None, None) => Some(defaults.n_frames_max),
        };
        let options = EngineOptions {
            n_steps_per_frame: args
                .steps_per_frame
                .or(file_options.steps_per_frame)
                .unwrap_or(defaults.n_steps_per_frame),
            n_frames_max,
            platform: args.platform.clone().or(file_options.platform),
        };

        let properties = self
            .properties
            .take()
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, property_text(value)))
            .collect();

        EngineConfiguration::builder()
            .topology(topology)
            .system(system)
            .integrator(ReferenceIntegrator::new(step_size))
            .backend_properties(properties)
            .options(options)
            .build()
            .map_err(|e| EngineError::from(e).into())
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "options.steps-per-frame" => {
                    self.options
                        .get_or_insert_with(Default::default)
                        .steps_per_frame = Some(parse_value(key, value_str, "integer")?);
                }
                "options.frames-max" => {
                    self.options
                        .get_or_insert_with(Default::default)
                        .frames_max = Some(FileFramesMax::Keyword(value_str.to_string()));
                }
                "options.platform" => {
                    self.options
                        .get_or_insert_with(Default::default)
                        .platform = Some(value_str.to_string());
                }
                "integrator.step-size" => {
                    self.integrator
                        .get_or_insert_with(Default::default)
                        .step_size = Some(parse_value(key, value_str, "float")?);
                }
                "system.spring-constant" => {
                    self.system
                        .get_or_insert_with(Default::default)
                        .spring_constant = Some(parse_value(key, value_str, "float")?);
                }
                _ => {
                    if let Some(property) = key.strip_prefix("properties.") {
                        self.properties
                            .get_or_insert_with(Default::default)
                            .insert(
                                property.to_string(),
                                toml::Value::String(value_str.to_string()),
                            );
                        continue;
                    }
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;
    use strider::engine::config::ConfigError;
    use tempfile::{TempDir, tempdir};

    const BASE_CONFIG: &str = r#"
        [topology]
        atom-names = ["Ar1", "Ar2"]

        [system]
        masses = [39.9, 39.9]
        anchors = [[0.0, 0.0, 0.0], [0.4, 0.0, 0.0]]
        spring-constant = 500.0

        [integrator]
        step-size = 0.002

        [options]
        steps-per-frame = 25
        platform = "Reference"

        [properties]
        Threads = 2
    "#;

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let file_path = dir.path().join("engine.toml");
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn engine_args(config_path: &Path, extra: &[&str]) -> EngineArgs {
        let mut args = vec![
            "strider".to_string(),
            "persist".to_string(),
            "-c".to_string(),
            config_path.to_str().unwrap().to_string(),
            "-o".to_string(),
            "record.toml".to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(args).command {
            Commands::Persist(persist) => persist.engine,
            _ => panic!("Expected 'persist' subcommand"),
        }
    }

    fn load(content: &str, extra: &[&str]) -> Result<EngineConfiguration<ReferenceBackend>> {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, content);
        let args = engine_args(&path, extra);
        PartialEngineConfig::from_file(&path)?.merge_with_cli(&args)
    }

    #[test]
    fn file_values_are_used() {
        let config = load(BASE_CONFIG, &[]).unwrap();

        assert_eq!(config.topology().n_atoms, 2);
        assert_eq!(config.topology().atom_name(1), Some("Ar2"));
        assert_eq!(config.system().spring_constant, 500.0);
        assert_eq!(config.system().box_edges, [3.0, 3.0, 3.0]);
        assert_eq!(config.integrator().step_size, 0.002);
        assert_eq!(config.options().n_steps_per_frame, 25);
        assert_eq!(config.options().n_frames_max, Some(5000));
        assert_eq!(config.options().platform.as_deref(), Some("Reference"));
        assert_eq!(
            config.backend_properties().get("Threads").map(String::as_str),
            Some("2")
        );
    }

    #[test]
    fn cli_args_override_file_values() {
        let config = load(
            BASE_CONFIG,
            &[
                "--steps-per-frame",
                "7",
                "--platform",
                "CPU",
                "--frames-max",
                "unbounded",
            ],
        )
        .unwrap();

        assert_eq!(config.options().n_steps_per_frame, 7);
        assert_eq!(config.options().platform.as_deref(), Some("CPU"));
        assert_eq!(config.options().n_frames_max, None);
    }

    #[test]
    fn set_values_override_file_values() {
        let config = load(
            BASE_CONFIG,
            &[
                "-S",
                "integrator.step-size=0.001",
                "-S",
                "options.frames-max=40",
                "-S",
                "properties.Threads=4",
            ],
        )
        .unwrap();

        assert_eq!(config.integrator().step_size, 0.001);
        assert_eq!(config.options().n_frames_max, Some(40));
        assert_eq!(
            config.backend_properties().get("Threads").map(String::as_str),
            Some("4")
        );
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let config = load(
            "[system]\nmasses = [1.0, 1.0, 1.0]\n[integrator]\nstep-size = 0.004\n",
            &[],
        )
        .unwrap();

        assert_eq!(config.topology().n_atoms, 3);
        assert_eq!(config.system().anchors.len(), 3);
        assert_eq!(config.options().n_steps_per_frame, 10);
        assert!(config.backend_properties().is_empty());
    }

    #[test]
    fn missing_step_size_is_a_config_error() {
        let result = load("[system]\nmasses = [1.0]\n", &[]);
        assert!(matches!(result, Err(CliError::Config(ref msg)) if msg.contains("step-size")));
    }

    #[test]
    fn missing_masses_is_a_config_error() {
        let result = load("[integrator]\nstep-size = 0.002\n", &[]);
        assert!(matches!(result, Err(CliError::Config(ref msg)) if msg.contains("masses")));
    }

    #[test]
    fn unknown_set_key_is_rejected() {
        let result = load(BASE_CONFIG, &["-S", "system.charge=1"]);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn malformed_set_pair_is_rejected() {
        let result = load(BASE_CONFIG, &["-S", "integrator.step-size"]);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn unknown_section_fails_to_parse() {
        let result = load("[thermostat]\ntemperature = 300\n", &[]);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn zero_steps_per_frame_is_rejected_by_the_engine() {
        let result = load(BASE_CONFIG, &["--steps-per-frame", "0"]);
        assert!(matches!(
            result,
            Err(CliError::Engine(EngineError::Config {
                source: ConfigError::InvalidParameter { .. }
            }))
        ));
    }
}
