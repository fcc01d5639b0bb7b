use crate::error::{CliError, Result};
use serde::Deserialize;
use strider::core::models::topology::Topology;

pub const UNBOUNDED_KEYWORD: &str = "unbounded";

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileTopology {
    pub n_atoms: Option<usize>,
    pub atom_names: Option<Vec<String>>,
}

impl FileTopology {
    /// Resolves the topology, taking the atom count from the system when the file gives none.
    pub fn into_topology(self, n_particles: usize) -> Result<Topology> {
        let topology = match self.atom_names {
            Some(names) => Topology::with_atom_names(names),
            None => Topology::new(self.n_atoms.unwrap_or(n_particles)),
        };
        if let Some(n_atoms) = self.n_atoms {
            if n_atoms != topology.n_atoms {
                return Err(CliError::Config(format!(
                    "'topology.n-atoms' is {} but {} atom names were given.",
                    n_atoms, topology.n_atoms
                )));
            }
        }
        Ok(topology)
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSystem {
    pub masses: Option<Vec<f64>>,
    pub anchors: Option<Vec<[f64; 3]>>,
    pub spring_constant: Option<f64>,
    pub box_edges: Option<[f64; 3]>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileIntegrator {
    pub step_size: Option<f64>,
}

/// `frames-max` is either a count or the keyword `"unbounded"`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FileFramesMax {
    Count(usize),
    Keyword(String),
}

impl FileFramesMax {
    pub fn resolve(&self) -> Result<Option<usize>> {
        match self {
            FileFramesMax::Count(n) => Ok(Some(*n)),
            FileFramesMax::Keyword(word) => parse_frames_max(word),
        }
    }
}

pub fn parse_frames_max(value: &str) -> Result<Option<usize>> {
    if value.eq_ignore_ascii_case(UNBOUNDED_KEYWORD) {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| {
        CliError::Argument(format!(
            "Invalid frame limit '{}'. Expected a positive integer or '{}'.",
            value, UNBOUNDED_KEYWORD
        ))
    })
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOptions {
    pub steps_per_frame: Option<usize>,
    pub frames_max: Option<FileFramesMax>,
    pub platform: Option<String>,
}
