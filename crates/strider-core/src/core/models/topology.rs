use super::snapshot::{SPATIAL_DIMENSIONS, SnapshotDescriptor};
use serde::{Deserialize, Serialize};

fn default_n_spatial() -> usize {
    SPATIAL_DIMENSIONS
}

/// The parts of a molecular topology the engine cares about.
///
/// Building a topology (bonds, residues, force-field typing) belongs to whoever
/// constructs the backend's system; this type only carries the dimensions every
/// snapshot of the system must agree with, plus optional atom labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    pub n_atoms: usize,
    #[serde(default = "default_n_spatial")]
    pub n_spatial: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub atom_names: Vec<String>,
}

impl Topology {
    pub fn new(n_atoms: usize) -> Self {
        Self {
            n_atoms,
            n_spatial: SPATIAL_DIMENSIONS,
            atom_names: Vec::new(),
        }
    }

    /// Builds a topology whose atom count is the number of names given.
    pub fn with_atom_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let atom_names: Vec<String> = names.into_iter().map(Into::into).collect();
        Self {
            n_atoms: atom_names.len(),
            n_spatial: SPATIAL_DIMENSIONS,
            atom_names,
        }
    }

    pub fn descriptor(&self) -> SnapshotDescriptor {
        SnapshotDescriptor {
            n_atoms: self.n_atoms,
            n_spatial: self.n_spatial,
        }
    }

    pub fn atom_name(&self, index: usize) -> Option<&str> {
        self.atom_names.get(index).map(String::as_str)
    }
}
