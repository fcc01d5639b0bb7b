use crate::core::backend::BackendState;
use nalgebra::{Point3, Vector3};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of spatial dimensions every snapshot carries per atom.
pub const SPATIAL_DIMENSIONS: usize = 3;

/// Identity of a single engine instance.
///
/// Snapshots record the id of the engine that built them. The id is only ever
/// compared by value; it does not keep the engine alive and cannot be used to
/// reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineId(u64);

impl EngineId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine-{}", self.0)
    }
}

/// The three periodic box vectors of a simulation cell, in nanometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxVectors {
    pub a: Vector3<f64>,
    pub b: Vector3<f64>,
    pub c: Vector3<f64>,
}

impl BoxVectors {
    pub fn new(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Self {
        Self { a, b, c }
    }

    /// An orthorhombic cell with the given edge lengths.
    pub fn orthorhombic(x: f64, y: f64, z: f64) -> Self {
        Self {
            a: Vector3::new(x, 0.0, 0.0),
            b: Vector3::new(0.0, y, 0.0),
            c: Vector3::new(0.0, 0.0, z),
        }
    }

    pub fn cubic(edge: f64) -> Self {
        Self::orthorhombic(edge, edge, edge)
    }

    /// Cell volume in cubic nanometers.
    pub fn volume(&self) -> f64 {
        self.a.dot(&self.b.cross(&self.c)).abs()
    }
}

/// Shape of the per-atom arrays a snapshot must have to fit an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotDescriptor {
    pub n_atoms: usize,
    pub n_spatial: usize,
}

impl fmt::Display for SnapshotDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} atoms x {} dimensions", self.n_atoms, self.n_spatial)
    }
}

/// An immutable point-in-time physical state.
///
/// Coordinates are in nanometers, velocities in nanometers per picosecond and
/// energies in kJ/mol. Snapshots built by an engine carry that engine's
/// [`EngineId`]; snapshots created with [`Snapshot::new`] carry none and are
/// treated as external input wherever provenance matters.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    coordinates: Vec<Point3<f64>>,
    velocities: Vec<Vector3<f64>>,
    box_vectors: BoxVectors,
    potential_energy: Option<f64>,
    kinetic_energy: Option<f64>,
    engine: Option<EngineId>,
}

impl Snapshot {
    /// Creates an untagged snapshot from caller-supplied arrays.
    pub fn new(
        coordinates: Vec<Point3<f64>>,
        velocities: Vec<Vector3<f64>>,
        box_vectors: BoxVectors,
    ) -> Self {
        Self {
            coordinates,
            velocities,
            box_vectors,
            potential_energy: None,
            kinetic_energy: None,
            engine: None,
        }
    }

    pub(crate) fn from_state(state: BackendState, engine: EngineId) -> Self {
        Self {
            coordinates: state.positions,
            velocities: state.velocities,
            box_vectors: state.box_vectors,
            potential_energy: Some(state.potential_energy),
            kinetic_energy: Some(state.kinetic_energy),
            engine: Some(engine),
        }
    }

    pub fn coordinates(&self) -> &[Point3<f64>] {
        &self.coordinates
    }

    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }

    pub fn box_vectors(&self) -> &BoxVectors {
        &self.box_vectors
    }

    pub fn potential_energy(&self) -> Option<f64> {
        self.potential_energy
    }

    pub fn kinetic_energy(&self) -> Option<f64> {
        self.kinetic_energy
    }

    /// Sum of potential and kinetic energy, if both were recorded.
    pub fn total_energy(&self) -> Option<f64> {
        Some(self.potential_energy? + self.kinetic_energy?)
    }

    /// The engine this snapshot was built by, if any.
    pub fn engine(&self) -> Option<EngineId> {
        self.engine
    }

    pub fn n_atoms(&self) -> usize {
        self.coordinates.len()
    }

    pub fn descriptor(&self) -> SnapshotDescriptor {
        SnapshotDescriptor {
            n_atoms: self.coordinates.len(),
            n_spatial: SPATIAL_DIMENSIONS,
        }
    }

    /// Returns a copy of this snapshot with the provenance tag removed.
    pub fn untagged(&self) -> Self {
        Self {
            engine: None,
            ..self.clone()
        }
    }
}
