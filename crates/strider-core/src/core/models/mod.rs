//! # Core Models Module
//!
//! Value types describing what a simulation looks like from the outside.
//!
//! ## Key Components
//!
//! - [`snapshot`] - Immutable point-in-time physical state with a provenance tag
//! - [`topology`] - Atom count and spatial dimensionality of the simulated system
//!
//! ## Usage
//!
//! ```ignore
//! use strider::core::models::snapshot::{BoxVectors, Snapshot};
//! use nalgebra::{Point3, Vector3};
//!
//! let snapshot = Snapshot::new(
//!     vec![Point3::origin()],
//!     vec![Vector3::zeros()],
//!     BoxVectors::cubic(3.0),
//! );
//! assert_eq!(snapshot.n_atoms(), 1);
//! ```

pub mod snapshot;
pub mod topology;
