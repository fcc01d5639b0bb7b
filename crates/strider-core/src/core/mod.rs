//! # Core Module
//!
//! Stateless building blocks shared by the engine and workflows.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Snapshots, box vectors, engine identities and topology
//! - **Backend Boundary** ([`backend`]) - The traits a simulation backend implements, plus
//!   the in-process [`backend::reference`] implementation
//!
//! Nothing in this module holds a live session; that is the engine's job.

pub mod backend;
pub mod models;
