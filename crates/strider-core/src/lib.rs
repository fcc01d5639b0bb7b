//! # Strider Core Library
//!
//! Drives an external molecular-dynamics backend one frame at a time and keeps the
//! expensive parts of that interaction, session creation and state transfer, out of
//! the caller's way.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Plain data models (`Snapshot`, `Topology`) and the
//!   collaborator traits a simulation backend implements (`Backend`, `Session`),
//!   together with an in-process reference backend.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer. `DynamicsEngine` owns a lazily
//!   created session, a single cached current snapshot with strict invalidation rules,
//!   the session-reuse policy for derived engines, and the persisted configuration record.
//!
//! - **[`workflows`]: The Public API.** Complete procedures built on the engine, such as
//!   generating a trajectory with divergence detection.

pub mod core;
pub mod engine;
pub mod workflows;
