//! # Engine Module
//!
//! The stateful layer between callers and a simulation backend.
//!
//! ## Overview
//!
//! A [`DynamicsEngine`](dynamics::DynamicsEngine) binds a configuration (topology,
//! system, integrator, backend properties and options) to a lazily created backend
//! session. It hands out immutable snapshots of the current state and keeps exactly
//! one of them cached, so repeated reads never cross the backend boundary.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Options, overlays and the configuration builder
//! - **Engine** ([`dynamics`]) - Session lifecycle, snapshot reads and writes, derivation
//! - **Persistence** ([`persist`]) - The serializable configuration record
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Validity** ([`validity`]) - Divergence detection on snapshots
//! - **Error Handling** ([`error`]) - Engine error types
//!
//! ## Cache Rules
//!
//! - Reads between mutations return the same `Arc<Snapshot>`.
//! - Stepping, minimizing, writing a state and resetting all invalidate the cache.
//! - A written snapshot is cached directly only if this engine built it; anything
//!   else is re-read from the backend after the write.

pub(crate) mod cache;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod persist;
pub mod progress;
pub(crate) mod session;
pub mod validity;

pub use dynamics::{DynamicsEngine, EngineOverrides};
pub use session::FASTEST_PLATFORM;
