//! # Workflows Module
//!
//! Complete procedures built on top of a [`DynamicsEngine`](crate::engine::DynamicsEngine).
//!
//! ## Architecture
//!
//! - **Trajectory Workflow** ([`trajectory`]) - Generates a sequence of frames from a
//!   starting state, honoring the engine's frame limit and stopping at the first
//!   diverged frame.

pub mod trajectory;
