//! Vigil control plane.
//!
//! Wires the anomaly engine, alert lifecycle manager, and remediation
//! orchestrator into one long-lived instance with explicitly injected
//! collaborators (store, notifier, infrastructure control, metrics).
//! Ingestion entry points are fire-and-forget; administrative operations
//! return explicit results.

pub mod builder;
pub mod core;
pub mod error;

pub use builder::VigilBuilder;
pub use core::Vigil;
pub use error::{ControlError, Result};
