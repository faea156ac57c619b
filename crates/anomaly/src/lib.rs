//! Statistical anomaly engine.
//!
//! Maintains one online statistical model, one seasonal pattern, and one
//! bounded learning buffer per metric key, and grades incoming samples
//! into anomaly events. Detection combines a raw z-score with a
//! seasonally-adjusted z-score; the final score is the minimum of the
//! two, so seasonal context can lower a severity but never raise it.
//! Fixed business-rule overrides for well-known metric names can fire
//! independently of the statistical test.

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod seasonal;

pub use config::DetectorConfig;
pub use engine::AnomalyEngine;
pub use error::{AnomalyError, Result};
pub use model::StatisticalModel;
pub use seasonal::SeasonalPattern;
