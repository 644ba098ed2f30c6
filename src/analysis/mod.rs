//! Reduction of measurements into statistics
//!
//! This module contains the numeric core of the pipeline:
//! - Grouping and reducing samples (mean/median)
//! - Per-bucket speedups between two configurations

pub mod aggregate;
pub mod speedup;

// Re-export analysis functions for convenience
pub use aggregate::{aggregate, AggregateError, Aggregates, Statistic};
pub use speedup::{compute_speedup, Speedup, SpeedupError, SpeedupMode};
