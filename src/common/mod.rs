//! Common infrastructure modules shared across the pipeline
//!
//! This module provides reusable infrastructure for:
//! - Data structures for benchmark measurements
//! - Clock tick unit constants and label formatting
//! - ASCII table formatting
//! - Plotting line, bar and speedup charts

pub mod constants;
pub mod data_structures;
pub mod plots;
pub mod tables;

// Re-export commonly used items
pub use data_structures::{Bucket, Measurement, ResultTable};
pub use plots::PlotError;
