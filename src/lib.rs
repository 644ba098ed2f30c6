//! # sortbench-plots
//! Turns recorded clock-tick measurements of sorting benchmarks into charts.
//!
//! The pipeline is three steps deep: load a [`ResultTable`], reduce it with
//! [`aggregate`], then draw it with [`render_chart`]. The [`report`] module
//! wires those steps to a TOML [`manifest`].
//!
//! [`ResultTable`]: common::data_structures::ResultTable
//! [`aggregate`]: analysis::aggregate::aggregate
//! [`render_chart`]: common::plots::render_chart

/// Shared data model, unit constants, table formatting and chart rendering.
pub mod common;

/// Reduction of raw measurements into per-bucket statistics and speedups.
pub mod analysis;

/// Loading of result files and inline sample tables.
pub mod parsing;

/// The TOML plot manifest describing datasets and charts.
pub mod manifest;

/// End to end rendering of manifests, comparisons and summaries.
pub mod report;

pub use report::ReportError;
