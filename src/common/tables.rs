//! ASCII table formatting for aggregate statistics and speedups
//!
//! This module provides shared functionality for text summaries:
//! - A bucket by configuration grid of statistics built with [`tabled::builder::Builder`]
//! - [`SpeedupEntry`] rows for per-bucket speedups
//!
//! Both are rendered with the [`tabled`] crate.

use crate::analysis::aggregate::Aggregates;
use crate::analysis::speedup::{Speedup, SpeedupMode};
use crate::common::constants::format_tick_count;
use crate::common::data_structures::Bucket;
use std::collections::BTreeSet;
use tabled::builder::Builder;
use tabled::{Table, Tabled};

/// Represents a single speedup row with its bucket, compared values and result
#[derive(Debug, Clone, Tabled)]
pub struct SpeedupEntry {
    /// Bucket label (e.g., "2^28")
    #[tabled(rename = "Bucket")]
    pub bucket: String,
    /// Numerator statistic
    #[tabled(rename = "Numerator")]
    pub numerator: String,
    /// Denominator statistic
    #[tabled(rename = "Denominator")]
    pub denominator: String,
    /// Formatted speedup
    #[tabled(rename = "Speedup")]
    pub speedup: String,
}

impl SpeedupEntry {
    /// Creates a new speedup entry, formatting the value according to `mode`
    pub fn new(speedup: &Speedup, mode: SpeedupMode) -> Self {
        let formatted = match mode {
            SpeedupMode::Ratio => format!("{:.3}x", speedup.value),
            SpeedupMode::Percent => format!("{:.2}%", speedup.value),
        };

        Self {
            bucket: speedup.bucket.label(),
            numerator: format!("{:.1}", speedup.numerator),
            denominator: format!("{:.1}", speedup.denominator),
            speedup: formatted,
        }
    }
}

fn with_title(title: Option<&str>, table: String) -> String {
    if let Some(title) = title {
        format!("{}\n{}\n{}", title, "=".repeat(title.chars().count()), table)
    } else {
        table
    }
}

/// Formats aggregates as a bucket by configuration grid.
///
/// Each cell holds the exact statistic followed by its short tick form and the
/// sample count, e.g. `19349135199.8 (19G, n=5)`. Buckets without a value for a
/// configuration are shown as `-`.
///
/// # Arguments
/// * `aggregates` - The reduced statistics
/// * `configurations` - Columns to show, in order
/// * `title` - Optional title for the table
pub fn format_aggregate_table(
    aggregates: &Aggregates,
    configurations: &[&str],
    title: Option<&str>,
) -> String {
    let buckets: BTreeSet<Bucket> = configurations
        .iter()
        .filter_map(|configuration| aggregates.entries(configuration))
        .flat_map(|entries| entries.keys().copied())
        .collect();

    if buckets.is_empty() {
        return "No data available for tabulation".to_string();
    }

    let mut builder = Builder::default();
    let mut header = vec![format!("Bucket ({})", aggregates.statistic())];
    header.extend(configurations.iter().map(|name| name.to_string()));
    builder.push_record(header);

    for bucket in buckets {
        let mut record = vec![bucket.label()];
        for configuration in configurations {
            let cell = aggregates
                .entries(configuration)
                .and_then(|entries| entries.get(&bucket))
                .map(|entry| {
                    format!(
                        "{:.1} ({}, n={})",
                        entry.value,
                        format_tick_count(entry.value),
                        entry.samples
                    )
                })
                .unwrap_or_else(|| "-".to_string());
            record.push(cell);
        }
        builder.push_record(record);
    }

    with_title(title, builder.build().to_string())
}

/// Formats speedups as an ASCII table
///
/// # Arguments
/// * `speedups` - Per-bucket speedups
/// * `mode` - Mode the speedups were computed with
/// * `title` - Optional title for the table
pub fn format_speedup_table(speedups: &[Speedup], mode: SpeedupMode, title: Option<&str>) -> String {
    if speedups.is_empty() {
        return "No data available for tabulation".to_string();
    }

    let entries: Vec<SpeedupEntry> = speedups
        .iter()
        .map(|speedup| SpeedupEntry::new(speedup, mode))
        .collect();

    with_title(title, Table::new(entries).to_string())
}
