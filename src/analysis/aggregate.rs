//! Grouping of raw measurements and reduction to a central-tendency statistic
//!
//! Every (configuration, bucket) group of a [`ResultTable`] is reduced to a
//! single `f64` using the configured [`Statistic`]. Results are kept in
//! [`BTreeMap`]s so buckets come out in ascending order for plotting.

use crate::analysis::speedup::{compute_speedup, Speedup, SpeedupError, SpeedupMode};
use crate::common::data_structures::{Bucket, ResultTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during aggregation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Sample group for '{configuration}' at {bucket} is empty")]
    EmptyGroup {
        configuration: String,
        bucket: Bucket,
    },

    #[error("Cannot reduce an empty list of samples")]
    NoSamples,

    #[error("Unknown configuration '{0}'")]
    UnknownConfiguration(String),

    #[error("Unknown statistic '{0}', expected 'mean' or 'median'")]
    UnknownStatistic(String),
}

type Result<T> = core::result::Result<T, AggregateError>;

/// Central-tendency statistic used to reduce a sample group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Mean,
    Median,
}

impl Statistic {
    /// Reduces `samples` to a single value.
    ///
    /// The mean sums in `u128`, so large tick counts cannot overflow.
    pub fn compute(self, samples: &[u64]) -> Result<f64> {
        if samples.is_empty() {
            return Err(AggregateError::NoSamples);
        }

        match self {
            Statistic::Mean => {
                let sum: u128 = samples.iter().map(|&value| value as u128).sum();
                Ok(sum as f64 / samples.len() as f64)
            }
            Statistic::Median => {
                let mut sorted = samples.to_vec();
                sorted.sort_unstable();

                let middle = sorted.len() / 2;
                if sorted.len() % 2 == 1 {
                    Ok(sorted[middle] as f64)
                } else {
                    let pair = sorted[middle - 1] as u128 + sorted[middle] as u128;
                    Ok(pair as f64 / 2.0)
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Median => "median",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Statistic {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "average" => Ok(Statistic::Mean),
            "median" => Ok(Statistic::Median),
            _ => Err(AggregateError::UnknownStatistic(s.to_string())),
        }
    }
}

/// One reduced group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateValue {
    /// The reduced statistic
    pub value: f64,
    /// Number of samples the statistic was computed from
    pub samples: usize,
}

/// Statistic per (configuration, bucket).
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    statistic: Statistic,
    values: BTreeMap<String, BTreeMap<Bucket, AggregateValue>>,
}

impl Aggregates {
    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    /// Configuration names in sorted order.
    pub fn configurations(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn get(&self, configuration: &str, bucket: Bucket) -> Option<f64> {
        self.values
            .get(configuration)
            .and_then(|series| series.get(&bucket))
            .map(|entry| entry.value)
    }

    /// Reduced groups of one configuration, including sample counts.
    pub fn entries(&self, configuration: &str) -> Option<&BTreeMap<Bucket, AggregateValue>> {
        self.values.get(configuration)
    }

    /// Bucket to statistic mapping of one configuration.
    pub fn series(&self, configuration: &str) -> Option<BTreeMap<Bucket, f64>> {
        self.values.get(configuration).map(|series| {
            series
                .iter()
                .map(|(bucket, entry)| (*bucket, entry.value))
                .collect()
        })
    }

    /// Same as [`Aggregates::series`], but an unknown configuration is an error.
    pub fn require_series(&self, configuration: &str) -> Result<BTreeMap<Bucket, f64>> {
        self.series(configuration)
            .ok_or_else(|| AggregateError::UnknownConfiguration(configuration.to_string()))
    }

    /// Per-bucket speedup of `numerator` over `denominator`.
    pub fn speedup(
        &self,
        numerator: &str,
        denominator: &str,
        mode: SpeedupMode,
    ) -> core::result::Result<Vec<Speedup>, SpeedupError> {
        let numerator_series = self.require_series(numerator)?;
        let denominator_series = self.require_series(denominator)?;
        compute_speedup(&numerator_series, &denominator_series, mode)
    }
}

/// Groups the table by (configuration, bucket) and reduces each group.
///
/// # Arguments
/// * `table` - Loaded measurements
/// * `statistic` - Statistic applied to every group
///
/// # Returns
/// * `Ok(Aggregates)` - One value per group, buckets in ascending order
/// * `Err(AggregateError::EmptyGroup)` - If a declared group has no samples
pub fn aggregate(table: &ResultTable, statistic: Statistic) -> Result<Aggregates> {
    let mut values: BTreeMap<String, BTreeMap<Bucket, AggregateValue>> = BTreeMap::new();

    for (key, samples) in table.groups() {
        let value = statistic
            .compute(&samples)
            .map_err(|_| AggregateError::EmptyGroup {
                configuration: key.configuration.clone(),
                bucket: key.bucket,
            })?;

        debug!(
            configuration = %key.configuration,
            bucket = %key.bucket,
            samples = samples.len(),
            value,
            "reduced sample group with {}",
            statistic
        );

        values.entry(key.configuration).or_default().insert(
            key.bucket,
            AggregateValue {
                value,
                samples: samples.len(),
            },
        );
    }

    Ok(Aggregates { statistic, values })
}
