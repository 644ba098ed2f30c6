//! Per-bucket speedup between two configurations
//!
//! Given the statistics of a numerator and a denominator configuration, this
//! produces one ratio (or percentage difference) per bucket. The two inputs must
//! cover exactly the same buckets; a mismatch is reported instead of dropped.

use crate::analysis::aggregate::AggregateError;
use crate::common::data_structures::Bucket;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which of the two compared series lacks a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Numerator,
    Denominator,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Numerator => f.write_str("numerator"),
            Side::Denominator => f.write_str("denominator"),
        }
    }
}

/// Errors that can occur while computing speedups
#[derive(Error, Debug, PartialEq)]
pub enum SpeedupError {
    #[error("Bucket {bucket} is missing from the {side} series")]
    MissingBucket { bucket: Bucket, side: Side },

    #[error("Denominator statistic is zero at bucket {0}")]
    ZeroDenominator(Bucket),

    #[error("Speedup at bucket {bucket} is not finite ({numerator} / {denominator})")]
    NonFinite {
        bucket: Bucket,
        numerator: f64,
        denominator: f64,
    },

    #[error("There are no buckets to compare")]
    NoBuckets,

    #[error("Unknown speedup mode '{0}', expected 'ratio' or 'percent'")]
    UnknownMode(String),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

type Result<T> = core::result::Result<T, SpeedupError>;

/// How two statistics are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedupMode {
    /// `numerator / denominator`
    #[default]
    Ratio,
    /// `(numerator - denominator) / denominator * 100`
    Percent,
}

impl SpeedupMode {
    fn apply(self, numerator: f64, denominator: f64) -> f64 {
        match self {
            SpeedupMode::Ratio => numerator / denominator,
            SpeedupMode::Percent => (numerator - denominator) / denominator * 100.0,
        }
    }

    /// Default axis description for values in this mode.
    pub fn axis_label(&self) -> &'static str {
        match self {
            SpeedupMode::Ratio => "Speedup (x faster)",
            SpeedupMode::Percent => "Percentage Speedup (%)",
        }
    }
}

impl FromStr for SpeedupMode {
    type Err = SpeedupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ratio" => Ok(SpeedupMode::Ratio),
            "percent" | "percentage" => Ok(SpeedupMode::Percent),
            _ => Err(SpeedupError::UnknownMode(s.to_string())),
        }
    }
}

/// Speedup at a single bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Speedup {
    pub bucket: Bucket,
    pub numerator: f64,
    pub denominator: f64,
    pub value: f64,
}

/// Computes the per-bucket speedup of `numerator` over `denominator`.
///
/// # Arguments
/// * `numerator` - Bucket to statistic mapping of the first configuration
/// * `denominator` - Bucket to statistic mapping of the second configuration
/// * `mode` - Ratio or percentage difference
///
/// # Returns
/// * `Ok(Vec<Speedup>)` - One entry per bucket, ascending
/// * `Err(SpeedupError)` - If a bucket is missing on either side, a denominator is zero,
///   or a result would not be finite
pub fn compute_speedup(
    numerator: &BTreeMap<Bucket, f64>,
    denominator: &BTreeMap<Bucket, f64>,
    mode: SpeedupMode,
) -> Result<Vec<Speedup>> {
    let buckets: BTreeSet<Bucket> = numerator.keys().chain(denominator.keys()).copied().collect();
    if buckets.is_empty() {
        return Err(SpeedupError::NoBuckets);
    }

    buckets
        .into_iter()
        .map(|bucket| {
            let top = *numerator.get(&bucket).ok_or(SpeedupError::MissingBucket {
                bucket,
                side: Side::Numerator,
            })?;
            let bottom = *denominator
                .get(&bucket)
                .ok_or(SpeedupError::MissingBucket {
                    bucket,
                    side: Side::Denominator,
                })?;

            if bottom == 0.0 {
                return Err(SpeedupError::ZeroDenominator(bucket));
            }

            let value = mode.apply(top, bottom);
            if !value.is_finite() {
                return Err(SpeedupError::NonFinite {
                    bucket,
                    numerator: top,
                    denominator: bottom,
                });
            }

            Ok(Speedup {
                bucket,
                numerator: top,
                denominator: bottom,
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn series(entries: &[(u8, f64)]) -> BTreeMap<Bucket, f64> {
        entries
            .iter()
            .map(|&(power, value)| (Bucket::new(power), value))
            .collect()
    }

    #[test]
    fn ratio_of_published_means() {
        let numerator = series(&[(25, 19_349_075_199.8)]);
        let denominator = series(&[(25, 17_523_510_302.2)]);

        let speedup = compute_speedup(&numerator, &denominator, SpeedupMode::Ratio).unwrap();
        assert_eq!(speedup.len(), 1);
        assert!((speedup[0].value - 1.104).abs() < 1e-3);
    }

    #[test]
    fn ratio_times_denominator_restores_numerator() {
        let numerator = series(&[(25, 19_349_135_199.8), (26, 40_274_376_425.6), (27, 83_169_830_260.2)]);
        let denominator = series(&[(25, 17_485_129_027.0), (26, 36_325_985_384.6), (27, 75_641_388_239.0)]);

        let speedup = compute_speedup(&numerator, &denominator, SpeedupMode::Ratio).unwrap();
        for entry in speedup {
            let restored = entry.value * denominator[&entry.bucket];
            assert!((restored - numerator[&entry.bucket]).abs() / numerator[&entry.bucket] < 1e-12);
        }
    }

    #[test]
    fn percent_difference_matches_definition() {
        let slow = series(&[(28, 7_152_446_631.3)]);
        let fast = series(&[(28, 7_109_274_789.2)]);

        let speedup = compute_speedup(&slow, &fast, SpeedupMode::Percent).unwrap();
        let expected = (7_152_446_631.3 - 7_109_274_789.2) / 7_109_274_789.2 * 100.0;
        assert!((speedup[0].value - expected).abs() < 1e-9);
        assert!(speedup[0].value > 0.0 && speedup[0].value < 1.0);
    }

    #[test]
    fn output_is_ordered_by_bucket() {
        let numerator = series(&[(30, 4.0), (28, 2.0), (29, 3.0)]);
        let denominator = series(&[(29, 1.0), (30, 1.0), (28, 1.0)]);

        let speedup = compute_speedup(&numerator, &denominator, SpeedupMode::Ratio).unwrap();
        let buckets: Vec<u8> = speedup.iter().map(|entry| entry.bucket.power).collect();
        assert_eq!(buckets, vec![28, 29, 30]);
    }

    #[rstest(numerator, denominator, missing, side,
        case(vec![(25, 1.0), (26, 1.0)], vec![(25, 1.0)], 26, Side::Denominator),
        case(vec![(25, 1.0)], vec![(25, 1.0), (27, 1.0)], 27, Side::Numerator)
    )]
    fn mismatched_buckets_are_rejected(
        numerator: Vec<(u8, f64)>,
        denominator: Vec<(u8, f64)>,
        missing: u8,
        side: Side,
    ) {
        let result = compute_speedup(&series(&numerator), &series(&denominator), SpeedupMode::Ratio);
        assert_eq!(
            result,
            Err(SpeedupError::MissingBucket {
                bucket: Bucket::new(missing),
                side,
            })
        );
    }

    #[rstest(mode, case(SpeedupMode::Ratio), case(SpeedupMode::Percent))]
    fn zero_denominator_is_rejected(mode: SpeedupMode) {
        let result = compute_speedup(&series(&[(25, 5.0)]), &series(&[(25, 0.0)]), mode);
        assert_eq!(result, Err(SpeedupError::ZeroDenominator(Bucket::new(25))));
    }

    #[test]
    fn non_finite_result_is_rejected() {
        let result = compute_speedup(
            &series(&[(25, f64::MAX)]),
            &series(&[(25, 1e-300)]),
            SpeedupMode::Ratio,
        );
        assert!(matches!(result, Err(SpeedupError::NonFinite { .. })));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let result = compute_speedup(&BTreeMap::new(), &BTreeMap::new(), SpeedupMode::Ratio);
        assert_eq!(result, Err(SpeedupError::NoBuckets));
    }

    #[rstest(input, expected,
        case("ratio", SpeedupMode::Ratio),
        case("Percent", SpeedupMode::Percent),
        case("percentage", SpeedupMode::Percent)
    )]
    fn parses_modes(input: &str, expected: SpeedupMode) {
        assert_eq!(input.parse::<SpeedupMode>(), Ok(expected));
    }
}
