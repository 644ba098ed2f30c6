use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An input-size category; the benchmark sizes are always powers of two so
/// only the exponent is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bucket {
    /// Exponent of the element count (`2^power` elements)
    pub power: u8,
}

/// Largest exponent whose element count still fits in a `u64`.
pub const MAX_BUCKET_POWER: u8 = 63;

impl Bucket {
    pub fn new(power: u8) -> Self {
        Self { power }
    }

    /// Number of elements sorted in this bucket.
    pub fn elements(&self) -> u64 {
        1u64 << self.power
    }

    /// Human-readable label, e.g. `2^28`.
    pub fn label(&self) -> String {
        format!("2^{}", self.power)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "2^{}", self.power)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("'{0}' is not a bucket; expected an exponent such as 28, 2^28 or 2**28")]
pub struct InvalidBucket(pub String);

impl FromStr for Bucket {
    type Err = InvalidBucket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let exponent = trimmed
            .strip_prefix("2^")
            .or_else(|| trimmed.strip_prefix("2**"))
            .unwrap_or(trimmed);

        match exponent.trim().parse::<u8>() {
            Ok(power) if power <= MAX_BUCKET_POWER => Ok(Bucket::new(power)),
            _ => Err(InvalidBucket(s.to_string())),
        }
    }
}

/// A single recorded clock tick count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Algorithm/implementation variant that was benchmarked
    pub configuration: String,
    /// Input-size category of the run
    pub bucket: Bucket,
    /// Index of the run within its group
    pub trial: usize,
    /// Elapsed clock cycles
    pub cycles: u64,
}

/// Identifies a sample group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub configuration: String,
    pub bucket: Bucket,
}

impl GroupKey {
    pub fn new(configuration: impl Into<String>, bucket: Bucket) -> Self {
        Self {
            configuration: configuration.into(),
            bucket,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.configuration, self.bucket)
    }
}

/// A measurement whose trial index is already taken in its group.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Trial {trial} of {group} is recorded more than once")]
pub struct DuplicateTrial {
    pub group: GroupKey,
    pub trial: usize,
}

/// All measurements loaded for a run.
///
/// Besides the rows themselves, the table remembers every group that a loader
/// declared. A declared group without rows is kept so that aggregation can
/// reject it instead of silently skipping the bucket.
///
/// Trial indices are unique within a group.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    rows: Vec<Measurement>,
    /// Declared groups and the trial indices each holds
    declared: BTreeMap<GroupKey, BTreeSet<usize>>,
}

/// Index after the highest trial of a group, or 0 for an empty group.
fn next_trial(trials: &BTreeSet<usize>) -> usize {
    trials.last().map_or(0, |last| last + 1)
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a measurement; the trial index is assigned after the highest
    /// trial already present in the same group.
    pub fn record(&mut self, configuration: &str, bucket: Bucket, cycles: u64) {
        let trials = self
            .declared
            .entry(GroupKey::new(configuration, bucket))
            .or_default();
        let trial = next_trial(trials);
        trials.insert(trial);

        self.rows.push(Measurement {
            configuration: configuration.to_string(),
            bucket,
            trial,
            cycles,
        });
    }

    /// Adds a measurement with its own trial index.
    ///
    /// # Returns
    /// * `Err(DuplicateTrial)` - If the group already holds that trial; the table is unchanged
    pub fn push(&mut self, measurement: Measurement) -> Result<(), DuplicateTrial> {
        let group = GroupKey::new(measurement.configuration.clone(), measurement.bucket);
        let trials = self.declared.entry(group.clone()).or_default();
        if !trials.insert(measurement.trial) {
            return Err(DuplicateTrial {
                group,
                trial: measurement.trial,
            });
        }

        self.rows.push(measurement);
        Ok(())
    }

    /// Marks a group as expected, even if it never receives a row.
    pub fn declare_group(&mut self, configuration: &str, bucket: Bucket) {
        self.declared
            .entry(GroupKey::new(configuration, bucket))
            .or_default();
    }

    /// Moves all rows and declared groups of `other` into this table.
    ///
    /// When both tables hold trials of the same group, the trials of `other`
    /// are shifted past the highest trial already in this table.
    pub fn merge(&mut self, other: ResultTable) {
        let offsets: BTreeMap<GroupKey, usize> = other
            .declared
            .keys()
            .filter_map(|key| {
                let offset = next_trial(self.declared.get(key)?);
                Some((key.clone(), offset))
            })
            .collect();

        for (key, trials) in other.declared {
            let offset = offsets.get(&key).copied().unwrap_or(0);
            self.declared
                .entry(key)
                .or_default()
                .extend(trials.into_iter().map(|trial| trial + offset));
        }

        for mut row in other.rows {
            let key = GroupKey::new(row.configuration.clone(), row.bucket);
            row.trial += offsets.get(&key).copied().unwrap_or(0);
            self.rows.push(row);
        }
    }

    pub fn rows(&self) -> &[Measurement] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct configuration names, sorted.
    pub fn configurations(&self) -> BTreeSet<&str> {
        self.declared
            .keys()
            .map(|key| key.configuration.as_str())
            .collect()
    }

    /// Groups the cycle counts by (configuration, bucket).
    ///
    /// Declared groups without rows map to an empty vector.
    pub fn groups(&self) -> BTreeMap<GroupKey, Vec<u64>> {
        let mut groups: BTreeMap<GroupKey, Vec<u64>> = self
            .declared
            .keys()
            .map(|key| (key.clone(), Vec::new()))
            .collect();

        for row in &self.rows {
            groups
                .entry(GroupKey::new(row.configuration.clone(), row.bucket))
                .or_default()
                .push(row.cycles);
        }

        groups
    }
}
