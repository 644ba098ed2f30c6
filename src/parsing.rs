//! File parsing functionality for benchmark results
//!
//! This module loads clock tick measurements into a [`ResultTable`], either from
//! CSV result files (optionally `.zst` compressed) or from inline sample rows.

use crate::common::data_structures::{
    Bucket, DuplicateTrial, Measurement, ResultTable, MAX_BUCKET_POWER,
};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use zstd::Decoder;

/// Errors that can occur during file parsing
#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("Failed to read input file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to decompress zstd file: {0}")]
    Decompression(String),

    #[error("Failed to parse '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Row {row} of '{}' has no configuration and no default was given", .path.display())]
    MissingConfiguration { path: PathBuf, row: usize },

    #[error("Sample row {row} of '{configuration}' contains '{token}', which is not a clock tick count")]
    MalformedSample {
        configuration: String,
        row: usize,
        token: String,
    },

    #[error("Sample row {row} of '{configuration}' is past the largest bucket 2^{max}", max = MAX_BUCKET_POWER)]
    BucketOutOfRange { configuration: String, row: usize },

    #[error("Row {row} of '{}': {source}", .path.display())]
    DuplicateTrial {
        path: PathBuf,
        row: usize,
        #[source]
        source: DuplicateTrial,
    },
}

type Result<T> = core::result::Result<T, ParsingError>;

/// One CSV record. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct ResultRecord {
    #[serde(default)]
    configuration: Option<String>,
    #[serde(deserialize_with = "deserialize_bucket")]
    power: Bucket,
    #[serde(default)]
    trial: Option<usize>,
    cycles: u64,
}

/// Accepts the same notations as [`Bucket::from_str`](std::str::FromStr).
fn deserialize_bucket<'de, D>(deserializer: D) -> core::result::Result<Bucket, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn open_input(file_path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(file_path)?;

    let is_compressed = file_path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("zst"));

    if is_compressed {
        let decoder = Decoder::new(file)
            .map_err(|e| ParsingError::Decompression(format!("Failed to create decoder: {}", e)))?;
        Ok(Box::new(decoder))
    } else {
        Ok(Box::new(file))
    }
}

/// Loads a results CSV file
///
/// The file must have a header row with `power` and `cycles` columns.
/// `configuration` and `trial` columns are optional:
/// - rows without a configuration use `default_configuration`
/// - rows without a trial index are numbered after the highest trial seen in their group
/// - a trial index repeated within a group is an error
///
/// # Arguments
/// * `file_path` - Path to the `.csv` (or `.csv.zst`) file
/// * `default_configuration` - Configuration for rows that do not name one
///
/// # Returns
/// * `Ok(ResultTable)` - All rows of the file
/// * `Err(ParsingError)` - If the file could not be read, decompressed or parsed
pub fn load_results_csv(file_path: &Path, default_configuration: Option<&str>) -> Result<ResultTable> {
    let input = open_input(file_path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut table = ResultTable::new();
    for (index, record) in reader.deserialize::<ResultRecord>().enumerate() {
        let record = record.map_err(|source| ParsingError::Csv {
            path: file_path.to_path_buf(),
            source,
        })?;

        let configuration = record
            .configuration
            .filter(|name| !name.is_empty())
            .or_else(|| default_configuration.map(str::to_string))
            .ok_or_else(|| ParsingError::MissingConfiguration {
                path: file_path.to_path_buf(),
                // Header is line 1
                row: index + 2,
            })?;

        match record.trial {
            Some(trial) => table
                .push(Measurement {
                    configuration,
                    bucket: record.power,
                    trial,
                    cycles: record.cycles,
                })
                .map_err(|source| ParsingError::DuplicateTrial {
                    path: file_path.to_path_buf(),
                    row: index + 2,
                    source,
                })?,
            None => table.record(&configuration, record.power, record.cycles),
        }
    }

    debug!(
        path = %file_path.display(),
        rows = table.len(),
        "loaded results file"
    );
    Ok(table)
}

/// Parses inline sample rows
///
/// Each row holds the whitespace separated clock tick counts of one bucket.
/// Row `i` belongs to bucket `2^(first_power + i)`. Every row declares its
/// group, so a blank row becomes an empty group that aggregation rejects.
///
/// # Arguments
/// * `configuration` - Configuration the samples belong to
/// * `first_power` - Exponent of the first row's bucket
/// * `rows` - One string of samples per bucket
pub fn parse_sample_rows<S: AsRef<str>>(
    configuration: &str,
    first_power: u8,
    rows: &[S],
) -> Result<ResultTable> {
    let mut table = ResultTable::new();

    for (index, row) in rows.iter().enumerate() {
        let power = u8::try_from(first_power as usize + index)
            .ok()
            .filter(|power| *power <= MAX_BUCKET_POWER)
            .ok_or_else(|| ParsingError::BucketOutOfRange {
                configuration: configuration.to_string(),
                row: index,
            })?;
        let bucket = Bucket::new(power);

        table.declare_group(configuration, bucket);
        for token in row.as_ref().split_whitespace() {
            let cycles = token
                .parse::<u64>()
                .map_err(|_| ParsingError::MalformedSample {
                    configuration: configuration.to_string(),
                    row: index,
                    token: token.to_string(),
                })?;
            table.record(configuration, bucket, cycles);
        }
    }

    debug!(configuration, rows = rows.len(), samples = table.len(), "parsed inline samples");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_load_long_format_csv() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "results.csv",
            b"configuration,power,trial,cycles\n\
              Tile,25,0,15490965718\n\
              Tile,25,1,15508218853\n\
              Thread,25,0,4878570560\n",
        );

        let table = load_results_csv(&path, None).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[1].trial, 1);
        assert_eq!(table.rows()[2].configuration, "Thread");
        assert_eq!(table.rows()[2].cycles, 4878570560);
        assert_eq!(table.configurations().len(), 2);
    }

    #[test]
    fn test_default_configuration_and_extra_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "simd_results.csv",
            b"power,cycles,notes\n20,1500,warm\n20,1700,cold\n2^24,9000,\n",
        );

        let table = load_results_csv(&path, Some("SIMD")).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.rows().iter().all(|row| row.configuration == "SIMD"));
        assert_eq!(table.rows()[1].trial, 1);
        assert_eq!(table.rows()[2].bucket, Bucket::new(24));
    }

    #[test]
    fn test_duplicate_trial_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "results.csv",
            b"configuration,power,trial,cycles\nTile,25,0,100\nTile,25,0,300\n",
        );

        let error = load_results_csv(&path, None).unwrap_err();
        match error {
            ParsingError::DuplicateTrial { row, source, .. } => {
                assert_eq!(row, 3);
                assert_eq!(source.trial, 0);
            }
            other => panic!("expected DuplicateTrial, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_trials_follow_explicit_ones() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "results.csv",
            b"configuration,power,trial,cycles\nTile,25,0,100\nTile,25,,300\nTile,25,2,500\n",
        );

        let table = load_results_csv(&path, None).unwrap();
        let trials: Vec<usize> = table.rows().iter().map(|row| row.trial).collect();
        assert_eq!(trials, vec![0, 1, 2]);
    }

    #[test]
    fn test_missing_configuration_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "results.csv", b"power,cycles\n20,1500\n");

        let result = load_results_csv(&path, None);
        assert!(matches!(
            result,
            Err(ParsingError::MissingConfiguration { row: 2, .. })
        ));
    }

    #[test]
    fn test_malformed_cycles_reports_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bad.csv", b"power,cycles\n20,12x4\n");

        let error = load_results_csv(&path, Some("SIMD")).unwrap_err();
        assert!(matches!(error, ParsingError::Csv { .. }));
        assert!(error.to_string().contains("bad.csv"));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "bad.csv", b"configuration,cycles\nTile,20\n");

        let result = load_results_csv(&path, None);
        assert!(matches!(result, Err(ParsingError::Csv { .. })));
    }

    #[test]
    fn test_load_zstd_compressed_csv() {
        let dir = TempDir::new().unwrap();
        let raw = b"configuration,power,cycles\nGPU_FAST,28,7109274789\n";
        let compressed = zstd::encode_all(&raw[..], 3).unwrap();
        let path = write_file(&dir, "gpu.csv.zst", &compressed);

        let table = load_results_csv(&path, None).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].configuration, "GPU_FAST");
        assert_eq!(table.rows()[0].bucket, Bucket::new(28));
    }

    #[test]
    fn test_missing_file() {
        let result = load_results_csv(Path::new("does/not/exist.csv"), None);
        assert!(matches!(result, Err(ParsingError::FileRead(_))));
    }

    #[test]
    fn test_parse_sample_rows() {
        let rows = [
            "19412157373 19317654356 19337741979",
            "40174224009   40255196040",
        ];
        let table = parse_sample_rows("Recursive", 25, &rows).unwrap();

        assert_eq!(table.len(), 5);
        let groups = table.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[&crate::common::data_structures::GroupKey::new("Recursive", Bucket::new(26))],
            vec![40174224009, 40255196040]
        );
    }

    #[test]
    fn test_blank_sample_row_declares_empty_group() {
        let rows = ["1 2", ""];
        let table = parse_sample_rows("Tile", 25, &rows).unwrap();

        let groups = table.groups();
        assert_eq!(groups.len(), 2);
        assert!(groups.values().any(Vec::is_empty));
    }

    #[test]
    fn test_malformed_sample_token() {
        let rows = ["1 2", "3 4.5"];
        let error = parse_sample_rows("Tile", 25, &rows).unwrap_err();

        match error {
            ParsingError::MalformedSample {
                configuration,
                row,
                token,
            } => {
                assert_eq!(configuration, "Tile");
                assert_eq!(row, 1);
                assert_eq!(token, "4.5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sample_rows_past_largest_bucket() {
        let rows = ["1", "2"];
        let result = parse_sample_rows("Tile", MAX_BUCKET_POWER, &rows);
        assert!(matches!(result, Err(ParsingError::BucketOutOfRange { row: 1, .. })));
    }
}
