//! Plot manifest
//!
//! A manifest is a TOML document listing the datasets to load and the charts to
//! draw from them. Relative paths inside it are resolved against the directory
//! that contains the manifest.

use crate::analysis::aggregate::Statistic;
use crate::analysis::speedup::SpeedupMode;
use crate::common::plots::{XScale, YScale, DEFAULT_SIZE};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while loading a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Dataset #{index} is invalid: {reason}")]
    InvalidDataset { index: usize, reason: String },

    #[error("Chart '{}' is invalid: {reason}", .file.display())]
    InvalidChart { file: PathBuf, reason: String },

    #[error("Image size {width}x{height} is empty")]
    InvalidSize { width: u32, height: u32 },
}

type Result<T> = core::result::Result<T, ManifestError>;

fn default_output_dir() -> PathBuf {
    PathBuf::from("plots")
}

fn default_width() -> u32 {
    DEFAULT_SIZE.0
}

fn default_height() -> u32 {
    DEFAULT_SIZE.1
}

fn default_x_label() -> String {
    "Array Size".to_string()
}

/// Top-level manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Where charts are written, relative to the manifest directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Statistic for charts that do not pick their own.
    #[serde(default)]
    pub statistic: Statistic,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "dataset")]
    pub datasets: Vec<Dataset>,
    #[serde(default, rename = "chart")]
    pub charts: Vec<ChartEntry>,
}

/// A source of measurements.
///
/// Either a results file (`path`) or inline sample rows (`samples`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    pub path: Option<PathBuf>,
    /// Configuration of rows that do not name one; required for inline samples.
    pub configuration: Option<String>,
    /// Exponent of the first inline sample row.
    pub first_power: Option<u8>,
    /// One whitespace separated line of clock tick counts per bucket.
    pub samples: Option<Vec<String>>,
}

/// A validated view of a [`Dataset`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DatasetSource<'a> {
    File {
        path: &'a Path,
        configuration: Option<&'a str>,
    },
    Inline {
        configuration: &'a str,
        first_power: u8,
        samples: &'a [String],
    },
}

impl Dataset {
    /// Checks which kind of source this is.
    pub fn source(&self, index: usize) -> Result<DatasetSource<'_>> {
        let invalid = |reason: &str| ManifestError::InvalidDataset {
            index,
            reason: reason.to_string(),
        };

        match (&self.path, &self.samples) {
            (Some(path), None) => {
                if self.first_power.is_some() {
                    return Err(invalid("'first_power' only applies to inline samples"));
                }
                Ok(DatasetSource::File {
                    path,
                    configuration: self.configuration.as_deref(),
                })
            }
            (None, Some(samples)) => {
                let configuration = self
                    .configuration
                    .as_deref()
                    .ok_or_else(|| invalid("inline samples need a 'configuration'"))?;
                let first_power = self
                    .first_power
                    .ok_or_else(|| invalid("inline samples need a 'first_power'"))?;
                Ok(DatasetSource::Inline {
                    configuration,
                    first_power,
                    samples,
                })
            }
            (Some(_), Some(_)) => Err(invalid("set either 'path' or 'samples', not both")),
            (None, None) => Err(invalid("one of 'path' or 'samples' is required")),
        }
    }
}

/// What a chart shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Line,
    Bar,
    /// The speedup series itself, drawn as a line
    Speedup,
}

/// A series named either by configuration alone or with a legend label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SeriesRef {
    Name(String),
    Labeled {
        configuration: String,
        label: Option<String>,
    },
}

impl SeriesRef {
    pub fn configuration(&self) -> &str {
        match self {
            SeriesRef::Name(name) => name,
            SeriesRef::Labeled { configuration, .. } => configuration,
        }
    }

    /// Legend label; defaults to the configuration name.
    pub fn label(&self) -> &str {
        match self {
            SeriesRef::Name(name) => name,
            SeriesRef::Labeled {
                configuration,
                label,
            } => label.as_deref().unwrap_or(configuration),
        }
    }
}

/// Speedup between two configurations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedupOverlay {
    pub numerator: String,
    pub denominator: String,
    #[serde(default)]
    pub mode: SpeedupMode,
    /// Legend label
    pub label: Option<String>,
    /// Axis description
    pub axis_label: Option<String>,
}

impl SpeedupOverlay {
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("Speedup ({} / {})", self.numerator, self.denominator))
    }

    pub fn axis_label(&self) -> String {
        self.axis_label
            .clone()
            .unwrap_or_else(|| self.mode.axis_label().to_string())
    }
}

/// One chart to render.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartEntry {
    /// Output file, relative to the output directory. `.png` or `.svg`.
    pub file: PathBuf,
    #[serde(default)]
    pub kind: ChartType,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_x_label")]
    pub x_label: String,
    pub y_label: Option<String>,
    #[serde(default)]
    pub x_scale: XScale,
    #[serde(default)]
    pub y_scale: YScale,
    /// Overrides the manifest statistic for this chart.
    pub statistic: Option<Statistic>,
    #[serde(default)]
    pub series: Vec<SeriesRef>,
    pub speedup: Option<SpeedupOverlay>,
}

impl ChartEntry {
    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| ManifestError::InvalidChart {
            file: self.file.clone(),
            reason: reason.to_string(),
        };

        match self.kind {
            ChartType::Speedup if self.speedup.is_none() => {
                Err(invalid("a speedup chart needs a [chart.speedup] table"))
            }
            ChartType::Speedup if !self.series.is_empty() => {
                Err(invalid("a speedup chart draws its own series, remove 'series'"))
            }
            ChartType::Line | ChartType::Bar if self.series.is_empty() => {
                Err(invalid("at least one series is required"))
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(contents: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(contents)?;
        manifest.validate()?;
        Ok(manifest)
    }
}

impl Manifest {
    /// Reads and validates a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    /// Directory that relative paths of the manifest at `path` resolve against.
    pub fn base_dir(path: &Path) -> PathBuf {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Output directory resolved against `base_dir`.
    pub fn resolved_output_dir(&self, base_dir: &Path) -> PathBuf {
        resolve_path(base_dir, &self.output_dir)
    }

    /// Statistic a chart is reduced with.
    pub fn statistic_for(&self, chart: &ChartEntry) -> Statistic {
        chart.statistic.unwrap_or(self.statistic)
    }

    /// Forces every chart to use `statistic`.
    pub fn override_statistic(&mut self, statistic: Statistic) {
        self.statistic = statistic;
        for chart in &mut self.charts {
            chart.statistic = None;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ManifestError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }

        for (index, dataset) in self.datasets.iter().enumerate() {
            dataset.source(index)?;
        }

        let mut files = BTreeSet::new();
        for chart in &self.charts {
            chart.validate()?;
            if !files.insert(&chart.file) {
                return Err(ManifestError::InvalidChart {
                    file: chart.file.clone(),
                    reason: "another chart writes the same file".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Joins `path` onto `base_dir` unless it is already absolute.
pub fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
