//! End to end report generation
//!
//! Ties loading, aggregation and rendering together: renders the charts of a
//! [`Manifest`], runs the two-file performance comparison, and builds text and
//! JSON summaries of the aggregated data.

use crate::analysis::aggregate::{aggregate, AggregateError, Aggregates, Statistic};
use crate::analysis::speedup::{Speedup, SpeedupError, SpeedupMode};
use crate::common::data_structures::{Bucket, ResultTable};
use crate::common::plots::{
    render_chart as draw, ChartKind, ChartSpec, PlotError, SecondaryAxis, Series, ValueFormat,
    XScale, YScale, DEFAULT_SIZE,
};
use crate::common::tables::{format_aggregate_table, format_speedup_table};
use crate::manifest::{
    resolve_path, ChartEntry, ChartType, DatasetSource, Manifest, ManifestError, SpeedupOverlay,
};
use crate::parsing::{load_results_csv, parse_sample_rows, ParsingError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while producing a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Parsing error: {0}")]
    Parsing(#[from] ParsingError),

    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("Speedup error: {0}")]
    Speedup(#[from] SpeedupError),

    #[error("Plot error: {0}")]
    Plot(#[from] PlotError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

type Result<T> = core::result::Result<T, ReportError>;

/// Capitalized statistic name for axis labels and titles.
fn statistic_heading(statistic: Statistic) -> &'static str {
    match statistic {
        Statistic::Mean => "Mean",
        Statistic::Median => "Median",
    }
}

fn speedup_points(speedups: &[Speedup]) -> BTreeMap<Bucket, f64> {
    speedups
        .iter()
        .map(|speedup| (speedup.bucket, speedup.value))
        .collect()
}

/// Loads every dataset of a manifest into one table
///
/// # Arguments
/// * `manifest` - The parsed manifest
/// * `base_dir` - Directory relative dataset paths are resolved against
pub fn load_manifest_results(manifest: &Manifest, base_dir: &Path) -> Result<ResultTable> {
    let mut table = ResultTable::new();

    for (index, dataset) in manifest.datasets.iter().enumerate() {
        let loaded = match dataset.source(index)? {
            DatasetSource::File {
                path,
                configuration,
            } => load_results_csv(&resolve_path(base_dir, path), configuration)?,
            DatasetSource::Inline {
                configuration,
                first_power,
                samples,
            } => parse_sample_rows(configuration, first_power, samples)?,
        };
        table.merge(loaded);
    }

    debug!(
        datasets = manifest.datasets.len(),
        rows = table.len(),
        "loaded manifest datasets"
    );
    Ok(table)
}

fn speedup_series(aggregates: &Aggregates, overlay: &SpeedupOverlay) -> Result<Series> {
    let speedups = aggregates.speedup(&overlay.numerator, &overlay.denominator, overlay.mode)?;
    Ok(Series::new(overlay.label(), speedup_points(&speedups)))
}

/// Builds the chart description and data for one manifest entry.
fn prepare_chart(
    entry: &ChartEntry,
    aggregates: &Aggregates,
    size: (u32, u32),
) -> Result<(ChartSpec, Vec<Series>)> {
    let mut spec = ChartSpec {
        title: entry.title.clone(),
        x_label: entry.x_label.clone(),
        y_label: String::new(),
        kind: ChartKind::Line,
        x_scale: entry.x_scale,
        y_scale: entry.y_scale,
        y_format: ValueFormat::Ticks,
        size,
        secondary: None,
    };

    let series = match (entry.kind, &entry.speedup) {
        (ChartType::Speedup, Some(overlay)) => {
            spec.y_label = entry.y_label.clone().unwrap_or_else(|| overlay.axis_label());
            spec.y_format = ValueFormat::Plain;
            vec![speedup_series(aggregates, overlay)?]
        }
        (kind, overlay) => {
            if kind == ChartType::Bar {
                spec.kind = ChartKind::Bar;
            }
            spec.y_label = entry.y_label.clone().unwrap_or_else(|| {
                format!("{} Clock Ticks", statistic_heading(aggregates.statistic()))
            });

            if let Some(overlay) = overlay {
                spec.secondary = Some(SecondaryAxis {
                    label: overlay.axis_label(),
                    series: speedup_series(aggregates, overlay)?,
                });
            }

            entry
                .series
                .iter()
                .map(|series| {
                    let points = aggregates.require_series(series.configuration())?;
                    Ok(Series::new(series.label(), points))
                })
                .collect::<Result<Vec<_>>>()?
        }
    };

    Ok((spec, series))
}

/// Renders a single chart of a manifest
///
/// The table is reduced with the chart's statistic, the named series and the
/// optional speedup are resolved, and the chart is written below `output_dir`.
///
/// # Arguments
/// * `entry` - The chart to render
/// * `table` - All loaded measurements
/// * `manifest` - The manifest the entry belongs to (statistic and image size)
/// * `output_dir` - Directory the chart file is written to
///
/// # Returns
/// * `Ok(PathBuf)` - Path of the written chart
/// * `Err(ReportError)` - If a configuration is unknown, aggregation failed or drawing failed
pub fn render_chart(
    entry: &ChartEntry,
    table: &ResultTable,
    manifest: &Manifest,
    output_dir: &Path,
) -> Result<PathBuf> {
    let statistic = manifest.statistic_for(entry);
    let aggregates = aggregate(table, statistic)?;
    let (spec, series) = prepare_chart(entry, &aggregates, (manifest.width, manifest.height))?;

    let output_path = resolve_path(output_dir, &entry.file);
    draw(&spec, &series, &output_path)?;

    info!(path = %output_path.display(), %statistic, "chart saved");
    Ok(output_path)
}

/// Loads the datasets of a manifest and renders all of its charts
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Paths of the written charts, in manifest order
pub fn render_manifest(manifest: &Manifest, base_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let table = load_manifest_results(manifest, base_dir)?;

    manifest
        .charts
        .iter()
        .map(|entry| render_chart(entry, &table, manifest, output_dir))
        .collect()
}

/// Settings for [`compare_results`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompareOptions {
    /// Configuration name for rows of the baseline file
    pub baseline_name: String,
    /// Configuration name for rows of the candidate file
    pub candidate_name: String,
    pub statistic: Statistic,
    pub size: (u32, u32),
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            baseline_name: "Vanilla".to_string(),
            candidate_name: "SIMD".to_string(),
            statistic: Statistic::Median,
            size: DEFAULT_SIZE,
        }
    }
}

/// Compares a candidate implementation against a baseline
///
/// Both files hold `(power, cycles)` rows of a single configuration. Three charts
/// are written to `output_dir`:
/// - `performance_comparison.png`: grouped bars on a logarithmic axis
/// - `performance_comparison_linear.png`: the same bars on a linear axis
/// - `speedup.png`: baseline over candidate, per bucket
///
/// Both files must cover the same buckets.
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Paths of the three charts
/// * `Err(ReportError)` - If loading, aggregation or drawing failed
pub fn compare_results(
    baseline: &Path,
    candidate: &Path,
    options: &CompareOptions,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut table = load_results_csv(candidate, Some(&options.candidate_name))?;
    table.merge(load_results_csv(baseline, Some(&options.baseline_name))?);

    let aggregates = aggregate(&table, options.statistic)?;
    let series = vec![
        Series::new(
            options.candidate_name.as_str(),
            aggregates.require_series(&options.candidate_name)?,
        ),
        Series::new(
            options.baseline_name.as_str(),
            aggregates.require_series(&options.baseline_name)?,
        ),
    ];
    let speedups = aggregates.speedup(
        &options.baseline_name,
        &options.candidate_name,
        SpeedupMode::Ratio,
    )?;

    let bars = ChartSpec {
        title: "Sorting Performance Comparison".to_string(),
        x_label: "Array Size (2^n)".to_string(),
        y_label: format!("{} Cycles", statistic_heading(options.statistic)),
        kind: ChartKind::Bar,
        y_scale: YScale::Log,
        size: options.size,
        ..ChartSpec::default()
    };
    let linear_bars = ChartSpec {
        title: "Sorting Performance Comparison (Linear Scale)".to_string(),
        y_scale: YScale::Linear,
        ..bars.clone()
    };
    let speedup = ChartSpec {
        title: format!("{} Speedup vs Array Size", options.candidate_name),
        x_label: "Array Size (2^n)".to_string(),
        y_label: SpeedupMode::Ratio.axis_label().to_string(),
        kind: ChartKind::Line,
        x_scale: XScale::Log2,
        y_format: ValueFormat::Plain,
        size: options.size,
        ..ChartSpec::default()
    };
    let ratio_series = [Series::new(
        format!("{} / {}", options.baseline_name, options.candidate_name),
        speedup_points(&speedups),
    )];

    let charts = [
        ("performance_comparison.png", &bars, series.as_slice()),
        ("performance_comparison_linear.png", &linear_bars, series.as_slice()),
        ("speedup.png", &speedup, ratio_series.as_slice()),
    ];

    let mut written = Vec::with_capacity(charts.len());
    for (file, spec, data) in charts {
        let output_path = output_dir.join(file);
        draw(spec, data, &output_path)?;
        info!(path = %output_path.display(), "chart saved");
        written.push(output_path);
    }

    Ok(written)
}

/// Statistic of one bucket in a [`Summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSummary {
    pub bucket: Bucket,
    pub label: String,
    pub value: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationSummary {
    pub name: String,
    pub buckets: Vec<BucketSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedupSummary {
    pub numerator: String,
    pub denominator: String,
    pub mode: SpeedupMode,
    pub values: Vec<Speedup>,
}

/// Aggregated view of a run, for text and JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub statistic: Statistic,
    pub configurations: Vec<ConfigurationSummary>,
    pub speedups: Vec<SpeedupSummary>,
    #[serde(skip)]
    aggregates: Aggregates,
}

/// Speedups requested by the charts of a manifest, without duplicates.
pub fn manifest_speedups(manifest: &Manifest) -> Vec<SpeedupOverlay> {
    let mut speedups: Vec<SpeedupOverlay> = Vec::new();
    for overlay in manifest.charts.iter().filter_map(|chart| chart.speedup.as_ref()) {
        let seen = speedups.iter().any(|existing| {
            existing.numerator == overlay.numerator
                && existing.denominator == overlay.denominator
                && existing.mode == overlay.mode
        });
        if !seen {
            speedups.push(overlay.clone());
        }
    }
    speedups
}

/// Aggregates a table and computes the requested speedups
///
/// # Arguments
/// * `table` - All loaded measurements
/// * `statistic` - Statistic every group is reduced with
/// * `speedups` - Configuration pairs to compare
pub fn build_summary(
    table: &ResultTable,
    statistic: Statistic,
    speedups: &[SpeedupOverlay],
) -> Result<Summary> {
    let aggregates = aggregate(table, statistic)?;

    let configurations = aggregates
        .configurations()
        .filter_map(|name| {
            let entries = aggregates.entries(name)?;
            Some(ConfigurationSummary {
                name: name.to_string(),
                buckets: entries
                    .iter()
                    .map(|(bucket, entry)| BucketSummary {
                        bucket: *bucket,
                        label: bucket.label(),
                        value: entry.value,
                        samples: entry.samples,
                    })
                    .collect(),
            })
        })
        .collect();

    let speedups = speedups
        .iter()
        .map(|overlay| {
            let values =
                aggregates.speedup(&overlay.numerator, &overlay.denominator, overlay.mode)?;
            Ok(SpeedupSummary {
                numerator: overlay.numerator.clone(),
                denominator: overlay.denominator.clone(),
                mode: overlay.mode,
                values,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Summary {
        statistic,
        configurations,
        speedups,
        aggregates,
    })
}

/// Formats a summary as ASCII tables
pub fn format_summary(summary: &Summary) -> String {
    let names: Vec<&str> = summary
        .configurations
        .iter()
        .map(|configuration| configuration.name.as_str())
        .collect();

    let title = format!("Clock Ticks ({})", statistic_heading(summary.statistic));
    let mut sections = vec![format_aggregate_table(
        &summary.aggregates,
        &names,
        Some(title.as_str()),
    )];

    for speedup in &summary.speedups {
        let title = format!("Speedup ({} / {})", speedup.numerator, speedup.denominator);
        sections.push(format_speedup_table(&speedup.values, speedup.mode, Some(title.as_str())));
    }

    sections.join("\n\n")
}

/// Writes a summary as pretty-printed JSON
pub fn write_summary_json(summary: &Summary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, summary)?;
    info!(path = %path.display(), "summary saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::data_structures::GroupKey;
    use tempfile::TempDir;

    fn data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
    }

    fn shipped_manifest() -> (Manifest, PathBuf) {
        let path = data_dir().join("plots.toml");
        let manifest = Manifest::load(&path).unwrap();
        (manifest, Manifest::base_dir(&path))
    }

    #[test]
    fn test_shipped_datasets_load() {
        let (manifest, base_dir) = shipped_manifest();
        let table = load_manifest_results(&manifest, &base_dir).unwrap();

        let groups = table.groups();
        assert_eq!(groups[&GroupKey::new("Recursive", Bucket::new(25))].len(), 5);
        assert_eq!(groups[&GroupKey::new("GPU_FAST", Bucket::new(28))].len(), 10);
        assert!(table.configurations().contains("MergeParallelCPU"));
    }

    #[test]
    fn test_shipped_recursive_mean() {
        let (manifest, base_dir) = shipped_manifest();
        let table = load_manifest_results(&manifest, &base_dir).unwrap();
        let aggregates = aggregate(&table, Statistic::Mean).unwrap();

        let mean = aggregates.get("Recursive", Bucket::new(25)).unwrap();
        assert!((mean - 96_745_675_999.0 / 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_every_shipped_chart_prepares() {
        let (manifest, base_dir) = shipped_manifest();
        let table = load_manifest_results(&manifest, &base_dir).unwrap();

        for entry in &manifest.charts {
            let aggregates = aggregate(&table, manifest.statistic_for(entry)).unwrap();
            let (spec, series) = prepare_chart(entry, &aggregates, (800, 600)).unwrap();
            assert!(!series.is_empty(), "{} has no series", entry.file.display());
            crate::common::plots::validate_chart(&spec, &series).unwrap();
        }
    }

    fn inline_manifest(charts: &str) -> Manifest {
        let contents = format!(
            r#"
[[dataset]]
configuration = "Tile"
first_power = 25
samples = ["100 300", "400"]

[[dataset]]
configuration = "Thread"
first_power = 25
samples = ["50", "100"]

{charts}
"#
        );
        contents.parse().unwrap()
    }

    #[test]
    fn test_prepare_line_chart_with_overlay() {
        let manifest = inline_manifest(
            r#"
[[chart]]
file = "a.png"
series = ["Tile", { configuration = "Thread", label = "Threaded" }]
[chart.speedup]
numerator = "Tile"
denominator = "Thread"
"#,
        );
        let table = load_manifest_results(&manifest, Path::new(".")).unwrap();
        let aggregates = aggregate(&table, Statistic::Mean).unwrap();
        let (spec, series) = prepare_chart(&manifest.charts[0], &aggregates, DEFAULT_SIZE).unwrap();

        assert_eq!(spec.kind, ChartKind::Line);
        assert_eq!(spec.y_label, "Mean Clock Ticks");
        assert_eq!(series[1].label, "Threaded");
        assert_eq!(series[0].points[&Bucket::new(25)], 200.0);

        let secondary = spec.secondary.unwrap();
        assert_eq!(secondary.label, "Speedup (x faster)");
        assert_eq!(secondary.series.points[&Bucket::new(25)], 4.0);
        assert_eq!(secondary.series.points[&Bucket::new(26)], 4.0);
    }

    #[test]
    fn test_prepare_speedup_chart() {
        let manifest = inline_manifest(
            r#"
[[chart]]
file = "a.png"
kind = "speedup"
[chart.speedup]
numerator = "Tile"
denominator = "Thread"
mode = "percent"
"#,
        );
        let table = load_manifest_results(&manifest, Path::new(".")).unwrap();
        let aggregates = aggregate(&table, Statistic::Mean).unwrap();
        let (spec, series) = prepare_chart(&manifest.charts[0], &aggregates, DEFAULT_SIZE).unwrap();

        assert_eq!(spec.y_label, "Percentage Speedup (%)");
        assert_eq!(spec.y_format, ValueFormat::Plain);
        assert!(spec.secondary.is_none());
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points[&Bucket::new(25)], 300.0);
    }

    #[test]
    fn test_unknown_series_is_an_error() {
        let manifest = inline_manifest(
            r#"
[[chart]]
file = "a.png"
series = ["Tile", "Iterative"]
"#,
        );
        let dir = TempDir::new().unwrap();
        let table = load_manifest_results(&manifest, Path::new(".")).unwrap();

        let result = render_chart(&manifest.charts[0], &table, &manifest, dir.path());
        assert!(matches!(
            result,
            Err(ReportError::Aggregate(AggregateError::UnknownConfiguration(_)))
        ));
        assert!(!dir.path().join("a.png").exists());
    }

    #[test]
    fn test_empty_inline_group_fails_rendering() {
        let contents = r#"
[[dataset]]
configuration = "Tile"
first_power = 25
samples = ["100", ""]

[[chart]]
file = "a.png"
series = ["Tile"]
"#;
        let manifest: Manifest = contents.parse().unwrap();
        let dir = TempDir::new().unwrap();

        let result = render_manifest(&manifest, Path::new("."), dir.path());
        assert!(matches!(
            result,
            Err(ReportError::Aggregate(AggregateError::EmptyGroup { .. }))
        ));
    }

    #[test]
    fn test_compare_rejects_mismatched_buckets() {
        let dir = TempDir::new().unwrap();
        let baseline = dir.path().join("vanilla_results.csv");
        let candidate = dir.path().join("simd_results.csv");
        fs::write(&baseline, "power,cycles\n20,300\n24,900\n").unwrap();
        fs::write(&candidate, "power,cycles\n20,100\n").unwrap();

        let result = compare_results(&baseline, &candidate, &CompareOptions::default(), dir.path());
        assert!(matches!(
            result,
            Err(ReportError::Speedup(SpeedupError::MissingBucket { .. }))
        ));
        assert!(!dir.path().join("performance_comparison.png").exists());
    }

    #[test]
    #[ignore = "Font rendering not available in test environment"]
    fn test_compare_results_writes_charts() {
        let dir = TempDir::new().unwrap();
        let baseline = dir.path().join("vanilla_results.csv");
        let candidate = dir.path().join("simd_results.csv");
        fs::write(&baseline, "power,cycles\n20,300\n20,320\n24,900\n").unwrap();
        fs::write(&candidate, "power,cycles\n20,100\n24,200\n24,260\n").unwrap();

        let written =
            compare_results(&baseline, &candidate, &CompareOptions::default(), dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|path| path.exists()));
    }

    #[test]
    #[ignore = "Font rendering not available in test environment"]
    fn test_render_shipped_manifest() {
        let (manifest, base_dir) = shipped_manifest();
        let dir = TempDir::new().unwrap();

        let written = render_manifest(&manifest, &base_dir, dir.path()).unwrap();
        assert_eq!(written.len(), manifest.charts.len());
        assert!(written.iter().all(|path| path.exists()));
    }

    #[test]
    fn test_summary_tables_and_json() {
        let manifest = inline_manifest(
            r#"
[[chart]]
file = "a.png"
series = ["Tile", "Thread"]
[chart.speedup]
numerator = "Tile"
denominator = "Thread"

[[chart]]
file = "b.png"
kind = "speedup"
[chart.speedup]
numerator = "Tile"
denominator = "Thread"
"#,
        );
        let table = load_manifest_results(&manifest, Path::new(".")).unwrap();
        let speedups = manifest_speedups(&manifest);
        assert_eq!(speedups.len(), 1);

        let summary = build_summary(&table, Statistic::Median, &speedups).unwrap();
        assert_eq!(summary.configurations.len(), 2);
        assert_eq!(summary.configurations[1].name, "Tile");
        assert_eq!(summary.configurations[1].buckets[0].samples, 2);

        let text = format_summary(&summary);
        assert!(text.contains("Clock Ticks (Median)"));
        assert!(text.contains("Bucket (median)"));
        assert!(text.contains("Speedup (Tile / Thread)"));
        assert!(text.contains("4.000x"));

        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("nested").join("summary.json");
        write_summary_json(&summary, &json_path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["statistic"], "median");
        assert_eq!(json["configurations"][0]["name"], "Thread");
        assert_eq!(json["configurations"][0]["buckets"][0]["bucket"], 25);
        assert_eq!(json["speedups"][0]["mode"], "ratio");
        assert!(json.get("aggregates").is_none());
    }
}
