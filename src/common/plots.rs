//! Plotting infrastructure for benchmark charts
//!
//! This module provides functionality to draw line charts, grouped bar charts and
//! speedup overlays using the [`plotters`] crate. Charts are written as PNG
//! (bitmap backend) or SVG files, chosen by the output file extension.

use crate::common::constants::format_tick_count;
use crate::common::data_structures::Bucket;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during plot generation
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Failed to save plot to file: {0}")]
    FileSave(#[from] std::io::Error),

    #[error("Unsupported image format for '{0}', expected a .png or .svg file")]
    UnsupportedFormat(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

type Result<T> = core::result::Result<T, PlotError>;

/// Default image size in pixels
pub const DEFAULT_SIZE: (u32, u32) = (1200, 800);

/// Line and bar colours, in series order
const PALETTE: &[RGBColor] = &[
    RGBColor(31, 119, 180),  // Blue
    RGBColor(255, 127, 14),  // Orange
    RGBColor(44, 160, 44),   // Green
    RGBColor(214, 39, 40),   // Red
    RGBColor(148, 103, 189), // Purple
    RGBColor(140, 86, 75),   // Brown
    RGBColor(227, 119, 194), // Pink
    RGBColor(127, 127, 127), // Grey
];

/// Colour of series drawn against the secondary axis
const SECONDARY_COLOR: RGBColor = RGBColor(0, 128, 0);

const TITLE_FONT_SIZE: u32 = 40;
const AXIS_DESC_FONT_SIZE: u32 = 30;
const TICK_LABEL_FONT_SIZE: u32 = 22;
const LEGEND_FONT_SIZE: u32 = 22;
const MARKER_RADIUS: u32 = 5;

fn series_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

fn drawing_error<E: std::fmt::Display>(error: E) -> PlotError {
    PlotError::Drawing(error.to_string())
}

/// How the series are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// One line per series with a marker on every bucket
    #[default]
    Line,
    /// One group of bars per bucket, one bar per series
    Bar,
}

/// Placement of buckets along the X axis of line charts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XScale {
    /// Buckets positioned by exponent, i.e. a base-2 logarithmic size axis
    #[default]
    Log2,
    /// Buckets positioned by element count
    Linear,
}

/// Scaling of the primary Y axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YScale {
    #[default]
    Linear,
    /// Base-10 logarithmic axis
    Log,
}

impl YScale {
    /// Maps a data value onto the drawing coordinate.
    fn project(self, value: f64) -> f64 {
        match self {
            YScale::Linear => value,
            YScale::Log => value.log10(),
        }
    }

    /// Maps a drawing coordinate back onto the data value.
    fn unproject(self, coordinate: f64) -> f64 {
        match self {
            YScale::Linear => coordinate,
            YScale::Log => 10f64.powf(coordinate),
        }
    }
}

/// How values on a Y axis are labelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueFormat {
    /// Clock tick counts with decimal unit suffixes (`k`, `M`, `G`, `T`)
    #[default]
    Ticks,
    /// Plain numbers with as many decimals as the axis range needs, for ratios
    /// and percentages
    Plain,
}

impl ValueFormat {
    fn format(self, value: f64, span: f64) -> String {
        match self {
            ValueFormat::Ticks => format_tick_count(value),
            ValueFormat::Plain => {
                // Enough decimals to tell ten ticks apart
                let step = span.abs() / 10.0;
                let decimals = if step > 0.0 && step < 1.0 {
                    (-step.log10()).ceil().min(6.0) as usize
                } else {
                    0
                };
                format!("{:.*}", decimals, value)
            }
        }
    }
}

/// A labelled bucket to value series.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: BTreeMap<Bucket, f64>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: BTreeMap<Bucket, f64>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }
}

/// A series drawn against its own axis on the right hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryAxis {
    /// Axis description
    pub label: String,
    pub series: Series,
}

/// Everything about a chart except its data.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: ChartKind,
    pub x_scale: XScale,
    pub y_scale: YScale,
    pub y_format: ValueFormat,
    /// Image size in pixels
    pub size: (u32, u32),
    pub secondary: Option<SecondaryAxis>,
}

impl Default for ChartSpec {
    fn default() -> Self {
        Self {
            title: String::new(),
            x_label: "Array Size".to_string(),
            y_label: "Clock Ticks".to_string(),
            kind: ChartKind::default(),
            x_scale: XScale::default(),
            y_scale: YScale::default(),
            y_format: ValueFormat::default(),
            size: DEFAULT_SIZE,
            secondary: None,
        }
    }
}

/// Output encodings supported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    /// Picks the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("png") => Ok(ImageFormat::Png),
            Some("svg") => Ok(ImageFormat::Svg),
            _ => Err(PlotError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Renders a chart and saves it to `output_path`
///
/// The data is validated before any file is touched, so an invalid chart never
/// leaves a blank image behind.
///
/// # Arguments
/// * `spec` - Title, axis labels, chart kind, scaling and optional secondary axis
/// * `series` - Series drawn against the primary axis, in legend order
/// * `output_path` - Path of the `.png` or `.svg` file to write
///
/// # Returns
/// * `Ok(())` - If the chart was successfully created and saved
/// * `Err(PlotError)` - If the data is invalid or an error occurred during chart generation
///
/// # Chart Properties
/// * X-axis: buckets labelled `2^n`; categorical for bar charts
/// * Y-axis: tick counts with decimal unit suffixes (`k`, `M`, `G`, `T`)
/// * Grid and legend: always drawn
/// * Font rendering: Requires a `sans-serif` system font (plotters `ttf` feature)
pub fn render_chart(spec: &ChartSpec, series: &[Series], output_path: &Path) -> Result<()> {
    validate_chart(spec, series)?;
    let format = ImageFormat::from_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(output_path, spec.size).into_drawing_area();
            draw_chart(root, spec, series)
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(output_path, spec.size).into_drawing_area();
            draw_chart(root, spec, series)
        }
    }
}

/// Checks that a chart has something meaningful to draw
///
/// # Returns
/// * `Ok(())` - If every series has points and every value can be drawn on its axis
/// * `Err(PlotError::InvalidData)` - Otherwise
pub fn validate_chart(spec: &ChartSpec, series: &[Series]) -> Result<()> {
    if series.is_empty() {
        return Err(PlotError::InvalidData(
            "Chart needs at least one series".to_string(),
        ));
    }

    for entry in series {
        validate_series(entry, spec.y_scale)?;
    }

    if let Some(secondary) = &spec.secondary {
        validate_series(&secondary.series, YScale::Linear)?;

        // The secondary axis shares the primary X placement
        let primary: BTreeSet<Bucket> = series
            .iter()
            .flat_map(|entry| entry.points.keys().copied())
            .collect();
        if let Some(bucket) = secondary
            .series
            .points
            .keys()
            .find(|bucket| !primary.contains(bucket))
        {
            return Err(PlotError::InvalidData(format!(
                "Series '{}' has a point at {} which no primary series covers",
                secondary.series.label, bucket
            )));
        }
    }

    if spec.size.0 == 0 || spec.size.1 == 0 {
        return Err(PlotError::InvalidData(format!(
            "Image size {}x{} is empty",
            spec.size.0, spec.size.1
        )));
    }

    Ok(())
}

fn validate_series(series: &Series, y_scale: YScale) -> Result<()> {
    if series.points.is_empty() {
        return Err(PlotError::InvalidData(format!(
            "Series '{}' has no data points",
            series.label
        )));
    }

    for (bucket, value) in &series.points {
        if !value.is_finite() {
            return Err(PlotError::InvalidData(format!(
                "Series '{}' has a non-finite value at {}",
                series.label, bucket
            )));
        }

        if y_scale == YScale::Log && *value <= 0.0 {
            return Err(PlotError::InvalidData(format!(
                "Series '{}' has value {} at {} which cannot be drawn on a logarithmic axis",
                series.label, value, bucket
            )));
        }
    }

    Ok(())
}

/// Axis ranges and bucket placement shared by all drawing steps.
#[derive(Debug, Clone, PartialEq)]
struct Layout {
    kind: ChartKind,
    x_scale: XScale,
    y_scale: YScale,
    y_format: ValueFormat,
    /// Union of all buckets, ascending
    buckets: Vec<Bucket>,
    x_range: Range<f64>,
    y_range: Range<f64>,
    x_label_count: usize,
}

impl Layout {
    fn new(spec: &ChartSpec, series: &[Series]) -> Self {
        let buckets: Vec<Bucket> = series
            .iter()
            .flat_map(|entry| entry.points.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut layout = Self {
            kind: spec.kind,
            x_scale: spec.x_scale,
            y_scale: spec.y_scale,
            y_format: spec.y_format,
            buckets,
            x_range: 0.0..1.0,
            y_range: 0.0..1.0,
            x_label_count: 0,
        };

        layout.x_range = layout.compute_x_range();
        layout.x_label_count = match (layout.kind, layout.x_scale) {
            (ChartKind::Line, XScale::Linear) => 10,
            _ => layout.x_range_width().ceil() as usize + 1,
        };

        let values: Vec<f64> = series
            .iter()
            .flat_map(|entry| entry.points.values())
            .map(|value| layout.y_scale.project(*value))
            .collect();
        layout.y_range = match layout.kind {
            ChartKind::Line => padded_range(&values),
            ChartKind::Bar => bar_range(&values, layout.y_scale),
        };

        layout
    }

    fn x_range_width(&self) -> f64 {
        self.x_range.end - self.x_range.start
    }

    fn compute_x_range(&self) -> Range<f64> {
        match (self.kind, self.x_scale) {
            (ChartKind::Bar, _) => -0.5..(self.buckets.len() as f64 - 0.5),
            (ChartKind::Line, XScale::Log2) => {
                let first = self.buckets.first().map_or(0.0, |b| b.power as f64);
                let last = self.buckets.last().map_or(0.0, |b| b.power as f64);
                (first - 0.5)..(last + 0.5)
            }
            (ChartKind::Line, XScale::Linear) => {
                let positions: Vec<f64> =
                    self.buckets.iter().map(|b| b.elements() as f64).collect();
                padded_range(&positions)
            }
        }
    }

    /// X coordinate of the centre of a bucket.
    fn x_position(&self, bucket: Bucket) -> Option<f64> {
        match (self.kind, self.x_scale) {
            (ChartKind::Bar, _) => self
                .buckets
                .iter()
                .position(|candidate| *candidate == bucket)
                .map(|index| index as f64),
            (ChartKind::Line, XScale::Log2) => Some(bucket.power as f64),
            (ChartKind::Line, XScale::Linear) => Some(bucket.elements() as f64),
        }
    }

    /// Tick label for an X coordinate; only bucket positions are labelled.
    fn x_label(&self, x: f64) -> String {
        match (self.kind, self.x_scale) {
            (ChartKind::Bar, _) => {
                let index = x.round();
                if (x - index).abs() > 0.3 || index < 0.0 {
                    return String::new();
                }
                self.buckets
                    .get(index as usize)
                    .map(Bucket::label)
                    .unwrap_or_default()
            }
            (ChartKind::Line, XScale::Log2) => {
                let power = x.round();
                if (x - power).abs() > 1e-6 {
                    return String::new();
                }
                self.buckets
                    .iter()
                    .find(|bucket| bucket.power as f64 == power)
                    .map(Bucket::label)
                    .unwrap_or_default()
            }
            (ChartKind::Line, XScale::Linear) => format_tick_count(x),
        }
    }

    fn y_label(&self, y: f64) -> String {
        let span =
            self.y_scale.unproject(self.y_range.end) - self.y_scale.unproject(self.y_range.start);
        self.y_format.format(self.y_scale.unproject(y), span)
    }
}

/// Range covering all values with 5% headroom on either side.
fn padded_range(values: &[f64]) -> Range<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }

    let span = max - min;
    let padding = if span > 0.0 {
        span * 0.05
    } else if min != 0.0 {
        min.abs() * 0.05
    } else {
        1.0
    };

    (min - padding)..(max + padding)
}

/// Range for bars, which grow from the bottom of the axis.
fn bar_range(values: &[f64], y_scale: YScale) -> Range<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }

    let start = match y_scale {
        YScale::Linear => min.min(0.0),
        // Start one decade below the smallest bar so it stays visible
        YScale::Log => (min - 0.05).floor(),
    };

    let span = max - start;
    let end = if span > 0.0 { max + span * 0.05 } else { start + 1.0 };
    start..end
}

/// Draws a validated chart onto any plotters backend
fn draw_chart<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    series: &[Series],
) -> Result<()> {
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let layout = Layout::new(spec, series);

    let mut builder = ChartBuilder::on(&root);
    builder
        .caption(&spec.title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(100);

    if spec.secondary.is_some() {
        builder.right_y_label_area_size(100);
    }

    let chart = builder
        .build_cartesian_2d(layout.x_range.clone(), layout.y_range.clone())
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    match &spec.secondary {
        None => {
            let mut chart = chart;
            draw_primary(&mut chart, spec, &layout, series)?;
            draw_legend(&mut chart)?;
        }
        Some(secondary) => {
            let values: Vec<f64> = secondary.series.points.values().copied().collect();
            let secondary_range = padded_range(&values);
            let secondary_span = secondary_range.end - secondary_range.start;
            let mut chart = chart.set_secondary_coord(layout.x_range.clone(), secondary_range);

            draw_primary(&mut chart, spec, &layout, series)?;

            let y_formatter = |y: &f64| ValueFormat::Plain.format(*y, secondary_span);
            chart
                .configure_secondary_axes()
                .y_desc(secondary.label.as_str())
                .y_label_formatter(&y_formatter)
                .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
                .axis_desc_style(("sans-serif", AXIS_DESC_FONT_SIZE))
                .draw()
                .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

            let points: Vec<(f64, f64)> = secondary
                .series
                .points
                .iter()
                .filter_map(|(bucket, value)| Some((layout.x_position(*bucket)?, *value)))
                .collect();

            chart
                .draw_secondary_series(LineSeries::new(
                    points.iter().copied(),
                    SECONDARY_COLOR.stroke_width(2),
                ))
                .map_err(drawing_error)?
                .label(secondary.series.label.as_str())
                .legend(|(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], SECONDARY_COLOR.stroke_width(2))
                });

            chart
                .draw_secondary_series(
                    points
                        .iter()
                        .map(|&point| Circle::new(point, MARKER_RADIUS, SECONDARY_COLOR.filled())),
                )
                .map_err(drawing_error)?;

            draw_legend(&mut chart)?;
        }
    }

    // Ensure everything is properly rendered and saved
    root.present().map_err(drawing_error)?;
    Ok(())
}

fn draw_primary<'a, DB: DrawingBackend + 'a>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    spec: &ChartSpec,
    layout: &Layout,
    series: &[Series],
) -> Result<()> {
    let x_formatter = |x: &f64| layout.x_label(*x);
    let y_formatter = |y: &f64| layout.y_label(*y);

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_labels(layout.x_label_count)
        .y_labels(10)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_DESC_FONT_SIZE));

    if layout.kind == ChartKind::Bar {
        mesh.disable_x_mesh();
    }

    mesh.draw()
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    match layout.kind {
        ChartKind::Line => draw_lines(chart, layout, series),
        ChartKind::Bar => draw_bars(chart, layout, series),
    }
}

fn draw_lines<'a, DB: DrawingBackend + 'a>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    layout: &Layout,
    series: &[Series],
) -> Result<()> {
    for (index, entry) in series.iter().enumerate() {
        let color = series_color(index);
        let points: Vec<(f64, f64)> = entry
            .points
            .iter()
            .filter_map(|(bucket, value)| {
                Some((layout.x_position(*bucket)?, layout.y_scale.project(*value)))
            })
            .collect();

        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(drawing_error)?
            .label(entry.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&point| Circle::new(point, MARKER_RADIUS, color.filled())),
            )
            .map_err(drawing_error)?;
    }

    Ok(())
}

fn draw_bars<'a, DB: DrawingBackend + 'a>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    layout: &Layout,
    series: &[Series],
) -> Result<()> {
    let group_width = 0.8;
    let bar_width = group_width / series.len() as f64;
    let base = layout.y_range.start;

    for (index, entry) in series.iter().enumerate() {
        let color = series_color(index);
        let offset = (index as f64 - (series.len() as f64 - 1.0) / 2.0) * bar_width;

        let bars: Vec<Rectangle<(f64, f64)>> = entry
            .points
            .iter()
            .filter_map(|(bucket, value)| {
                let center = layout.x_position(*bucket)? + offset;
                let left = center - bar_width / 2.0 + 0.01;
                let right = center + bar_width / 2.0 - 0.01;
                Some(Rectangle::new(
                    [(left, base), (right, layout.y_scale.project(*value))],
                    color.filled(),
                ))
            })
            .collect();

        chart
            .draw_series(bars)
            .map_err(drawing_error)?
            .label(entry.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
    }

    Ok(())
}

fn draw_legend<'a, DB: DrawingBackend + 'a>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
) -> Result<()> {
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing_error)?;

    Ok(())
}
