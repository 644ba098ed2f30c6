use argh::FromArgs;
use indicatif::{ProgressBar, ProgressStyle};
use sortbench_plots::analysis::Statistic;
use sortbench_plots::manifest::Manifest;
use sortbench_plots::report::{
    build_summary, compare_results, format_summary, load_manifest_results, manifest_speedups,
    render_chart, write_summary_json, CompareOptions,
};
use sortbench_plots::ReportError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::metadata::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Charts and summaries for sorting benchmark results
#[derive(FromArgs, Debug)]
struct Args {
    /// log debug output
    #[argh(switch, short = 'v')]
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Render(RenderArgs),
    Compare(CompareArgs),
    Summary(SummaryArgs),
}

/// Render every chart of a plot manifest
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "render")]
struct RenderArgs {
    /// path to the TOML plot manifest
    #[argh(positional)]
    manifest: PathBuf,

    /// output directory (default: the manifest's output_dir)
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// statistic for all charts, mean or median (default: from the manifest)
    #[argh(option, short = 's')]
    statistic: Option<Statistic>,

    /// also write summary.txt and summary.json to the output directory
    #[argh(switch)]
    summary: bool,
}

/// Compare a candidate result file against a baseline
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "compare")]
struct CompareArgs {
    /// baseline results file with power and cycles columns
    #[argh(option, short = 'b')]
    baseline: PathBuf,

    /// candidate results file with power and cycles columns
    #[argh(option, short = 'c')]
    candidate: PathBuf,

    /// legend name of the baseline (default: Vanilla)
    #[argh(option, default = "String::from(\"Vanilla\")")]
    baseline_name: String,

    /// legend name of the candidate (default: SIMD)
    #[argh(option, default = "String::from(\"SIMD\")")]
    candidate_name: String,

    /// statistic, mean or median (default: median)
    #[argh(option, short = 's', default = "Statistic::Median")]
    statistic: Statistic,

    /// output directory (default: current directory)
    #[argh(option, short = 'o', default = "PathBuf::from(\".\")")]
    output: PathBuf,
}

/// Print the aggregated statistics of a plot manifest
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "summary")]
struct SummaryArgs {
    /// path to the TOML plot manifest
    #[argh(positional)]
    manifest: PathBuf,

    /// statistic, mean or median (default: from the manifest)
    #[argh(option, short = 's')]
    statistic: Option<Statistic>,

    /// also write the summary as JSON to this path
    #[argh(option)]
    json: Option<PathBuf>,
}

fn configure_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let fmt_layer = fmt::layer().compact().with_target(false);
    let level_filter_layer = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(level_filter_layer)
        .init();
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    bar.set_style(style);
    bar
}

fn load_manifest(path: &Path, statistic: Option<Statistic>) -> Result<Manifest, ReportError> {
    let mut manifest = Manifest::load(path)?;
    if let Some(statistic) = statistic {
        manifest.override_statistic(statistic);
    }
    Ok(manifest)
}

fn render(args: RenderArgs) -> Result<(), ReportError> {
    let manifest = load_manifest(&args.manifest, args.statistic)?;
    let base_dir = Manifest::base_dir(&args.manifest);
    let output_dir = args
        .output
        .unwrap_or_else(|| manifest.resolved_output_dir(&base_dir));

    let table = load_manifest_results(&manifest, &base_dir)?;
    info!(
        rows = table.len(),
        charts = manifest.charts.len(),
        "Rendering charts to {}",
        output_dir.display()
    );

    let bar = progress_bar(manifest.charts.len() as u64);
    for entry in &manifest.charts {
        bar.set_message(entry.file.display().to_string());
        bar.suspend(|| render_chart(entry, &table, &manifest, &output_dir))?;
        bar.inc(1);
    }
    bar.finish_with_message("done");

    if args.summary {
        let summary = build_summary(&table, manifest.statistic, &manifest_speedups(&manifest))?;
        fs::create_dir_all(&output_dir)?;
        fs::write(output_dir.join("summary.txt"), format_summary(&summary))?;
        write_summary_json(&summary, &output_dir.join("summary.json"))?;
    }

    Ok(())
}

fn compare(args: CompareArgs) -> Result<(), ReportError> {
    let options = CompareOptions {
        baseline_name: args.baseline_name,
        candidate_name: args.candidate_name,
        statistic: args.statistic,
        ..CompareOptions::default()
    };

    let written = compare_results(&args.baseline, &args.candidate, &options, &args.output)?;
    info!("Wrote {} charts to {}", written.len(), args.output.display());
    Ok(())
}

fn summary(args: SummaryArgs) -> Result<(), ReportError> {
    let manifest = load_manifest(&args.manifest, args.statistic)?;
    let base_dir = Manifest::base_dir(&args.manifest);

    let table = load_manifest_results(&manifest, &base_dir)?;
    let summary = build_summary(&table, manifest.statistic, &manifest_speedups(&manifest))?;
    println!("{}", format_summary(&summary));

    if let Some(path) = args.json {
        write_summary_json(&summary, &path)?;
    }

    Ok(())
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    configure_tracing(args.verbose);

    let result = match args.command {
        Command::Render(args) => render(args),
        Command::Compare(args) => compare(args),
        Command::Summary(args) => summary(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
