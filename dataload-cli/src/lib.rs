#![warn(missing_docs)]
//! Dataload CLI Library
//!
//! Command-line front end for the loader benchmark: lists a folder, runs the
//! selected execution strategy with a progress bar, then renders the result.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     dataload_cli::run()
//! }
//! ```

mod config;
mod input;
mod metadata;
mod progress;

pub use config::*;
pub use input::{InputError, collect_inputs};
pub use metadata::collect_system_info;
pub use progress::ProgressObserver;

use anyhow::Context;
use clap::Parser;
use dataload_core::{BenchmarkRunner, Mode, RunContext, RunSummary, RunnerConfig};
use dataload_report::{
    OutputFormat, RunReport, RunStatistics, SystemInfo, default_report_name,
    format_human_output, format_system_info, generate_csv_report, render_report,
};
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Dataload CLI arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "dataload")]
#[command(
    author,
    version,
    about = "Measure how fast a folder of files loads sequentially, pinned to one core, or across all cores"
)]
pub struct Cli {
    /// Folder containing the files to load
    #[arg(short, long)]
    pub folder: PathBuf,

    /// Pin the process and every worker to a single core
    #[arg(short = 's', long, conflicts_with = "multi_core")]
    pub same_core: bool,

    /// Load files in parallel across all cores
    #[arg(short = 'm', long)]
    pub multi_core: bool,

    /// Worker count for --same-core/--multi-core (default: host core count)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Core used by --same-core (default: 0)
    #[arg(long)]
    pub core: Option<usize>,

    /// Read ahead through a bounded prefetch pipeline (sequential mode only)
    #[arg(long, conflicts_with_all = ["same_core", "multi_core"])]
    pub prefetch: bool,

    /// Extension of the files to load (default: csv)
    #[arg(long)]
    pub extension: Option<String>,

    /// Only load files whose name matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Output format: human, csv, json
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Save a {mode}_summary_{HHMMSS}.csv into the output directory
    #[arg(long)]
    pub save_csv: bool,

    /// Directory for --save-csv (default: from dataload.toml, else current directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Settings after layering dataload.toml defaults under CLI flags
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    /// Core runner configuration
    pub runner: RunnerConfig,
    /// Input file extension
    pub extension: String,
    /// Optional file-name filter
    pub filter: Option<Regex>,
    /// Rendering format
    pub format: OutputFormat,
    /// Directory for saved CSV summaries
    pub output_dir: PathBuf,
    /// Whether to save a CSV summary
    pub save_csv: bool,
}

impl ResolvedSettings {
    /// Merge `cli` over `config`
    pub fn resolve(cli: &Cli, config: &DataloadConfig) -> anyhow::Result<Self> {
        let mode = if cli.same_core {
            Mode::SingleCorePinned
        } else if cli.multi_core {
            Mode::MultiCoreParallel
        } else {
            config.runner.mode
        };

        let base = config.runner.to_runner_config();
        let runner = RunnerConfig {
            mode,
            workers: cli.jobs.or(base.workers),
            pinned_core: cli.core.unwrap_or(base.pinned_core),
            // A prefetch default from the file only applies where it is valid
            prefetch: cli.prefetch || (base.prefetch && mode == Mode::Sequential),
        };

        let filter = cli
            .filter
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("Invalid --filter regex")?;

        let format = cli
            .format
            .as_deref()
            .unwrap_or(&config.output.format)
            .parse::<OutputFormat>()
            .map_err(anyhow::Error::msg)?;

        Ok(Self {
            runner,
            extension: cli
                .extension
                .clone()
                .unwrap_or_else(|| config.runner.extension.clone()),
            filter,
            format,
            output_dir: cli
                .output_dir
                .clone()
                .unwrap_or_else(|| config.output.directory.clone()),
            save_csv: cli.save_csv || config.output.save_csv,
        })
    }
}

/// Everything a finished CLI run produced
#[derive(Debug)]
pub struct CliRun {
    /// Raw summary from the runner
    pub summary: RunSummary,
    /// Aggregates derived from the summary
    pub statistics: RunStatistics,
    /// Host description
    pub system: SystemInfo,
    /// Report rendered in the requested format
    pub rendered: String,
    /// Path of the saved CSV summary, if one was written
    pub csv_path: Option<PathBuf>,
}

/// Run the Dataload CLI with the process arguments.
/// This is the main entry point for the `dataload` binary.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Dataload CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_tracing(cli.verbose);

    // Discover dataload.toml configuration (CLI flags override)
    let config = DataloadConfig::discover().unwrap_or_default();
    let settings = ResolvedSettings::resolve(&cli, &config)?;

    let outcome = execute(&cli, &settings)?;

    if let Some(ref path) = cli.output {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(outcome.rendered.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", outcome.rendered);
    }

    if let Some(path) = &outcome.csv_path {
        eprintln!("Summary saved to: {}", path.display());
    }
    if outcome.summary.failed_count() > 0 {
        eprintln!(
            "\n{} of {} file(s) failed to load",
            outcome.summary.failed_count(),
            outcome.summary.records.len()
        );
    }

    Ok(())
}

/// List inputs, run, render and optionally save.
///
/// In interactive human mode the host banner is printed before the run starts.
pub fn execute(cli: &Cli, settings: &ResolvedSettings) -> anyhow::Result<CliRun> {
    let tasks = collect_inputs(&cli.folder, &settings.extension, settings.filter.as_ref())?;
    let system = collect_system_info();

    let banner = settings.format == OutputFormat::Human && !cli.no_progress && cli.output.is_none();
    if banner {
        print!("\n{}", format_system_info(&system));
        println!(
            "\nLoading {} file(s) in {} mode...\n",
            tasks.len(),
            settings.runner.mode
        );
    }

    let observer = Arc::new(if cli.no_progress {
        ProgressObserver::hidden(tasks.len())
    } else {
        ProgressObserver::new(tasks.len())
    });
    let context = RunContext::system().with_observer(observer.clone());
    let runner = BenchmarkRunner::with_context(settings.runner.clone(), context);

    let result = runner.run(tasks);
    observer.finish();
    let summary = result?;

    let statistics = RunStatistics::from_summary(&summary);
    let rendered = match settings.format {
        OutputFormat::Human => {
            format_human_output(&summary, &statistics, (!banner).then_some(&system))
        }
        OutputFormat::Csv => generate_csv_report(&summary),
        OutputFormat::Json => render_report(
            &RunReport::new(summary.clone(), statistics.clone()).with_system(system.clone()),
        )?,
    };

    let csv_path = if settings.save_csv {
        Some(save_csv(&summary, &settings.output_dir)?)
    } else {
        None
    };

    Ok(CliRun {
        summary,
        statistics,
        system,
        rendered,
        csv_path,
    })
}

/// Write the CSV summary into `directory` under its default name
pub fn save_csv(summary: &RunSummary, directory: &std::path::Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create {}", directory.display()))?;
    let path = directory.join(default_report_name(
        summary.mode,
        summary.program_end,
        OutputFormat::Csv.extension(),
    ));
    std::fs::write(&path, generate_csv_report(summary))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "csv summary saved");
    Ok(path)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "dataload=debug" } else { "dataload=info" };
    // A subscriber may already be installed when embedded or under test
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("dataload").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_flags() {
        let cli = parse(&["-f", "data", "-m", "-j", "4", "--format", "json"]).unwrap();
        assert!(cli.multi_core);
        assert_eq!(cli.jobs, Some(4));

        let settings = ResolvedSettings::resolve(&cli, &DataloadConfig::default()).unwrap();
        assert_eq!(settings.runner.mode, Mode::MultiCoreParallel);
        assert_eq!(settings.runner.workers, Some(4));
        assert_eq!(settings.format, OutputFormat::Json);
        assert_eq!(settings.extension, "csv");
    }

    #[test]
    fn test_conflicting_modes_rejected() {
        assert!(parse(&["-f", "data", "-s", "-m"]).is_err());
        assert!(parse(&["-f", "data", "-m", "--prefetch"]).is_err());
        assert!(parse(&["-s"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let config: DataloadConfig = toml::from_str(
            "[runner]\nmode = \"multi_core\"\njobs = 2\nprefetch = true\n[output]\nformat = \"csv\"\n",
        )
        .unwrap();

        let from_file = ResolvedSettings::resolve(&parse(&["-f", "d"]).unwrap(), &config).unwrap();
        assert_eq!(from_file.runner.mode, Mode::MultiCoreParallel);
        assert_eq!(from_file.runner.workers, Some(2));
        // Ignored outside sequential mode
        assert!(!from_file.runner.prefetch);
        assert_eq!(from_file.format, OutputFormat::Csv);

        let cli = parse(&["-f", "d", "-s", "--core", "1", "--format", "human"]).unwrap();
        let overridden = ResolvedSettings::resolve(&cli, &config).unwrap();
        assert_eq!(overridden.runner.mode, Mode::SingleCorePinned);
        assert_eq!(overridden.runner.pinned_core, 1);
        assert_eq!(overridden.format, OutputFormat::Human);
    }

    #[test]
    fn test_config_prefetch_applies_to_sequential_runs() {
        let config: DataloadConfig =
            toml::from_str("[runner]\nprefetch = true\njobs = 3\npinned_core = 2\n").unwrap();

        let settings = ResolvedSettings::resolve(&parse(&["-f", "d"]).unwrap(), &config).unwrap();
        assert_eq!(settings.runner, config.runner.to_runner_config());
        assert!(settings.runner.prefetch);
    }

    #[test]
    fn test_bad_filter_and_format() {
        let cli = parse(&["-f", "d", "--filter", "("]).unwrap();
        assert!(ResolvedSettings::resolve(&cli, &DataloadConfig::default()).is_err());

        let cli = parse(&["-f", "d", "--format", "html"]).unwrap();
        assert!(ResolvedSettings::resolve(&cli, &DataloadConfig::default()).is_err());
    }

    #[test]
    fn test_execute_saves_csv() {
        let data = tempfile::tempdir().unwrap();
        for name in ["a.csv", "b.csv"] {
            std::fs::write(data.path().join(name), b"x,y\n1,2\n").unwrap();
        }
        let out = tempfile::tempdir().unwrap();

        let folder = data.path().to_str().unwrap();
        let output_dir = out.path().to_str().unwrap();
        let cli = parse(&[
            "-f", folder, "--no-progress", "--save-csv", "--output-dir", output_dir, "--format", "csv",
        ])
        .unwrap();
        let settings = ResolvedSettings::resolve(&cli, &DataloadConfig::default()).unwrap();

        let outcome = execute(&cli, &settings).unwrap();
        assert_eq!(outcome.summary.records.len(), 2);
        assert_eq!(outcome.rendered.lines().count(), 3);

        let path = outcome.csv_path.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sequential_summary_") && name.ends_with(".csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap().lines().count(), 3);
    }
}
