use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use snapshot_regress::artifacts::ArtifactDir;
use snapshot_regress::config;
use snapshot_regress::demo::{Screen, demo_registry};
use snapshot_regress::runner::{RunReport, run_scenarios};
use snapshot_regress::snapshot::{
    CaptureConfiguration, ColorScheme, DeviceProfile, FsBaselineStore, Image, Renderable, RunMode,
    SnapshotEngine, Verdict, compare,
};

/// Snapshot-based visual regression testing
#[derive(Parser, Debug)]
#[command(
    name = "snapshot-regress",
    version,
    about = "Record and verify reference images of rendered views",
    after_help = "ENVIRONMENT VARIABLES:\n\
        SNAPSHOT_RECORD          Record signal; truthy selects record mode\n\
        SNAPSHOT_BASELINE_DIR    Baseline root directory\n\
        SNAPSHOT_DIFF_DIR        Diff artifact directory\n\
        SNAPSHOT_PRECISION       Default fraction of pixels that must match\n\
        SNAPSHOT_TOLERANCE       Default per-channel tolerance\n\
        SNAPSHOT_WORKERS         Parallel scenario workers\n\
        SNAPSHOT_DEVICE          Default device profile\n\
        RUST_LOG                 Log filter (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the demo scenarios in record or verify mode
    Run {
        /// Force record mode, ignoring the environment
        #[arg(long)]
        record: bool,

        /// Environment variable to read the record signal from (e.g., CI)
        #[arg(long, value_name = "VAR")]
        record_signal: Option<String>,

        /// Baseline root directory
        #[arg(long)]
        baseline_dir: Option<PathBuf>,

        /// Diff artifact directory
        #[arg(long)]
        diff_dir: Option<PathBuf>,

        /// Device preset or WxH[@S]: iphone-se, iphone-8, iphone-13-pro-max, ipad-mini
        #[arg(long, short = 'd')]
        device: Option<String>,

        /// Fraction of pixels that must match, 0-1
        #[arg(long)]
        precision: Option<f64>,

        /// Per-channel tolerance, 0-1
        #[arg(long)]
        tolerance: Option<f64>,

        /// Parallel workers
        #[arg(long, short = 'j')]
        workers: Option<usize>,

        /// Only run scenarios whose suite or name contains this text
        #[arg(long, short = 'f')]
        filter: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Compare two PNG files
    Compare {
        /// Freshly rendered image
        candidate: PathBuf,

        /// Reference image
        baseline: PathBuf,

        /// Fraction of pixels that must match, 0-1
        #[arg(long, default_value = "1.0")]
        precision: f64,

        /// Per-channel tolerance, 0-1
        #[arg(long, default_value = "0.0")]
        tolerance: f64,

        /// Write the diff image here when the images differ
        #[arg(long)]
        diff: Option<PathBuf>,
    },

    /// List the identities of the demo scenarios
    List {
        /// Device preset or WxH[@S]
        #[arg(long, short = 'd')]
        device: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove diff artifacts
    Clean {
        /// Diff artifact directory
        #[arg(long)]
        diff_dir: Option<PathBuf>,

        /// Only remove diffs older than this many hours
        #[arg(long)]
        older_than: Option<u64>,
    },

    /// Render one demo screen to a PNG
    Render {
        #[arg(value_enum)]
        screen: ScreenArg,

        /// Device preset or WxH[@S]
        #[arg(long, short = 'd')]
        device: Option<String>,

        /// light or dark
        #[arg(long, default_value = "light")]
        scheme: ColorScheme,

        /// Output file path
        #[arg(short, long, default_value = "./screen.png")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScreenArg {
    Content,
    Dashboard,
    Products,
    Profile,
    Settings,
}

impl From<ScreenArg> for Screen {
    fn from(arg: ScreenArg) -> Self {
        match arg {
            ScreenArg::Content => Screen::Content,
            ScreenArg::Dashboard => Screen::Dashboard,
            ScreenArg::Products => Screen::Products,
            ScreenArg::Profile => Screen::Profile,
            ScreenArg::Settings => Screen::Settings,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::EnvFilter::from_default_env(),
        Err(_) => tracing_subscriber::EnvFilter::new("info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(Args::parse()).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<u8> {
    let config = config::get();

    match args.command {
        Commands::Run {
            record,
            record_signal,
            baseline_dir,
            diff_dir,
            device,
            precision,
            tolerance,
            workers,
            filter,
            json,
            report,
        } => {
            let mode = if record {
                RunMode::Record
            } else if let Some(var) = record_signal {
                RunMode::from_env_var(&var)
            } else {
                config.run_mode
            };

            config.defaults.validate()?;
            let mut base = config.defaults.capture_configuration();
            if let Some(device) = device {
                base.device = parse_device(&device)?;
            }
            if let Some(precision) = precision {
                base.precision = precision;
            }
            if let Some(tolerance) = tolerance {
                base.perceptual_tolerance = tolerance;
            }
            base.validate()?;

            let mut registry = demo_registry(&base);
            if let Some(needle) = filter {
                registry = registry.filter(&needle);
                if registry.is_empty() {
                    bail!("no scenarios match '{}'", needle);
                }
            }

            let baseline_dir = baseline_dir.unwrap_or_else(|| config.storage.baseline_dir.clone());
            let artifacts = ArtifactDir::new(diff_dir.unwrap_or_else(|| config.storage.diff_dir.clone()));
            artifacts.init(mode)?;

            info!(baselines = %baseline_dir.display(), %mode, "resolved run");
            let engine = Arc::new(SnapshotEngine::new(FsBaselineStore::new(baseline_dir), mode));
            let workers = workers.unwrap_or(config.defaults.workers);
            let run_report = run_scenarios(engine, &registry, Some(artifacts), workers).await;

            if let Some(path) = report {
                run_report.write_json(&path)?;
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&run_report)?);
            } else {
                print_report(&run_report);
            }
            Ok(run_report.exit_code() as u8)
        }

        Commands::Compare {
            candidate,
            baseline,
            precision,
            tolerance,
            diff,
        } => {
            CaptureConfiguration::default()
                .precision(precision)
                .perceptual_tolerance(tolerance)
                .validate()?;

            let candidate_image = read_png(&candidate)?;
            let baseline_image = read_png(&baseline)?;
            let result = compare(&candidate_image, &baseline_image, precision, tolerance);

            println!("Verdict: {:?}", result.verdict);
            println!(
                "  Mismatched: {}/{} pixels ({:.4}%)",
                result.mismatched_pixels,
                result.total_pixels,
                result.mismatched_pixel_fraction * 100.0
            );
            println!("  Max channel difference: {}", result.max_channel_difference);
            if result.verdict == Verdict::SizeMismatch {
                println!(
                    "  Sizes: candidate {}x{}, baseline {}x{}",
                    candidate_image.width(),
                    candidate_image.height(),
                    baseline_image.width(),
                    baseline_image.height()
                );
            }

            if let (Some(path), Some(diff_image)) = (diff, &result.diff_image) {
                std::fs::write(&path, diff_image.to_png()?)
                    .with_context(|| format!("writing diff to {}", path.display()))?;
                println!("  Diff: {}", path.display());
            }

            Ok(if result.verdict == Verdict::Pass { 0 } else { 1 })
        }

        Commands::List { device, json } => {
            config.defaults.validate()?;
            let mut base = config.defaults.capture_configuration();
            if let Some(device) = device {
                base.device = parse_device(&device)?;
            }
            let identities = demo_registry(&base).identities();
            if json {
                println!("{}", serde_json::to_string_pretty(&identities)?);
            } else {
                for identity in &identities {
                    println!("{}", identity);
                }
            }
            Ok(0)
        }

        Commands::Clean { diff_dir, older_than } => {
            let artifacts = ArtifactDir::new(diff_dir.unwrap_or_else(|| config.storage.diff_dir.clone()));
            match older_than {
                Some(hours) => {
                    let removed = artifacts.clean_older_than(Duration::from_secs(hours * 3600))?;
                    println!("Removed {} diff images from {}", removed, artifacts.dir.display());
                }
                None => {
                    artifacts.clean()?;
                    println!("Removed {}", artifacts.dir.display());
                }
            }
            Ok(0)
        }

        Commands::Render {
            screen,
            device,
            scheme,
            output,
        } => {
            config.defaults.validate()?;
            let device = match device {
                Some(device) => parse_device(&device)?,
                None => config.defaults.device.clone(),
            };
            let capture = CaptureConfiguration::new(device).color_scheme(scheme);
            capture.validate()?;
            let image = Screen::from(screen).render(&capture)?;
            std::fs::write(&output, image.to_png()?)
                .with_context(|| format!("writing {}", output.display()))?;

            println!("Rendered {:?}: {}", screen, output.display());
            println!("  Size: {}x{} ({})", image.width(), image.height(), capture.key());
            Ok(0)
        }
    }
}

fn parse_device(s: &str) -> Result<DeviceProfile> {
    DeviceProfile::parse(s).with_context(|| {
        format!(
            "invalid device '{}'. Use: iphone-se, iphone-8, iphone-13-pro-max, ipad-mini, or WxH[@S]",
            s
        )
    })
}

fn read_png(path: &Path) -> Result<Image> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Image::from_png(&bytes).with_context(|| format!("decoding {}", path.display()))
}

fn print_report(report: &RunReport) {
    for record in &report.records {
        let mut line = format!("{:<9} {}", format!("{:?}", record.status).to_uppercase(), record.identity);
        if let Some(message) = &record.message {
            line.push_str(&format!(": {}", message));
        }
        println!("{}", line);
        if let Some(path) = &record.diff_image_path {
            println!("          diff: {}", path.display());
        }
    }

    let summary = report.summary();
    println!(
        "\n{} mode: {} total, {} recorded, {} passed, {} failed, {} errors",
        report.mode, summary.total, summary.recorded, summary.passed, summary.failed, summary.errors
    );
}
