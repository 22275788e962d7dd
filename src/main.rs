//! Sentinel Sensor Agent CLI
//!
//! Industrial sensor anomaly-to-decision pipeline.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sentinel_sensor_agent::{
    config::{Config, FeatureConfig},
    core::{DriftMonitor, RunReport, TabularSeries},
    detector::ScorerKind,
    simulation::{normal_operation, FailureInjector, FailureKind},
    InspectionPipeline, SensorReading, SpotAssessor, VERSION,
};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(version = VERSION)]
#[command(about = "Industrial sensor anomaly detection with persistence-based alerting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit on normal data and evaluate a recorded series
    Run {
        /// Series to evaluate (JSON: {"index": [...], "channels": {...}})
        #[arg(long, short)]
        input: PathBuf,

        /// Normal-operation series to fit on
        #[arg(long)]
        train: Option<PathBuf>,

        /// Fit on the first N rows of the input and evaluate the rest
        #[arg(long)]
        train_rows: Option<usize>,

        /// Channels to use, comma-separated (defaults to the configured ones)
        #[arg(long)]
        channels: Option<String>,

        /// Write the JSON report to this file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Also write the report into the configured export directory
        #[arg(long)]
        export: bool,

        /// Scorer to use (statistical or ensemble)
        #[arg(long)]
        scorer: Option<String>,

        /// Risk threshold override (the ensemble's risk rarely exceeds 0.6)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Run the pipeline on synthetic data with an injected failure
    Simulate {
        /// Rows of training data and of test data
        #[arg(long, default_value = "500")]
        samples: usize,

        /// Seed for the synthetic data
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Scorer to use (statistical or ensemble)
        #[arg(long)]
        scorer: Option<String>,

        /// Risk threshold override (the ensemble's risk rarely exceeds 0.6)
        #[arg(long)]
        threshold: Option<f64>,

        /// Failure to inject (overheating, spike, drift or none)
        #[arg(long, default_value = "overheating")]
        failure: String,

        /// Channel to inject into (defaults per failure kind)
        #[arg(long)]
        channel: Option<String>,

        /// Row position where the failure starts (defaults to mid-series)
        #[arg(long)]
        at: Option<usize>,
    },

    /// Score a single reading of the four standard sensors
    Assess {
        /// Temperature in °C
        #[arg(long, default_value = "60.0")]
        temperature: f64,

        /// Vibration in mm/s
        #[arg(long, default_value = "0.5")]
        vibration: f64,

        /// Pressure in bar
        #[arg(long, default_value = "3.0")]
        pressure: f64,

        /// Rotational speed in RPM
        #[arg(long, default_value = "1500.0")]
        speed: f64,

        /// Seed for the synthetic training data and the model
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Compare per-channel means of two series
    Drift {
        /// Reference series (e.g. the training data)
        #[arg(long)]
        reference: PathBuf,

        /// Current series
        #[arg(long)]
        current: PathBuf,
    },

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            train,
            train_rows,
            channels,
            output,
            export,
            scorer,
            threshold,
        } => cmd_run(RunArgs {
            input,
            train,
            train_rows,
            channels,
            output,
            export,
            scorer,
            threshold,
        }),
        Commands::Simulate {
            samples,
            seed,
            scorer,
            threshold,
            failure,
            channel,
            at,
        } => cmd_simulate(samples, seed, scorer, threshold, &failure, channel, at),
        Commands::Assess {
            temperature,
            vibration,
            pressure,
            speed,
            seed,
        } => cmd_assess(
            SensorReading {
                temperature,
                vibration,
                pressure,
                rotational_speed: speed,
            },
            seed,
        ),
        Commands::Drift { reference, current } => cmd_drift(&reference, &current),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Arguments of the `run` command.
struct RunArgs {
    input: PathBuf,
    train: Option<PathBuf>,
    train_rows: Option<usize>,
    channels: Option<String>,
    output: Option<PathBuf>,
    export: bool,
    scorer: Option<String>,
    threshold: Option<f64>,
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let RunArgs {
        input,
        train,
        train_rows,
        channels,
        output,
        export,
        scorer,
        threshold,
    } = args;

    let mut config = load_config(scorer, threshold)?;
    if let Some(channels) = channels {
        config.features.channels = FeatureConfig::channels_from_csv(&channels);
    }
    if export {
        config.ensure_directories()?;
    }
    let input = read_series(&input)?;

    let (training, evaluated) = match (train, train_rows) {
        (Some(path), None) => (read_series(&path)?, input),
        (None, Some(rows)) => (input.head(rows), input.tail_from(rows)),
        (Some(_), Some(_)) => bail!("use either --train or --train-rows, not both"),
        (None, None) => bail!("a training source is required (--train or --train-rows)"),
    };

    println!("Sentinel Sensor Agent v{VERSION}");
    println!();

    let export_dir = config.export_path.clone();
    let mut pipeline = InspectionPipeline::new(config)?;
    pipeline.fit(&training).context("fitting on training data")?;
    println!(
        "Fitted {} on {} rows",
        pipeline.scorer_name(),
        training.len()
    );

    let report = pipeline.run(&evaluated)?;
    print_report(&report);

    if let Some(path) = output {
        report
            .write_to(&path)
            .with_context(|| format!("writing report to {path:?}"))?;
        println!("Wrote report to {path:?}");
    }
    if export {
        let path = report
            .export(&export_dir)
            .with_context(|| format!("exporting report to {export_dir:?}"))?;
        println!("Exported report to {path:?}");
    }

    println!();
    println!("{}", pipeline.audit().summary());
    Ok(())
}

fn cmd_simulate(
    samples: usize,
    seed: u64,
    scorer: Option<String>,
    threshold: Option<f64>,
    failure: &str,
    channel: Option<String>,
    at: Option<usize>,
) -> anyhow::Result<()> {
    let config = load_config(scorer, threshold)?;
    let channels = config.features.channels.clone();

    let training = normal_operation(samples, &channels, seed)?;
    let mut test = normal_operation(samples, &channels, seed.wrapping_add(1))?;

    let failure = match failure.trim().to_lowercase().as_str() {
        "none" => None,
        other => Some(other.parse::<FailureKind>()?),
    };
    if let Some(kind) = failure {
        let channel = channel.unwrap_or_else(|| default_channel(kind).to_string());
        let position = at.unwrap_or(samples / 2);
        test = FailureInjector::default().inject(kind, &test, &channel, position)?;
        println!("Injected {kind} into '{channel}' at row {position}");
    } else {
        println!("No failure injected");
    }

    let mut pipeline = InspectionPipeline::new(config)?;
    pipeline.fit(&training)?;
    let report = pipeline.run(&test)?;

    println!();
    println!("Alert timeline ({} windows):", report.assessments.len());
    let mut previous = false;
    for a in &report.assessments {
        if a.alert != previous {
            let state = if a.alert { "ALERT" } else { "clear" };
            println!("  [{:>6}] {state:<5} risk {:.3}", a.index, a.risk);
            previous = a.alert;
        }
    }
    if report.alert_count == 0 {
        println!("  no alerts");
    }

    println!();
    if let Some(peak) = report.assessments.iter().map(|a| a.risk).reduce(f64::max) {
        println!(
            "Peak risk {peak:.3} against threshold {:.2}",
            report.settings.score_threshold
        );
    }
    print_report(&report);
    Ok(())
}

fn cmd_assess(reading: SensorReading, seed: u64) -> anyhow::Result<()> {
    let config = load_config(None, None)?;
    let mut params = config.detector.forest_params();
    params.seed = seed;

    let mut assessor = SpotAssessor::new(params, &config.decision)?;
    let check = assessor.assess(&reading)?;

    println!("Reading");
    println!("  Temperature:      {:>8.2} °C", reading.temperature);
    println!("  Vibration:        {:>8.2} mm/s", reading.vibration);
    println!("  Pressure:         {:>8.2} bar", reading.pressure);
    println!("  Rotational speed: {:>8.0} RPM", reading.rotational_speed);
    println!();
    println!("Raw anomaly score: {:.3}", check.anomaly_score);
    println!("Risk score:        {:.3}", check.risk);
    println!(
        "Risk level:        {}",
        if check.above_threshold { "HIGH" } else { "LOW" }
    );
    println!();
    if check.alert {
        println!("Recommended action: inspect equipment immediately");
    } else if check.above_threshold {
        println!(
            "Recommended action: none yet ({} consecutive elevated readings needed)",
            config.decision.persistence_windows
        );
    } else {
        println!("Recommended action: none");
    }
    Ok(())
}

fn cmd_drift(reference: &Path, current: &Path) -> anyhow::Result<()> {
    let config = load_config(None, None)?;
    let reference = read_series(reference)?;
    let current = read_series(current)?;
    let monitor = DriftMonitor::new(config.drift.threshold)?;

    println!("Drift (threshold {:.2})", monitor.threshold());
    let mut any = false;
    for channel in reference.channel_names() {
        let Ok(values) = current.channel(channel) else {
            println!("  {channel:<20} missing from current series");
            continue;
        };
        let report = monitor.compare(reference.channel(channel)?, values)?;
        let shift = report
            .relative_shift
            .map_or("undefined".to_string(), |s| format!("{:.1}%", s * 100.0));
        println!(
            "  {channel:<20} {:>10.4} -> {:<10.4} shift {shift:>9} {}",
            report.reference_mean,
            report.current_mean,
            if report.exceeded { "DRIFT" } else { "ok" }
        );
        any |= report.exceeded;
    }

    println!();
    if any {
        println!("Retraining recommended.");
    } else {
        println!("No drift detected.");
    }
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = load_config(None, None)?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Load the config file (defaults if missing or unreadable) and apply the
/// command-line overrides.
fn load_config(scorer: Option<String>, threshold: Option<f64>) -> anyhow::Result<Config> {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Could not load config, using defaults: {e}");
        Config::default()
    });
    if let Some(scorer) = scorer {
        config.detector.kind = scorer.parse::<ScorerKind>()?;
    }
    if let Some(threshold) = threshold {
        config.decision.score_threshold = threshold;
    }
    Ok(config)
}

fn read_series(path: &Path) -> anyhow::Result<TabularSeries> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("parsing series in {path:?}"))
}

fn default_channel(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Overheating => "temperature",
        FailureKind::VibrationSpike => "vibration",
        FailureKind::SensorDrift => "pressure",
    }
}

fn print_report(report: &RunReport) {
    println!("Scored windows: {}", report.assessments.len());
    println!("Alert windows:  {}", report.alert_count);
    for index in report.alert_onsets() {
        println!("  alert raised at index {index}");
    }

    println!("Drift:");
    for d in &report.drift {
        let shift = d
            .report
            .relative_shift
            .map_or("undefined".to_string(), |s| format!("{:.1}%", s * 100.0));
        println!(
            "  {:<20} shift {shift:>9} {}",
            d.channel,
            if d.report.exceeded { "DRIFT" } else { "ok" }
        );
    }
    if report.retrain_recommended {
        println!("Retraining recommended.");
    }
}
