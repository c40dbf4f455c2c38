//! layerpeel: run layer extraction from the command line.
//!
//! Two subcommands:
//!
//! - `diff` runs a single diff extraction between two image files and
//!   reports the sprite rectangle and mask statistics. Useful for tuning
//!   detection parameters against real silhouettes or edits.
//! - `replay` runs the full peel loop against recorded collaborator
//!   responses (see [`replay`]) and writes the layered design JSON,
//!   optionally with per-iteration debug snapshots.
//!
//! # Usage
//!
//! ```text
//! layerpeel diff before.png silhouette.png --output sprite.png
//! layerpeel -v replay recording/manifest.json --output design.json --snapshot-dir debug/
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod replay;
mod snapshot;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use layerpeel_core::{EventSink, Orchestrator, PeelConfig, TerminationPolicy};
use layerpeel_pipeline::{DetectionStrategy, Extraction};
use tracing_subscriber::EnvFilter;

/// Peel a flattened raster design into individually editable layers.
#[derive(Parser)]
#[command(name = "layerpeel", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the element that differs between two images.
    Diff(DiffArgs),
    /// Run the peel loop against a recorded manifest.
    Replay(ReplayArgs),
}

#[derive(Args)]
struct DiffArgs {
    /// The image the element is carved from.
    before: PathBuf,

    /// A silhouette (threshold strategy) or the image with the element
    /// removed (similarity strategy).
    after: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Write the extracted sprite as PNG.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the result as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReplayArgs {
    /// Recording manifest (JSON).
    manifest: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Write the design JSON here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write per-iteration debug snapshots under this directory.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ConfigArgs {
    /// Load a `PeelConfig` from a JSON file.
    #[arg(long, conflicts_with = "config_json")]
    config: Option<PathBuf>,

    /// Full `PeelConfig` as a JSON string. Missing fields take defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Override the detection strategy (default parameters for that
    /// strategy unless the loaded config already uses it).
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Override the termination policy.
    #[arg(long, value_enum)]
    termination: Option<Termination>,
}

/// Detection strategy selection.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Darkness threshold over a silhouette image.
    Threshold,
    /// SSIM difference against an edited image.
    Similarity,
}

/// Termination policy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Termination {
    /// Stop when one element remains.
    SingleRemaining,
    /// Stop at the first background element.
    BackgroundReached,
}

/// Build a [`PeelConfig`] from the config source, then apply flag
/// overrides.
fn config_from_args(args: &ConfigArgs) -> Result<PeelConfig, String> {
    let mut config: PeelConfig = if let Some(ref json) = args.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else if let Some(ref path) = args.config {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        serde_json::from_str(&text).map_err(|e| format!("Error parsing {}: {e}", path.display()))?
    } else {
        PeelConfig::default()
    };

    if let Some(strategy) = args.strategy {
        let current = if config.diff.strategy.uses_silhouette() {
            Strategy::Threshold
        } else {
            Strategy::Similarity
        };
        if strategy != current {
            config.diff.strategy = match strategy {
                Strategy::Threshold => DetectionStrategy::threshold(),
                Strategy::Similarity => DetectionStrategy::similarity(),
            };
        }
    }
    if let Some(termination) = args.termination {
        config.termination = match termination {
            Termination::SingleRemaining => TerminationPolicy::SingleRemaining,
            Termination::BackgroundReached => TerminationPolicy::BackgroundReached,
        };
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Diff(args) => run_diff(&args),
        Command::Replay(args) => run_replay(&args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run_diff(args: &DiffArgs) -> Result<(), String> {
    let config = config_from_args(&args.config)?;
    let before = replay::read_image(&args.before)?;
    let after = replay::read_image(&args.after)?;

    eprintln!(
        "Before: {} ({}x{})",
        args.before.display(),
        before.width(),
        before.height()
    );
    eprintln!(
        "After:  {} ({}x{})",
        args.after.display(),
        after.width(),
        after.height()
    );
    eprintln!("Strategy: {}", config.diff.strategy.name());
    eprintln!();

    let start = Instant::now();
    let extraction = layerpeel_pipeline::extract(&before, &after, &config.diff)
        .map_err(|e| format!("Pipeline error: {e}"))?;
    let elapsed = start.elapsed();

    if args.json {
        let record = layerpeel_export::sprite_record(&extraction.sprite)
            .map_err(|e| format!("Error encoding sprite: {e}"))?;
        let report = serde_json::json!({
            "sprite": record,
            "raw_pixels": extraction.raw_pixel_count,
            "cleaned_pixels": extraction.mask.count(),
            "resampled": extraction.resampled,
            "cleaning": extraction.cleaning,
            "duration_ms": elapsed.as_secs_f64() * 1000.0,
        });
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Error serializing report: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", diff_report(&extraction));
        println!("Duration: {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    }

    if let Some(ref path) = args.output {
        let png = layerpeel_pipeline::decode::encode_png(&extraction.sprite.pixels)
            .map_err(|e| format!("Error encoding sprite: {e}"))?;
        std::fs::write(path, &png)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        eprintln!("Sprite written to {} ({} bytes)", path.display(), png.len());
    }
    Ok(())
}

/// Human-readable summary of one extraction.
fn diff_report(extraction: &Extraction) -> String {
    let sprite = &extraction.sprite;
    let cleaning = &extraction.cleaning;
    let mut lines = vec![
        format!(
            "Sprite:      x={} y={} {}x{}{}",
            sprite.x,
            sprite.y,
            sprite.width(),
            sprite.height(),
            if sprite.is_blank() { " (blank)" } else { "" }
        ),
        format!("Raw mask:    {} px", extraction.raw_pixel_count),
        format!("Clean mask:  {} px", extraction.mask.count()),
        format!(
            "Regions:     {} found, {} kept (floor {} px)",
            cleaning.regions_found, cleaning.regions_kept, cleaning.floor_used
        ),
    ];
    if cleaning.fell_back {
        lines.push("Note:        every region was below the floor; raw mask used".to_owned());
    }
    if extraction.resampled {
        lines.push("Note:        comparison image was resampled".to_owned());
    }
    lines.join("\n")
}

async fn run_replay(args: &ReplayArgs) -> Result<(), String> {
    let config = config_from_args(&args.config)?;
    let (recording, image) = replay::Replay::load(&args.manifest)?;
    let (width, height) = image.dimensions();
    let input_name = recording
        .image_path()
        .file_name()
        .map_or_else(|| "input".to_owned(), |n| n.to_string_lossy().into_owned());
    let recording = Arc::new(recording);

    let mut orchestrator = Orchestrator::new(recording.clone(), recording, config);
    if let Some(ref dir) = args.snapshot_dir {
        let sink: Arc<dyn EventSink> = Arc::new(snapshot::SnapshotSink::create(dir, &input_name)?);
        orchestrator = orchestrator.with_sink(sink);
    }

    let start = Instant::now();
    let layers = orchestrator
        .run(image)
        .await
        .map_err(|e| format!("Peel error: {e}"))?;
    eprintln!(
        "Extracted {} layer(s) in {:.3}s",
        layers.len(),
        start.elapsed().as_secs_f64()
    );

    let json = layerpeel_export::to_design_json(width, height, &layers)
        .map_err(|e| format!("Export error: {e}"))?;
    match args.output {
        Some(ref path) => {
            std::fs::write(path, &json)
                .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
            eprintln!("Design written to {} ({} bytes)", path.display(), json.len());
        }
        None => println!("{json}"),
    }
    Ok(())
}
