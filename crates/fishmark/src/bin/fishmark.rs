//! fishmark CLI: build head / tail / background crop datasets from fish images.

use clap::{Args, Parser, Subcommand, ValueEnum};
use fishmark::core::EdgePolicy;
use fishmark::stack::{load_frame, load_template, LegacySensorCrop};
use fishmark::taillog::TailLogParser;
use fishmark::template::best_match;
use fishmark::{AnnotationPipeline, PipelineConfig, RunReport};
use log::LevelFilter;
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "fishmark")]
#[command(about = "Extract labeled head / tail / background crops from fish tracking images")]
#[command(version)]
struct Cli {
    /// Log verbosity.
    #[arg(long, value_enum, default_value_t = LogLevelArg::Info, global = true)]
    log_level: LogLevelArg,

    /// Emit JSON log lines (tracing builds only).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every image of a dataset directory.
    Run(CliRunArgs),

    /// Print the eye position found in one image.
    Locate {
        /// Input image.
        #[arg(long)]
        image: PathBuf,

        /// Eye template image.
        #[arg(long)]
        template: PathBuf,
    },

    /// Print the tail landmarks recorded in one annotation log.
    ParseLog {
        /// Annotation log file.
        #[arg(long)]
        log: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CliRunArgs {
    /// Dataset directory holding the input images.
    #[arg(long)]
    root: Option<PathBuf>,

    /// JSON config; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of annotation logs (default: <root>/logs).
    #[arg(long)]
    logs: Option<PathBuf>,

    /// Eye template image (default: <root>/eye_template/eye_template.png).
    #[arg(long)]
    template: Option<PathBuf>,

    /// Parent directory of the label directories (default: <root>).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write annotated overlays as PNGs into this directory.
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Half side length of every crop, in pixels.
    #[arg(long)]
    radius: Option<u32>,

    /// What to do with crops reaching past the frame border.
    #[arg(long, value_enum)]
    edge_policy: Option<EdgePolicyArg>,

    /// Extension of input image files.
    #[arg(long)]
    extension: Option<String>,

    /// Keep the border of 648x488 frames.
    #[arg(long)]
    no_legacy_crop: bool,

    /// Write a JSON run report to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

impl CliRunArgs {
    fn to_config(&self) -> CliResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load_json(path).map_err(|e| -> CliError {
                format!("failed to load config {}: {e}", path.display()).into()
            })?,
            None => PipelineConfig::default(),
        };
        if let Some(root) = &self.root {
            config.root_dir = root.clone();
        }
        if let Some(logs) = &self.logs {
            config.logs_dir = Some(logs.clone());
        }
        if let Some(template) = &self.template {
            config.template_path = Some(template.clone());
        }
        if let Some(output) = &self.output {
            config.output_dir = Some(output.clone());
        }
        if let Some(dir) = &self.overlay_dir {
            config.overlay_dir = Some(dir.clone());
        }
        if let Some(radius) = self.radius {
            config.layout.radius = radius;
        }
        if let Some(policy) = self.edge_policy {
            config.edge_policy = policy.to_core();
        }
        if let Some(ext) = &self.extension {
            config.image_extension = ext.trim_start_matches('.').to_string();
        }
        if self.no_legacy_crop {
            config.legacy_sensor = None;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EdgePolicyArg {
    Clamp,
    Fail,
}

impl EdgePolicyArg {
    fn to_core(self) -> EdgePolicy {
        match self {
            Self::Clamp => EdgePolicy::Clamp,
            Self::Fail => EdgePolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

#[cfg(feature = "tracing")]
fn init_logging(level: LevelFilter, json: bool) -> CliResult<()> {
    fishmark::init_tracing(level, json).map_err(|e| -> CliError { e })
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LevelFilter, json: bool) -> CliResult<()> {
    fishmark::init_logging(level)?;
    if json {
        log::warn!("--json-logs needs a build with the `tracing` feature");
    }
    Ok(())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.to_filter(), cli.json_logs)?;

    match cli.command {
        Commands::Run(args) => run_pipeline(&args),
        Commands::Locate { image, template } => run_locate(&image, &template),
        Commands::ParseLog { log } => run_parse_log(&log),
    }
}

// ── run ───────────────────────────────────────────────────────────────

fn run_pipeline(args: &CliRunArgs) -> CliResult<()> {
    let config = args.to_config()?;
    let pipeline = AnnotationPipeline::new(config)?;
    let run = pipeline.run()?;

    if let Some(path) = &args.report {
        RunReport::from_run(pipeline.config(), &run).write_json(path)?;
        log::info!("wrote run report to {}", path.display());
    }

    println!(
        "processed {} of {} frames ({} skipped)",
        run.summary.processed, run.summary.total, run.summary.skipped
    );
    Ok(())
}

// ── locate ────────────────────────────────────────────────────────────

fn run_locate(image: &Path, template: &Path) -> CliResult<()> {
    let template = load_template(template)?;
    let mut frame = load_frame(image)?;
    let legacy = LegacySensorCrop::default();
    if legacy.applies_to(&frame) {
        frame = legacy.apply(&frame)?;
    }

    let found = best_match(&frame.view(), &template)?;
    log::info!("match score {:.4}", found.score);
    println!("{} {}", found.position.x, found.position.y);
    Ok(())
}

// ── parse-log ─────────────────────────────────────────────────────────

fn run_parse_log(log: &Path) -> CliResult<()> {
    let tail = TailLogParser::new()?.parse_file(log)?;
    println!("tailbase {} {}", tail.tail_base.x, tail.tail_base.y);
    println!("tailtip {} {}", tail.tail_tip.x, tail.tail_tip.y);
    Ok(())
}
