use clap::{Parser, Subcommand};
use recompress::config::{self, Config};
use recompress::imaging::{RustCodec, register_codecs};
use recompress::pipeline::{PipelineController, PipelineEvent, RunStatus};
use recompress::types::{Format, PipelineConfig, SourceDisposition, Tier};
use recompress::{output, scan};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Flags that decide what happens to each source and its output.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Target format: jpeg or webp
    #[arg(long, short, default_value = "webp")]
    format: Format,

    /// Compression tier: fast (smallest), medium, slow (best quality)
    #[arg(long, short, default_value = "medium")]
    tier: Tier,

    /// Write outputs here instead of next to each source
    #[arg(long, short)]
    dest: Option<PathBuf>,

    /// Delete each source once its compressed copy is written
    #[arg(long, conflicts_with = "move_sources_to")]
    delete_source: bool,

    /// Move each source into this directory once its compressed copy is written
    #[arg(long, value_name = "DIR")]
    move_sources_to: Option<PathBuf>,
}

impl RunArgs {
    fn pipeline_config(&self) -> PipelineConfig {
        let disposition = match (&self.move_sources_to, self.delete_source) {
            (Some(dir), _) => SourceDisposition::MoveTo(dir.clone()),
            (None, true) => SourceDisposition::Delete,
            (None, false) => SourceDisposition::Keep,
        };
        let run = PipelineConfig::new(self.format, self.tier).with_disposition(disposition);
        match &self.dest {
            Some(dir) => run.with_destination(dir),
            None => run,
        }
    }
}

#[derive(Parser)]
#[command(name = "recompress")]
#[command(about = "Batch-recompress images to JPEG or WebP")]
#[command(long_about = "\
Batch-recompress images to JPEG or WebP

Each input image is re-encoded at the quality mapped from the chosen tier
and written as <name>_compressed.<ext>, next to the source or into --dest.
WebP output is downscaled so neither side exceeds webp.max_dimension.
Directories are scanned recursively; earlier *_compressed.* outputs are
skipped.

Tier quality factors (defaults, override in recompress.toml):

           fast   medium   slow
  jpeg     0.40   0.60     0.80
  webp     0.30   0.70     0.95

Set RUST_LOG=recompress=debug for per-image logging on stderr.

Run 'recompress gen-config' to generate a documented recompress.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file (optional; stock defaults when absent)
    #[arg(long, default_value = "recompress.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recompress images
    Compress {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        run: RunArgs,

        /// Upper bound on parallel encodes (clamped to half the logical CPUs)
        #[arg(long)]
        max_workers: Option<usize>,

        /// Print the run summary as JSON instead of progress lines
        #[arg(long)]
        json: bool,
    },
    /// List the images a compress run would process
    Scan {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Decode every image and report the ones a run would fail to open
        #[arg(long)]
        verify: bool,
    },
    /// Print a stock recompress.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();
    register_codecs();

    match cli.command {
        Command::Compress {
            inputs,
            run,
            max_workers,
            json,
        } => {
            let mut config = config::load_config(&cli.config)?;
            if max_workers.is_some() {
                config.processing.max_workers = max_workers;
            }
            compress(&inputs, run.pipeline_config(), config, json)?;
        }
        Command::Scan { inputs, verify } => {
            let mut entries = scan::scan_inputs(&inputs)?;
            let failures = if verify {
                scan::verify_entries(&mut entries)
            } else {
                Vec::new()
            };
            output::print_scan_output(&entries, display_root(&inputs));
            for err in &failures {
                output::print_pipeline_event(&PipelineEvent::ItemFailed(err.clone()));
            }
            if !failures.is_empty() {
                let total = entries.len();
                return Err(format!("{} of {total} images could not be decoded", failures.len()).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn compress(
    inputs: &[PathBuf],
    run: PipelineConfig,
    config: Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = scan::scan_inputs(inputs)?;
    if entries.is_empty() {
        println!("No images found");
        return Ok(());
    }

    let controller = PipelineController::new(Arc::new(RustCodec::new()), config);
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            if !json {
                output::print_pipeline_event(&event);
            }
        }
    });
    controller.start(entries, run, Some(tx))?;
    let summary = controller.wait()?;
    printer.join().map_err(|_| "output thread panicked")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    if summary.failed > 0 && summary.status == RunStatus::Completed {
        return Err(format!("{} of {} images failed", summary.failed, summary.progress.total).into());
    }
    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default filter.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("recompress=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Scan output shows paths relative to a lone directory input.
fn display_root(inputs: &[PathBuf]) -> &Path {
    match inputs {
        [single] if single.is_dir() => single,
        _ => Path::new(""),
    }
}
