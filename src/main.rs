use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use autoseq::config::{self as cfg, RunnerSettings};
use autoseq::executor::{
    BatchItemResult, BatchPolicy, ExecutionContext, ProgramSource, RunResult, RunStatus, Session,
};
use autoseq::probe::DesktopProbe;

/// Autoseq CLI
#[derive(Debug, Parser)]
#[command(
    name = autoseq::PKG_NAME,
    version = autoseq::PKG_VERSION,
    about = "Run recorded screen-object sequences against the desktop"
)]
struct Args {
    /// Sequence files (JSON). Several files run as a batch.
    #[arg(required_unless_present = "print_schema")]
    sequences: Vec<PathBuf>,

    /// Override the sequence's loop count (0 = until aborted). Single sequence only.
    #[arg(long)]
    loops: Option<u32>,

    /// Batch cycles over all sequences
    #[arg(long, default_value_t = 1, conflicts_with = "forever")]
    cycles: u32,

    /// Repeat the batch until aborted
    #[arg(long)]
    forever: bool,

    /// Log input actions instead of simulating them
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Disable the screen-corner safety abort
    #[arg(long = "no-failsafe")]
    no_failsafe: bool,

    /// Poll interval for wait actions (ms)
    #[arg(long = "poll-ms")]
    poll_ms: Option<u64>,

    /// Pause before the first step (ms)
    #[arg(long = "start-delay-ms", default_value_t = 500)]
    start_delay_ms: u64,

    /// Runner settings file (JSON); flags override its values
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the run result(s) with the full trace to this file (JSON)
    #[arg(long = "trace-out")]
    trace_out: Option<PathBuf>,

    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Print the JSON Schema for sequence documents and exit
    #[arg(long = "print-schema")]
    print_schema: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Report {
    Single(RunResult),
    Batch(Vec<BatchItemResult>),
}

impl Report {
    fn status(&self) -> RunStatus {
        match self {
            Report::Single(r) => r.status,
            Report::Batch(items) => {
                let statuses = || items.iter().map(|i| i.result.status);
                if statuses().any(|s| s == RunStatus::Aborted) {
                    RunStatus::Aborted
                } else if statuses().any(|s| s == RunStatus::Faulted) {
                    RunStatus::Faulted
                } else {
                    RunStatus::Completed
                }
            }
        }
    }
}

fn load_settings(args: &Args) -> Result<RunnerSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open settings file {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("Failed to parse settings file {}", path.display()))?
        }
        None => RunnerSettings::default(),
    };
    if let Some(ms) = args.poll_ms {
        settings.poll_interval_ms = ms;
    }
    settings.start_delay_ms = args.start_delay_ms;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    autoseq::init_tracing(args.log_level.as_deref());

    if args.print_schema {
        let schema = cfg::generate_schema();
        let json = serde_json::to_string_pretty(&schema)?;
        println!("{json}");
        return Ok(());
    }

    info!(
        version = autoseq::PKG_VERSION,
        sequences = args.sequences.len(),
        dry_run = args.dry_run,
        "Starting Autoseq"
    );

    let settings = load_settings(&args)?;
    let cancel = CancellationToken::new();
    let (dry_run, failsafe) = (args.dry_run, !args.no_failsafe);
    let batch = args.sequences.len() > 1 || args.forever || args.cycles != 1;

    let mut handle = if batch {
        if args.loops.is_some() {
            warn!("--loops applies to a single sequence run; ignored for batches");
        }
        let sources: Vec<ProgramSource> = args
            .sequences
            .iter()
            .cloned()
            .map(ProgramSource::File)
            .collect();
        let policy = if args.forever {
            BatchPolicy::forever()
        } else {
            BatchPolicy::cycles(args.cycles)
        };
        let token = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let probe = DesktopProbe::new(dry_run, failsafe);
            let mut session = Session::new(probe, settings, token);
            Report::Batch(session.run_many(&sources, policy))
        })
    } else {
        let Some(path) = args.sequences.first() else {
            bail!("no sequence file given");
        };
        let doc = cfg::load_from_path_async(path).await?;
        let root = cfg::loader::project_root(path).to_path_buf();
        let mut ctx = ExecutionContext::from_document(doc, Some(root));
        if let Some(loops) = args.loops {
            ctx = ctx.with_loop_count(loops);
        }
        debug!(sequence = %ctx.source.name, steps = ctx.program.len(), "Sequence loaded");
        let token = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let probe = DesktopProbe::new(dry_run, failsafe);
            let mut session = Session::new(probe, settings, token).with_context(ctx);
            Report::Single(session.run())
        })
    };

    // Run until done, or cancel on Ctrl+C and wait for the runner to stop.
    let report = tokio::select! {
        joined = &mut handle => joined?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, aborting run");
            cancel.cancel();
            handle.await?
        }
    };

    if let Some(path) = &args.trace_out {
        let file = File::create(path)
            .with_context(|| format!("Failed to create trace file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .with_context(|| format!("Failed to write trace file {}", path.display()))?;
        info!(path = %path.display(), "Trace written");
    }

    let status = report.status();
    info!(?status, "Autoseq exited");
    if status == RunStatus::Faulted {
        bail!("sequence run faulted");
    }
    Ok(())
}
