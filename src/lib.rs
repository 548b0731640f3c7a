pub mod cleanup;
pub mod config;
pub mod controller;
pub mod discover;
pub mod document;
pub mod fixes;
pub mod model;
pub mod output;
pub mod ports;
pub mod report;

#[cfg(test)]
mod testing;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use config::EffectiveConfig;
use controller::{CancelFlag, CleanupController};
use document::FsDocumentStore;
use model::OutputFormat;
use output::ColorPolicy;
use ports::Host;
use report::ReportAnalyzer;
use tracing::{info, warn};

#[derive(Debug, clap::Parser)]
#[command(
    name = "cleanup-buddy",
    version,
    about = "Apply analyzer quick fixes for unused code across a JS/TS project",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Settings file (defaults to ./cleanup-buddy.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON analysis report providing diagnostics and code actions.
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,

    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    #[arg(long, value_enum, global = true)]
    pub color: Option<ColorPolicy>,

    /// Skip removal of unused variables (TS6133).
    #[arg(long, global = true, default_value_t = false)]
    pub no_unused_variables: bool,

    /// Skip removal of unused functions (TS6192, TS6196).
    #[arg(long, global = true, default_value_t = false)]
    pub no_unused_functions: bool,

    /// Skip removal of unused React props.
    #[arg(long, global = true, default_value_t = false)]
    pub no_unused_props: bool,

    /// Pause between files, in milliseconds.
    #[arg(long, global = true)]
    pub yield_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Clean project code: organize imports and remove unused code in every file.
    Clean {
        /// Project roots (defaults to the current directory).
        roots: Vec<PathBuf>,
    },
    /// List the files a clean run would visit.
    Files {
        roots: Vec<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = EffectiveConfig::load(&cli)?;

    match &cli.command {
        Command::Clean { roots } => run_clean(resolve_roots(roots), &cfg),
        Command::Files { roots } => run_files(resolve_roots(roots), &cfg),
    }
}

/// Canonical roots; ones that do not exist are dropped with a warning.
fn resolve_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
    let requested = if roots.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        roots.to_vec()
    };
    requested
        .into_iter()
        .filter_map(|root| match root.canonicalize() {
            Ok(path) if path.is_dir() => Some(path),
            Ok(_) => {
                warn!(root = %root.display(), "project root is not a directory");
                None
            }
            Err(err) => {
                warn!(root = %root.display(), error = %err, "skipping project root");
                None
            }
        })
        .collect()
}

fn run_files(roots: Vec<PathBuf>, cfg: &EffectiveConfig) -> Result<()> {
    let Some(base) = roots.first() else {
        warn!("no project root to list");
        return Ok(());
    };
    let files = discover::discover(&roots);
    output::print_files(&mut io::stdout().lock(), &files, base, cfg)
}

fn run_clean(roots: Vec<PathBuf>, cfg: &EffectiveConfig) -> Result<()> {
    let report = cfg
        .report
        .as_ref()
        .context("no analysis report configured; pass --report or set `report` in cleanup-buddy.toml")?;

    let documents = Arc::new(FsDocumentStore::new());
    let analyzer = ReportAnalyzer::load(report, documents.clone())?;
    let host = Host::from_parts(Arc::new(analyzer), documents);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async {
        let cancel = CancelFlag::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, cancelling after the current file");
                on_interrupt.cancel();
            }
        });

        let mut controller = CleanupController::new(host, cfg.cleanup, cancel).with_yield_delay(cfg.yield_delay);
        let mut sink = output::sink_for(cfg);
        controller.run(&roots, sink.as_mut()).await;
    });
    Ok(())
}
