mod batch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use office_interop::{BatchProvider, JobOptions, OfficeApp};
use tracing_appender_localtime::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Opens each file in Word or PowerPoint, reports what it contains, and
/// optionally strips shapes and saves.
#[derive(Debug, Parser)]
#[command(name = "office-batch", version, about)]
struct Args {
    /// Office application that opens the files.
    #[arg(long, value_enum, default_value_t = HostApp::Word)]
    app: HostApp,

    /// Number of Office instances, each on its own apartment thread.
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Delete every shape in each file.
    #[arg(long)]
    strip_shapes: bool,

    /// Save each file before closing it.
    #[arg(long)]
    save: bool,

    /// Show the Office window while working.
    #[arg(long)]
    visible: bool,

    /// Directory for the rolling log file.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Files to process.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HostApp {
    Word,
    Powerpoint,
}

impl From<HostApp> for OfficeApp {
    fn from(app: HostApp) -> Self {
        match app {
            HostApp::Word => Self::Word,
            HostApp::Powerpoint => Self::PowerPoint,
        }
    }
}

impl Args {
    fn options(&self) -> JobOptions {
        JobOptions {
            strip_shapes: self.strip_shapes,
            save: self.save,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_guard = init_logging(&args.log_dir);

    let options = args.options();
    tracing::info!(
        app = ?args.app,
        workers = args.workers,
        visible = args.visible,
        ?options,
        files = args.files.len(),
        "Starting office-batch"
    );

    let provider = build_provider(&args, options).await?;
    let summary = batch::run_batch(Arc::clone(&provider), args.files, args.workers).await;
    println!("{summary}");

    // The last provider handle joins the worker threads, which quit Office.
    tokio::task::spawn_blocking(move || drop(provider)).await?;

    if !summary.is_success() {
        tracing::error!(failed = summary.failures.len(), "batch finished with failures");
        drop(log_guard);
        std::process::exit(1);
    }
    tracing::info!("batch finished");
    Ok(())
}

/// Daily rolling log file under `dir`, written from a background thread.
fn file_writer(dir: &Path) -> (NonBlocking, WorkerGuard) {
    let file_appender = tracing_appender_localtime::rolling::daily(dir, "office-batch.log");
    tracing_appender_localtime::non_blocking(file_appender)
}

/// File logging, plus warnings and errors on stderr.
fn init_logging(dir: &Path) -> WorkerGuard {
    let (non_blocking, guard) = file_writer(dir);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false).with_filter(filter))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(tracing_subscriber::filter::LevelFilter::WARN),
        )
        .init();
    guard
}

#[cfg(windows)]
async fn build_provider(args: &Args, options: JobOptions) -> Result<Arc<dyn BatchProvider>> {
    use office_interop::WorkerPool;
    use office_interop::com::ComFactory;

    let factory = ComFactory::new(args.app.into(), args.visible);
    let workers = args.workers;
    let pool = tokio::task::spawn_blocking(move || WorkerPool::start(&factory, workers, options)).await??;
    Ok(Arc::new(pool))
}

#[cfg(not(windows))]
async fn build_provider(args: &Args, _options: JobOptions) -> Result<Arc<dyn BatchProvider>> {
    anyhow::bail!(
        "{} automation needs Windows with Office installed",
        OfficeApp::from(args.app)
    )
}
