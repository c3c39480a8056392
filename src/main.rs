use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use alogview_adb::Adb;
use alogview_logs::{
    FilterChain, LifecycleGrammar, LineSource, PackageFilter, ProcessCensus, stage_channel,
};

mod config;
mod render;

use config::{Environment, FileConfig, Settings};
use render::Renderer;

/// alogview - colourised Android logcat, narrowed to packages and tags
#[derive(Parser, Debug)]
#[command(name = "alogview")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Use the USB device (error if multiple devices are connected)
    #[arg(short = 'd', conflicts_with_all = ["tcp", "serial"])]
    usb: bool,

    /// Use the TCP/IP device (error if multiple TCP/IP devices are available)
    #[arg(short = 'e', conflicts_with = "serial")]
    tcp: bool,

    /// Use the device with the given serial (overrides $ANDROID_SERIAL)
    #[arg(short = 's', value_name = "SERIAL")]
    serial: Option<String>,

    /// Only show lines with this tag (repeatable)
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Tag of the process lifecycle announcements
    #[arg(long, value_name = "TAG")]
    supervisor_tag: Option<String>,

    /// Do not colourise output (also set by $NO_COLOR)
    #[arg(long)]
    no_color: bool,

    /// Config file (default: <config dir>/alogview/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Only show lines from these packages
    #[arg(value_name = "PACKAGE")]
    packages: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Diagnostics go to stderr so they never mix with the log output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run_app(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app(args: Args) -> Result<()> {
    let file = FileConfig::load(args.config.as_deref())?;
    let settings = Settings::resolve(&args, &Environment::capture(), file)?;
    let adb = Adb::new(settings.adb.clone(), settings.selector.clone());

    let mut chain = FilterChain::new().tags(settings.tags);
    if !settings.packages.is_empty() {
        let rows = adb
            .list_processes()
            .await
            .context("Failed to list running processes")?;
        let pids = ProcessCensus::new().count(&rows, &settings.packages);
        let grammar = LifecycleGrammar::new(settings.supervisor_tag);
        chain = chain.packages(PackageFilter::new(grammar, settings.packages, pids));
    }
    let pipeline = chain.build();
    if pipeline.is_empty() {
        tracing::debug!("no filters requested, showing every line");
    }

    let mut logcat = adb.logcat()?;
    let stdout = logcat.stdout().context("logcat output is not available")?;

    let (tx, rx) = stage_channel();
    let (filtered, stages) = pipeline.spawn(rx);
    let renderer = Renderer::new(std::io::stdout(), settings.color);
    let sink = tokio::task::spawn_blocking(move || render::drain(filtered, renderer));

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let source = LineSource::default();
    let outcome = tokio::select! {
        result = source.pump(stdout, tx) => Some(result.context("Failed to read logcat output")?),
        _ = cancel.cancelled() => {
            tracing::info!("interrupted, shutting down");
            None
        }
    };

    join_stages(stages).await?;
    let rendered = sink.await.context("Renderer task failed")??;
    tracing::debug!("rendered {} lines", rendered);

    match outcome {
        Some(stats) if !stats.downstream_closed => {
            tracing::debug!(
                "logcat closed: {} forwarded, {} malformed, {} markers",
                stats.forwarded,
                stats.malformed,
                stats.markers
            );
            logcat.wait().await
        }
        // Nobody is reading any more; dropping the handle kills adb
        _ => Ok(()),
    }
}

/// Cancel `token` on Ctrl-C
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

/// Wait for every filter stage; a panicking stage takes the program down
async fn join_stages(stages: Vec<JoinHandle<()>>) -> Result<()> {
    for stage in stages {
        match stage.await {
            Ok(()) => {}
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => return Err(e).context("Pipeline stage failed"),
        }
    }
    Ok(())
}
