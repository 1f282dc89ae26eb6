//! usb-printer-capture
//!
//! Emulates a USB printer through the Linux printer gadget, answers the
//! host's status handshakes and saves every print job it receives to the
//! capture directory.

mod config;
mod console;
mod device;
mod jobs;
mod service;

use anyhow::{Context, Result};
use capture::{CaptureEngine, JobStore};
use clap::Parser;
use common::{CaptureSummary, create_capture_bridge, setup_logging};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "usb-printer-capture")]
#[command(
    author,
    version,
    about = "USB printer emulator - capture print jobs sent by a host"
)]
#[command(long_about = "
Presents itself to a USB host as a printer (via the Linux printer gadget),
acknowledges the host's status queries and writes each received document to
the capture directory, named job_<n>_<YYYYMMDD_HHMMSS><ext>.

EXAMPLES:
    # Capture with default config (requires root)
    usb-printer-capture

    # Capture from a specific gadget node into a custom directory
    usb-printer-capture --device /dev/g_printer1 --capture-dir ~/jobs

    # List captured jobs and their available conversions
    usb-printer-capture --list-jobs

    # Identify the format of a file
    usb-printer-capture --sniff job_3_20240101_120000.bin

CONFIGURATION:
    The configuration file is looked up in the following order:
    1. Path specified with --config
    2. ~/.config/usb-printer-capture/capture.toml
    3. /etc/usb-printer-capture/capture.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Printer gadget device (overrides config)
    #[arg(short, long, value_name = "PATH")]
    device: Option<PathBuf>,

    /// Directory for captured jobs (overrides config)
    #[arg(long, value_name = "DIR")]
    capture_dir: Option<String>,

    /// Run as systemd service
    #[arg(long)]
    service: bool,

    /// List captured jobs and exit
    #[arg(long)]
    list_jobs: bool,

    /// Print the detected format of a file and exit
    #[arg(long, value_name = "FILE")]
    sniff: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = config::ServerConfig::default();
        let path = config::ServerConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let mut config = if let Some(ref path) = args.config {
        config::ServerConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        config::ServerConfig::load_or_default()
    };

    if let Some(device) = args.device {
        config.capture.device = device;
    }
    if let Some(dir) = args.capture_dir {
        config.capture.capture_dir = dir;
    }
    if let Some(level) = args.log_level {
        config.server.log_level = level;
    }
    config.validate().context("Invalid configuration")?;

    setup_logging(&config.server.log_level).context("Failed to setup logging")?;

    info!("usb-printer-capture v{}", env!("CARGO_PKG_VERSION"));

    if let Some(path) = args.sniff {
        return jobs::sniff_mode(&path);
    }

    if args.list_jobs {
        return jobs::list_jobs_mode(&config.capture_dir());
    }

    let service_mode = args.service || config.server.service_mode;
    let summary = run_capture(config, service_mode).await?;

    println!(
        "Printer capture stopped: {} job(s), {} bytes, {} handshake(s) answered",
        summary.jobs_captured, summary.bytes_captured, summary.control_frames
    );
    Ok(())
}

/// Open the gadget and capture until a signal arrives or the device fails
async fn run_capture(config: config::ServerConfig, service_mode: bool) -> Result<CaptureSummary> {
    let device_path = config.capture.device.clone();
    let capture_dir = config.capture_dir();

    device::check_preconditions(&device_path, config.server.require_root)
        .context("Printer gadget unavailable")?;

    let store = JobStore::open(&capture_dir)
        .context("Failed to prepare capture directory")?
        .with_metadata(config.capture.write_metadata);

    let device = device::open_printer(&device_path).context("Failed to open printer gadget")?;

    println!("USB printer capture started");
    println!("Device: {}", device_path.display());
    println!("Saving to: {}", capture_dir.display());
    println!("Press Ctrl+C to stop\n");

    let (bridge, worker) = create_capture_bridge();
    let engine = CaptureEngine::new(device, store, config.engine_settings(), worker);

    // The engine sleeps between polls; keep it off the async workers
    let mut capture = tokio::task::spawn_blocking(move || engine.run());
    let console = tokio::spawn(console::run(bridge.clone()));

    // Notification failures must not orphan the running capture thread
    let watchdog = if service_mode {
        if let Err(e) = service::notify_ready() {
            error!("Failed to notify systemd ready: {:#}", e);
        }
        if let Err(e) = service::notify_status(&format!("Capturing from {}", device_path.display())) {
            error!("Failed to send status to systemd: {:#}", e);
        }
        service::spawn_watchdog_task()
    } else {
        None
    };

    let result = tokio::select! {
        result = &mut capture => result,
        () = shutdown_signal() => {
            info!("Shutting down...");
            if let Err(e) = bridge.request_shutdown().await {
                warn!("Capture loop already gone: {}", e);
            }
            capture.await
        }
    };

    if service_mode {
        if let Err(e) = service::notify_stopping() {
            error!("Failed to notify systemd stopping: {:#}", e);
        }
    }
    if let Some(handle) = watchdog {
        handle.abort();
    }

    // Console exits once the engine has dropped its end of the bridge
    drop(bridge);
    if let Err(e) = console.await {
        error!("Console task failed: {}", e);
    }

    result
        .context("Capture thread panicked")?
        .context("Capture loop failed")
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Error waiting for Ctrl+C: {}", e);
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
