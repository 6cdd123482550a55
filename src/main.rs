//! tacholog — tachogenerator acquisition and logging.
//!
//! Samples a tacho voltage channel at a fixed cadence, logs every sample to
//! CSV as it is taken, renders a live voltage/speed chart, snapshots the
//! chart once a minute, and on Ctrl+C / SIGTERM drains cleanly: the full run
//! log goes to an XLSX workbook and a final snapshot is captured.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (synthetic spindle, data/ and images/ in cwd)
//! cargo run --release
//!
//! # Faster sampling, fixed-length capture, no chart rendering
//! cargo run --release -- --period-ms 100 --samples 600 --headless
//! ```
//!
//! # Environment Variables
//!
//! - `TACHOLOG_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tacholog::acquisition::{AcquisitionRig, RigConfig, SyntheticDevice, SyntheticProfile};
use tacholog::config::defaults::{CHART_HEIGHT, CHART_WIDTH, DISPLAY_REFRESH_PERIOD_MS};
use tacholog::config::AppConfig;
use tacholog::display::{spawn_refresh_task, ChartDisplay, NullDisplay, SharedDisplay};
use tacholog::storage::ensure_output_dirs;
use tacholog::{Converter, PersistenceSink, ShutdownCoordinator, SnapshotScheduler};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "tacholog")]
#[command(about = "Tachogenerator acquisition and logging system")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (default: $TACHOLOG_CONFIG, then ./tacholog.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the data output directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the snapshot output directory
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Override the sampling period (milliseconds)
    #[arg(long)]
    period_ms: Option<u64>,

    /// Override the display window capacity (samples)
    #[arg(long)]
    window: Option<usize>,

    /// Override the ADC input channel
    #[arg(long)]
    channel: Option<u8>,

    /// Stop after capturing this many samples (default: run until signalled)
    #[arg(long)]
    samples: Option<u64>,

    /// Run without a chart renderer; snapshot requests become no-ops
    #[arg(long)]
    headless: bool,

    /// Refresh the display from a dedicated ~1 Hz task instead of redrawing
    /// every iteration
    #[arg(long)]
    split_display: bool,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    // Load configuration, then overlay CLI overrides
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load(),
    };
    if let Some(dir) = args.data_dir {
        config.output.data_dir = dir;
    }
    if let Some(dir) = args.images_dir {
        config.output.images_dir = dir;
    }
    if let Some(period_ms) = args.period_ms {
        config.sampling.period_ms = period_ms;
    }
    if let Some(window) = args.window {
        config.sampling.window_capacity = window;
    }
    if let Some(channel) = args.channel {
        config.adc.channel = channel;
    }
    config.validate().context("Invalid configuration")?;

    info!("tacholog — tachogenerator acquisition and logging");
    info!(
        channel = config.adc.channel,
        gain = ?config.adc.gain,
        period_ms = config.sampling.period_ms,
        window = config.sampling.window_capacity,
        "Acquisition configuration"
    );

    // Output directories are a startup requirement: acquisition must not
    // proceed without somewhere durable to put the data.
    ensure_output_dirs(&config.output.data_dir, &config.output.images_dir)
        .context("Failed to establish output directories")?;
    info!(
        data = %config.output.data_dir.display(),
        images = %config.output.images_dir.display(),
        "Output directories ready"
    );

    let sink = PersistenceSink::open(&config.output.data_dir, &config.output.base_name)
        .context("Failed to open the CSV row store")?;
    let scheduler = SnapshotScheduler::new(
        config.output.images_dir.clone(),
        Duration::from_secs(config.output.snapshot_interval_secs),
    );
    let converter = Converter::new(config.adc.gain, &config.conversion);
    let device = SyntheticDevice::new(SyntheticProfile::default());

    // Graceful shutdown via SIGINT/SIGTERM
    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers();

    let display: SharedDisplay = if args.headless {
        std::sync::Arc::new(std::sync::Mutex::new(NullDisplay))
    } else {
        std::sync::Arc::new(std::sync::Mutex::new(ChartDisplay::new(
            CHART_WIDTH,
            CHART_HEIGHT,
        )))
    };

    let mut rig_cfg = RigConfig::from_app(&config);
    rig_cfg.max_samples = args.samples;
    rig_cfg.redraw_each_iteration = !args.split_display;

    let rig = AcquisitionRig::new(
        rig_cfg,
        device,
        converter,
        config.sampling.window_capacity,
        sink,
        scheduler,
        std::sync::Arc::clone(&display),
        shutdown.clone(),
    );

    let refresh_handle = args.split_display.then(|| {
        spawn_refresh_task(
            std::sync::Arc::clone(&display),
            rig.reader(),
            Duration::from_millis(DISPLAY_REFRESH_PERIOD_MS),
            shutdown.clone(),
        )
    });

    let report = rig.run().await;

    if let Some(handle) = refresh_handle {
        let _ = handle.await;
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  RUN SUMMARY");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Samples acquired:  {}", report.samples);
    info!("  Device errors:     {}", report.device_errors);
    info!("  Rows lost:         {}", report.rows_lost);
    info!("  Snapshots:         {}", report.snapshots);
    info!("  CSV:               {}", report.csv_path.display());
    if let Some(bulk) = &report.bulk_path {
        info!("  Spreadsheet:       {}", bulk.display());
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("tacholog shutdown complete");
    Ok(())
}
