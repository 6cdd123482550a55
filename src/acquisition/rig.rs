//! The acquisition loop: sample → convert → buffer → persist → display.
//!
//! One [`AcquisitionRig`] instance owns all loop state (window, log, summary
//! accumulator, failure counters), so independent rigs can run in the same
//! process without cross-contamination. The loop polls the shutdown flag at
//! the top of every iteration; once observed, the in-flight iteration
//! finishes, the one-time finalization sequence runs (bulk spreadsheet, then
//! final snapshot — each failure reported independently), and the rig stops.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::device::{validate_code, Gain, SamplingDevice};
use crate::buffer::{FrameReader, SampleLog, SlidingWindow};
use crate::config::defaults::{CONSECUTIVE_READ_FAILURE_WARN, FINAL_SNAPSHOT_PREFIX};
use crate::config::AppConfig;
use crate::convert::Converter;
use crate::display::SharedDisplay;
use crate::shutdown::ShutdownCoordinator;
use crate::snapshot::SnapshotScheduler;
use crate::storage::PersistenceSink;
use crate::types::Sample;

// ============================================================================
// Loop configuration
// ============================================================================

/// Runtime knobs for one acquisition run, derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct RigConfig {
    pub channel: u8,
    pub gain: Gain,
    /// Pacing period between iterations.
    pub period: Duration,
    /// Width of the coarse speed-summary window.
    pub summary_window: Duration,
    /// Integrated model redraws every iteration; the split model leaves
    /// redrawing to the 1 Hz refresh task.
    pub redraw_each_iteration: bool,
    /// Optional capture limit: request shutdown once this many samples have
    /// been logged.
    pub max_samples: Option<u64>,
}

impl RigConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            channel: config.adc.channel,
            gain: config.adc.gain,
            period: Duration::from_millis(config.sampling.period_ms),
            summary_window: Duration::from_secs(config.sampling.summary_window_secs),
            redraw_each_iteration: true,
            max_samples: None,
        }
    }
}

/// Loop lifecycle. `Draining` means shutdown was observed and the in-flight
/// iteration is being finished; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigState {
    Running,
    Draining,
    Stopped,
}

/// Final run statistics returned by [`AcquisitionRig::run`].
#[derive(Debug)]
pub struct RunReport {
    pub samples: u64,
    pub device_errors: u64,
    /// Rows whose incremental append failed; the data loss was reported
    /// loudly at the time.
    pub rows_lost: u64,
    pub snapshots: u64,
    pub csv_path: PathBuf,
    pub bulk_path: Option<PathBuf>,
}

// ============================================================================
// Summary window
// ============================================================================

/// Coarse time-based accumulator for the periodic average-speed summary.
///
/// Independent of the display sliding window by design: summary granularity
/// is seconds and the accumulator clears on every roll-over, while the
/// display window is sample-count based and evicts one-at-a-time.
pub struct SummaryWindow {
    width: Duration,
    started: Instant,
    speeds: Vec<f64>,
}

impl SummaryWindow {
    pub fn new(width: Duration) -> Self {
        Self {
            width,
            started: Instant::now(),
            speeds: Vec::new(),
        }
    }

    pub fn record(&mut self, speed: f64) {
        self.speeds.push(speed);
    }

    /// If the window has elapsed, reset it and return the mean speed of the
    /// samples collected in it (`None` when the window was empty).
    pub fn roll_over(&mut self, now: Instant) -> Option<f64> {
        if now.duration_since(self.started) < self.width {
            return None;
        }
        self.started = now;
        if self.speeds.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = self.speeds.iter().sum::<f64>() / self.speeds.len() as f64;
        self.speeds.clear();
        Some(mean)
    }
}

// ============================================================================
// Acquisition rig
// ============================================================================

pub struct AcquisitionRig<D: SamplingDevice> {
    cfg: RigConfig,
    device: D,
    converter: Converter,
    window: SlidingWindow,
    log: SampleLog,
    sink: PersistenceSink,
    snapshots: SnapshotScheduler,
    display: SharedDisplay,
    shutdown: ShutdownCoordinator,
    summary: SummaryWindow,
    state: RigState,
    started: Instant,
    consecutive_read_failures: u32,
    device_errors: u64,
    rows_lost: u64,
    finalized: bool,
}

impl<D: SamplingDevice> AcquisitionRig<D> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: RigConfig,
        device: D,
        converter: Converter,
        window_capacity: usize,
        sink: PersistenceSink,
        snapshots: SnapshotScheduler,
        display: SharedDisplay,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        let summary = SummaryWindow::new(cfg.summary_window);
        Self {
            cfg,
            device,
            converter,
            window: SlidingWindow::new(window_capacity),
            log: SampleLog::new(),
            sink,
            snapshots,
            display,
            shutdown,
            summary,
            state: RigState::Running,
            started: Instant::now(),
            consecutive_read_failures: 0,
            device_errors: 0,
            rows_lost: 0,
            finalized: false,
        }
    }

    pub fn state(&self) -> RigState {
        self.state
    }

    /// Read handle for the display-refresh path (split model).
    pub fn reader(&self) -> FrameReader {
        self.window.reader()
    }

    pub fn samples_logged(&self) -> usize {
        self.log.len()
    }

    pub fn csv_path(&self) -> &Path {
        self.sink.csv_path()
    }

    /// Run until shutdown is requested, then finalize exactly once.
    pub async fn run(mut self) -> RunReport {
        info!(
            device = self.device.device_name(),
            channel = self.cfg.channel,
            period_ms = self.cfg.period.as_millis() as u64,
            csv = %self.sink.csv_path().display(),
            "Acquisition started"
        );

        let mut ticker = tokio::time::interval(self.cfg.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = self.shutdown.clone();

        loop {
            // The shutdown flag is observed once per iteration, at the top.
            if shutdown.is_shutdown_requested() {
                self.state = RigState::Draining;
                break;
            }
            tokio::select! {
                () = shutdown.cancelled() => {
                    // Observed at the top of the next pass.
                }
                _ = ticker.tick() => {
                    self.step().await;
                    if let Some(max) = self.cfg.max_samples {
                        if self.log.len() as u64 >= max {
                            info!(samples = max, "Capture limit reached");
                            shutdown.request_shutdown();
                        }
                    }
                }
            }
        }

        self.finalize();
        self.into_report()
    }

    /// One acquisition iteration: acquire, convert, buffer, persist,
    /// redraw, snapshot, summarise. Iteration-local errors are reported and
    /// never escape.
    pub async fn step(&mut self) {
        let reading = self
            .device
            .read_channel(self.cfg.channel, self.cfg.gain)
            .await
            .and_then(|code| validate_code(self.cfg.channel, code));
        let code = match reading {
            Ok(code) => code,
            Err(e) => {
                self.device_errors += 1;
                self.consecutive_read_failures += 1;
                warn!(channel = self.cfg.channel, error = %e, "Device read failed — skipping iteration");
                if self.consecutive_read_failures >= CONSECUTIVE_READ_FAILURE_WARN {
                    warn!(
                        consecutive = self.consecutive_read_failures,
                        "Sampling device persistently failing"
                    );
                }
                return;
            }
        };
        self.consecutive_read_failures = 0;

        let voltage = self.converter.voltage(code);
        let speed = self.converter.speed(voltage);
        let sample = Sample {
            timestamp: Local::now(),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            voltage,
            speed,
        };
        debug!(
            duty_pct = self.converter.duty_cycle_percent(voltage),
            voltage,
            rpm = speed,
            "Sample acquired"
        );

        self.window.push(sample.clone());
        self.log.append(sample.clone());

        // Durability invariant: the row is flushed before the next sample is
        // acquired. A failed append loses exactly this row — reported, never
        // silently swallowed.
        if let Err(e) = self.sink.append_row(&sample) {
            self.rows_lost += 1;
            error!(error = %e, "Incremental append failed — row lost");
        }

        match self.display.lock() {
            Ok(mut surface) => {
                if self.cfg.redraw_each_iteration {
                    surface.redraw(&self.window.snapshot());
                }
                if let Err(e) = self.snapshots.maybe_trigger(Instant::now(), &*surface) {
                    error!(error = %e, "Periodic snapshot failed");
                }
            }
            Err(_) => warn!("Display lock poisoned — skipping redraw and snapshot"),
        }

        self.summary.record(speed);
        if let Some(avg) = self.summary.roll_over(Instant::now()) {
            self.window.set_avg_speed(avg);
            info!(avg_rpm = avg, "Average speed over summary window");
        }
    }

    /// One-time finalization: bulk spreadsheet write, then the forced final
    /// snapshot. The steps are independent — a failure in one is reported
    /// and the next still runs.
    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        info!(samples = self.log.len(), "Draining — running finalization");

        match self.sink.write_bulk(self.log.all()) {
            Ok(path) => {
                info!(path = %path.display(), rows = self.log.len(), "Bulk spreadsheet written");
            }
            Err(e) => error!(error = %e, "Bulk spreadsheet write failed"),
        }

        match self.display.lock() {
            Ok(surface) => {
                match self.snapshots.force_trigger(FINAL_SNAPSHOT_PREFIX, &*surface) {
                    Ok(path) => info!(path = %path.display(), "Final snapshot saved"),
                    Err(e) => error!(error = %e, "Final snapshot failed"),
                }
            }
            Err(_) => warn!("Display lock poisoned — final snapshot skipped"),
        }

        self.state = RigState::Stopped;
    }

    fn into_report(self) -> RunReport {
        let bulk_path = {
            let p = self.sink.bulk_path();
            p.exists().then(|| p.to_path_buf())
        };
        RunReport {
            samples: self.log.len() as u64,
            device_errors: self.device_errors,
            rows_lost: self.rows_lost,
            snapshots: self.snapshots.count(),
            csv_path: self.sink.csv_path().to_path_buf(),
            bulk_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use crate::acquisition::{SyntheticDevice, SyntheticProfile};
    use crate::config::ConversionConfig;
    use crate::display::NullDisplay;

    /// Accepts the first write (the CSV header), then refuses everything.
    #[derive(Default)]
    struct FaultyWriter {
        writes: usize,
    }

    impl Write for FaultyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            if self.writes == 1 {
                Ok(buf.len())
            } else {
                Err(io::Error::new(io::ErrorKind::Other, "row store unwritable"))
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// A failing incremental append loses exactly that row: the sample still
    /// reaches the log and the window, the loss is counted, and the run
    /// finishes with finalization intact.
    #[tokio::test]
    async fn failed_append_loses_the_row_but_not_the_sample() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let images_dir = tmp.path().join("images");
        std::fs::create_dir_all(&images_dir).expect("images dir");

        let sink = PersistenceSink::from_writer(
            Box::new(FaultyWriter::default()),
            tmp.path().join("test.csv"),
            tmp.path().join("test.xlsx"),
        )
        .expect("header write accepted");

        let cfg = RigConfig {
            channel: 0,
            gain: Gain::One,
            period: Duration::from_millis(1),
            summary_window: Duration::from_secs(3600),
            redraw_each_iteration: true,
            max_samples: Some(2),
        };
        let converter = Converter::new(Gain::One, &ConversionConfig::default());
        let device = SyntheticDevice::with_seed(SyntheticProfile::default(), 3);
        let display: SharedDisplay = Arc::new(Mutex::new(NullDisplay));
        let scheduler = SnapshotScheduler::new(images_dir, Duration::from_secs(3600));

        let rig = AcquisitionRig::new(
            cfg,
            device,
            converter,
            60,
            sink,
            scheduler,
            display,
            ShutdownCoordinator::new(),
        );
        let report = rig.run().await;

        assert_eq!(report.samples, 2, "samples still logged");
        assert_eq!(report.rows_lost, 2, "every failed append counted");
        assert_eq!(report.device_errors, 0);
        // Finalization ran: the bulk spreadsheet does not depend on the row
        // store and the final snapshot still fires.
        assert!(report.bulk_path.is_some());
        assert_eq!(report.snapshots, 1);
    }

    #[test]
    fn summary_window_reports_the_mean_and_clears() {
        let mut summary = SummaryWindow::new(Duration::ZERO);
        summary.record(1000.0);
        summary.record(2000.0);
        let avg = summary.roll_over(Instant::now()).expect("window elapsed");
        assert!((avg - 1500.0).abs() < 1e-9);
        // Accumulator cleared: next roll-over has nothing to report.
        assert!(summary.roll_over(Instant::now()).is_none());
    }

    #[test]
    fn summary_window_stays_closed_before_the_width() {
        let mut summary = SummaryWindow::new(Duration::from_secs(3600));
        summary.record(1000.0);
        assert!(summary.roll_over(Instant::now()).is_none());
    }

    #[test]
    fn empty_summary_window_resets_without_reporting() {
        let mut summary = SummaryWindow::new(Duration::ZERO);
        assert!(summary.roll_over(Instant::now()).is_none());
    }
}
