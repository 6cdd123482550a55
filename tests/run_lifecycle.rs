//! Acquisition-run lifecycle tests.
//!
//! Drives the rig end-to-end with a scripted device and a stub display:
//! mid-run persistence behavior (incremental CSV only), the drain path
//! (bulk spreadsheet + exactly one final snapshot), and shutdown
//! idempotence.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tacholog::acquisition::{AcquisitionRig, RigConfig};
use tacholog::buffer::DisplayFrame;
use tacholog::config::ConversionConfig;
use tacholog::display::{DisplayError, DisplaySurface, SharedDisplay};
use tacholog::{
    Converter, DeviceError, Gain, PersistenceSink, RigState, SamplingDevice, ShutdownCoordinator,
    SnapshotScheduler,
};

// ============================================================================
// Test doubles
// ============================================================================

/// Serves a fixed script of readings; `None` entries simulate a device read
/// failure. Optionally requests shutdown right after serving the N-th
/// successful reading, which makes the drain boundary deterministic: that
/// iteration is in flight and completes, the next observes the flag.
struct ScriptedDevice {
    script: Vec<Option<i32>>,
    served: usize,
    shutdown_after: Option<(usize, ShutdownCoordinator)>,
}

impl ScriptedDevice {
    fn cycling(codes: &[i32]) -> Self {
        Self {
            script: codes.iter().copied().map(Some).collect(),
            served: 0,
            shutdown_after: None,
        }
    }

    fn with_shutdown_after(mut self, n: usize, coordinator: ShutdownCoordinator) -> Self {
        self.shutdown_after = Some((n, coordinator));
        self
    }
}

#[async_trait]
impl SamplingDevice for ScriptedDevice {
    async fn read_channel(&mut self, channel: u8, _gain: Gain) -> Result<i32, DeviceError> {
        let entry = self.script[self.served % self.script.len()];
        self.served += 1;
        if let Some((n, coordinator)) = &self.shutdown_after {
            if self.served == *n {
                coordinator.request_shutdown();
            }
        }
        entry.ok_or(DeviceError::ReadFailed {
            channel,
            reason: "scripted failure".to_string(),
        })
    }

    fn device_name(&self) -> &str {
        "scripted"
    }
}

/// Stub display that creates an empty file per render request, so snapshot
/// files can be counted on disk.
struct FileStampDisplay {
    renders: AtomicU64,
}

impl FileStampDisplay {
    fn new() -> Self {
        Self {
            renders: AtomicU64::new(0),
        }
    }
}

impl DisplaySurface for FileStampDisplay {
    fn redraw(&mut self, _frame: &DisplayFrame) {}

    fn render_to_file(&self, path: &Path) -> Result<(), DisplayError> {
        std::fs::write(path, b"").map_err(|e| DisplayError::Render {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn rig_config() -> RigConfig {
    RigConfig {
        channel: 0,
        gain: Gain::One,
        period: Duration::from_millis(5),
        // Long summary window: these tests don't exercise the average path.
        summary_window: Duration::from_secs(3600),
        redraw_each_iteration: true,
        max_samples: None,
    }
}

fn make_rig<D: SamplingDevice>(
    data_dir: &Path,
    images_dir: &Path,
    device: D,
    display: SharedDisplay,
    shutdown: ShutdownCoordinator,
) -> AcquisitionRig<D> {
    let sink = PersistenceSink::open(data_dir, "test").expect("sink opens");
    // Hour-long interval: only forced (final) snapshots fire in these tests.
    let scheduler = SnapshotScheduler::new(images_dir.to_path_buf(), Duration::from_secs(3600));
    let converter = Converter::new(Gain::One, &ConversionConfig::default());
    AcquisitionRig::new(
        rig_config(),
        device,
        converter,
        60,
        sink,
        scheduler,
        display,
        shutdown,
    )
}

fn csv_line_count(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .expect("readable CSV")
        .lines()
        .count()
}

fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("readable dir")
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    entries.sort();
    entries
}

// ============================================================================
// Scenarios
// ============================================================================

/// Mid-run: after 10 iterations with no shutdown request, the log holds 10
/// samples, the row store holds header + 10 rows, and no bulk file exists
/// yet (bulk only at shutdown).
#[tokio::test]
async fn ten_iterations_persist_rows_but_no_bulk_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (data_dir, images_dir) = (tmp.path().join("data"), tmp.path().join("images"));
    tacholog::storage::ensure_output_dirs(&data_dir, &images_dir).expect("dirs");

    let display: SharedDisplay = Arc::new(Mutex::new(FileStampDisplay::new()));
    let device = ScriptedDevice::cycling(&[0, 16383, 32767]);
    let mut rig = make_rig(
        &data_dir,
        &images_dir,
        device,
        display,
        ShutdownCoordinator::new(),
    );

    for _ in 0..10 {
        rig.step().await;
    }

    assert_eq!(rig.state(), RigState::Running);
    assert_eq!(rig.samples_logged(), 10);
    assert_eq!(csv_line_count(rig.csv_path()), 11, "header + 10 data rows");
    // Only the CSV exists in the data dir — the bulk spreadsheet is written
    // at finalization, which has not run.
    assert_eq!(dir_entries(&data_dir).len(), 1);
    assert!(dir_entries(&images_dir).is_empty());
}

/// Drain: shutdown requested during the 3rd of 10 scheduled iterations. The
/// in-flight iteration completes, the loop stops at the next boundary, the
/// bulk file holds exactly the 3 logged samples, and exactly one final
/// snapshot is rendered.
#[tokio::test]
async fn shutdown_mid_run_drains_within_one_iteration() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (data_dir, images_dir) = (tmp.path().join("data"), tmp.path().join("images"));
    tacholog::storage::ensure_output_dirs(&data_dir, &images_dir).expect("dirs");

    let shutdown = ShutdownCoordinator::new();
    let device =
        ScriptedDevice::cycling(&[1000, 2000, 3000]).with_shutdown_after(3, shutdown.clone());
    let display: SharedDisplay = Arc::new(Mutex::new(FileStampDisplay::new()));

    let rig = make_rig(&data_dir, &images_dir, device, display, shutdown);
    let report = rig.run().await;

    assert_eq!(report.samples, 3);
    assert_eq!(report.device_errors, 0);
    assert_eq!(report.rows_lost, 0);
    assert_eq!(report.snapshots, 1, "final snapshot only");
    assert_eq!(csv_line_count(&report.csv_path), 4, "header + 3 data rows");

    let bulk = report.bulk_path.expect("bulk written at shutdown");
    assert!(bulk.metadata().expect("bulk exists").len() > 0);

    let images = dir_entries(&images_dir);
    assert_eq!(images.len(), 1);
    let name = images[0]
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .expect("snapshot name");
    assert!(name.starts_with("final_screenshot_"), "got {name}");
}

/// Requesting shutdown repeatedly has the same observable effect as
/// requesting it once: the finalization sequence runs exactly once.
#[tokio::test]
async fn repeated_shutdown_requests_finalize_once() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (data_dir, images_dir) = (tmp.path().join("data"), tmp.path().join("images"));
    tacholog::storage::ensure_output_dirs(&data_dir, &images_dir).expect("dirs");

    let shutdown = ShutdownCoordinator::new();
    shutdown.request_shutdown();
    shutdown.request_shutdown();
    shutdown.request_shutdown();

    let device = ScriptedDevice::cycling(&[500]);
    let display: SharedDisplay = Arc::new(Mutex::new(FileStampDisplay::new()));
    let rig = make_rig(&data_dir, &images_dir, device, display, shutdown.clone());

    let report = rig.run().await;

    // Flag was already set: the loop observed it at the first boundary and
    // acquired nothing.
    assert_eq!(report.samples, 0);
    assert_eq!(report.snapshots, 1, "exactly one final snapshot");
    assert!(report.bulk_path.is_some());
    assert_eq!(dir_entries(&images_dir).len(), 1);

    // Late requests after the run are still harmless no-ops.
    shutdown.request_shutdown();
}

/// A device serving codes outside the raw range is treated like a failed
/// read: the iteration is skipped, no sample or row is produced, and the
/// loop recovers on the next valid code.
#[tokio::test]
async fn out_of_range_codes_are_rejected_without_rows() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (data_dir, images_dir) = (tmp.path().join("data"), tmp.path().join("images"));
    tacholog::storage::ensure_output_dirs(&data_dir, &images_dir).expect("dirs");

    let device = ScriptedDevice {
        script: vec![Some(1000), Some(40000), Some(-1), Some(2000)],
        served: 0,
        shutdown_after: None,
    };
    let display: SharedDisplay = Arc::new(Mutex::new(FileStampDisplay::new()));
    let mut rig = make_rig(
        &data_dir,
        &images_dir,
        device,
        display,
        ShutdownCoordinator::new(),
    );

    for _ in 0..4 {
        rig.step().await;
    }

    assert_eq!(rig.samples_logged(), 2, "only in-range codes become samples");
    assert_eq!(csv_line_count(rig.csv_path()), 3, "header + 2 data rows");
}

/// Device failures skip the iteration without appending a sample or a row;
/// the loop keeps going and recovers.
#[tokio::test]
async fn device_failures_skip_iterations_without_rows() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (data_dir, images_dir) = (tmp.path().join("data"), tmp.path().join("images"));
    tacholog::storage::ensure_output_dirs(&data_dir, &images_dir).expect("dirs");

    let device = ScriptedDevice {
        script: vec![Some(1000), None, None, None, Some(2000)],
        served: 0,
        shutdown_after: None,
    };
    let display: SharedDisplay = Arc::new(Mutex::new(FileStampDisplay::new()));
    let mut rig = make_rig(
        &data_dir,
        &images_dir,
        device,
        display,
        ShutdownCoordinator::new(),
    );

    for _ in 0..5 {
        rig.step().await;
    }

    assert_eq!(rig.samples_logged(), 2);
    assert_eq!(csv_line_count(rig.csv_path()), 3, "header + 2 data rows");
}
