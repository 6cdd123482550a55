//! System-wide default constants.
//!
//! Centralises the magic numbers of the acquisition rig. Grouped by
//! subsystem for easy discovery.

// ============================================================================
// Sampling
// ============================================================================

/// Default ADC input channel.
pub const DEFAULT_CHANNEL: u8 = 0;

/// Pacing period between samples (ms). 200 ms = 5 Hz.
pub const DEFAULT_SAMPLE_PERIOD_MS: u64 = 200;

/// Sliding-window capacity for the live display (samples).
pub const DEFAULT_WINDOW_CAPACITY: usize = 60;

/// Width of the coarse averaging window for the speed summary (seconds).
///
/// Distinct from the display window: summary granularity is seconds,
/// display granularity is sample count.
pub const DEFAULT_SUMMARY_WINDOW_SECS: u64 = 1;

/// Consecutive device read failures before the loop escalates to a
/// persistent-failure warning.
pub const CONSECUTIVE_READ_FAILURE_WARN: u32 = 3;

// ============================================================================
// Conversion
// ============================================================================

/// Tachogenerator output voltage range lower bound (V).
pub const DEFAULT_V_MIN: f64 = 0.0;

/// Tachogenerator output voltage range upper bound (V), stepped down to the
/// ADC full scale at gain 1.
pub const DEFAULT_V_MAX: f64 = 4.096;

/// Spindle speed range lower bound (RPM).
pub const DEFAULT_RPM_MIN: f64 = 0.0;

/// Spindle speed range upper bound (RPM).
pub const DEFAULT_RPM_MAX: f64 = 3000.0;

// ============================================================================
// Output
// ============================================================================

/// Directory for the CSV row store and the bulk spreadsheet.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Directory for display snapshots.
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Base file name for both output files (`test.csv`, `test.xlsx`, with a
/// numeric suffix when the name is already taken).
pub const DEFAULT_BASE_NAME: &str = "test";

/// Interval between periodic display snapshots (seconds).
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 60;

/// File-name prefix for periodic snapshots.
pub const SNAPSHOT_PREFIX: &str = "screenshot";

/// File-name prefix for the one-time snapshot taken at shutdown.
pub const FINAL_SNAPSHOT_PREFIX: &str = "final_screenshot";

// ============================================================================
// Display
// ============================================================================

/// Refresh cadence of the split-display task (ms). ~1 Hz.
pub const DISPLAY_REFRESH_PERIOD_MS: u64 = 1000;

/// Rendered chart dimensions (px), matching the original 4"x6" @ 100 dpi
/// figure.
pub const CHART_WIDTH: u32 = 400;
pub const CHART_HEIGHT: u32 = 600;
