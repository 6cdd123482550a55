//! Core data types shared across the acquisition pipeline.

use chrono::{DateTime, Local};
use serde::Serialize;

/// One converted measurement produced by the acquisition loop.
///
/// Immutable once created: the loop builds a `Sample` per tick, after which it
/// is only ever cloned into the sliding window, the sample log, and the
/// persistence sink.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    /// Wall-clock time the sample was taken.
    pub timestamp: DateTime<Local>,
    /// Seconds since run start.
    pub elapsed_secs: f64,
    /// Tacho voltage after linear conversion from the raw ADC code (V).
    pub voltage: f64,
    /// Spindle speed mapped from voltage (RPM).
    pub speed: f64,
}

impl Sample {
    /// Column headers shared by the CSV row store and the bulk spreadsheet.
    pub const COLUMNS: [&'static str; 4] = [
        "Timestamp",
        "Elapsed Time (s)",
        "Voltage (V)",
        "Speed (RPM)",
    ];

    /// Render the sample as one row of decimal text, matching [`Self::COLUMNS`].
    pub fn to_row(&self) -> [String; 4] {
        [
            self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{:.3}", self.elapsed_secs),
            format!("{:.4}", self.voltage),
            format!("{:.2}", self.speed),
        ]
    }
}
