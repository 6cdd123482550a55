//! Display surface abstraction and the built-in chart renderer.
//!
//! The acquisition rig never talks to a toolkit directly: it hands a
//! [`DisplayFrame`] to whatever implements [`DisplaySurface`] and asks it to
//! render to a PNG when a snapshot is due. Two implementations ship with the
//! binary: the plotters-based [`ChartDisplay`] (stacked voltage/speed line
//! charts, mirroring the original two-subplot figure) and the headless
//! [`NullDisplay`].
//!
//! In the split-display model the rig skips per-iteration redraws and a
//! ~1 Hz refresh task re-armed by [`spawn_refresh_task`] reads the published
//! frame instead; the rig only ever mutates buffers, the refresh path only
//! ever reads complete frames.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use plotters::chart::ChartBuilder;
use plotters::coord::Shift;
use plotters::drawing::DrawingArea;
use plotters::prelude::{BitMapBackend, IntoDrawingArea};
use plotters::series::LineSeries;
use plotters::style::colors::{BLUE, RED, WHITE};
use plotters::style::RGBColor;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::buffer::{DisplayFrame, FrameReader};
use crate::shutdown::ShutdownCoordinator;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("render to {path} failed: {reason}")]
    Render { path: PathBuf, reason: String },
}

/// Rendering surface for the live voltage/speed series.
pub trait DisplaySurface: Send {
    /// Present the latest window contents. Called once per loop iteration in
    /// the integrated model, or ~1 Hz from the refresh task in the split
    /// model.
    fn redraw(&mut self, frame: &DisplayFrame);

    /// Render the current view to a PNG file at `path`.
    fn render_to_file(&self, path: &Path) -> Result<(), DisplayError>;
}

/// Display handle shared between the rig and the optional refresh task.
pub type SharedDisplay = Arc<Mutex<dyn DisplaySurface>>;

// ============================================================================
// Chart renderer
// ============================================================================

/// Plotters-backed renderer: voltage on top, speed below, axis ranges
/// autoscaled from the frame the way the original figure rescaled per
/// redraw.
pub struct ChartDisplay {
    width: u32,
    height: u32,
    frame: DisplayFrame,
}

impl ChartDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: DisplayFrame::default(),
        }
    }
}

impl DisplaySurface for ChartDisplay {
    fn redraw(&mut self, frame: &DisplayFrame) {
        self.frame = frame.clone();
    }

    fn render_to_file(&self, path: &Path) -> Result<(), DisplayError> {
        let render_err = |reason: String| DisplayError::Render {
            path: path.to_path_buf(),
            reason,
        };

        let voltage: Vec<(f64, f64)> = self
            .frame
            .samples
            .iter()
            .map(|s| (s.elapsed_secs, s.voltage))
            .collect();
        let speed: Vec<(f64, f64)> = self
            .frame
            .samples
            .iter()
            .map(|s| (s.elapsed_secs, s.speed))
            .collect();

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| render_err(e.to_string()))?;

        #[allow(clippy::cast_possible_wrap)]
        let mid = (self.height / 2) as i32;
        let (top, bottom) = root.split_vertically(mid);
        draw_trace(&top, &voltage, &BLUE, 0.1).map_err(render_err)?;
        draw_trace(&bottom, &speed, &RED, 10.0).map_err(render_err)?;

        root.present().map_err(|e| render_err(e.to_string()))
    }
}

/// Draw one line series with autoscaled axes; `pad` widens the y-range the
/// way the original plot padded voltage by 0.1 V and speed by 10 RPM.
fn draw_trace(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    points: &[(f64, f64)],
    color: &RGBColor,
    pad: f64,
) -> Result<(), String> {
    let (mut x_min, mut x_max) = (f64::MAX, f64::MIN);
    let (mut y_min, mut y_max) = (f64::MAX, f64::MIN);
    for &(x, y) in points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if points.is_empty() {
        (x_min, x_max, y_min, y_max) = (0.0, 1.0, 0.0, 1.0);
    }
    if x_max - x_min < 1e-9 {
        x_max = x_min + 1.0;
    }
    y_min -= pad;
    y_max += pad;

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| e.to_string())?;
    chart
        .draw_series(LineSeries::new(points.iter().copied(), color))
        .map_err(|e| e.to_string())?;
    Ok(())
}

// ============================================================================
// Headless display
// ============================================================================

/// No-op surface for headless runs and tests: redraws are discarded and
/// render requests succeed without touching the filesystem.
pub struct NullDisplay;

impl DisplaySurface for NullDisplay {
    fn redraw(&mut self, _frame: &DisplayFrame) {}

    fn render_to_file(&self, _path: &Path) -> Result<(), DisplayError> {
        Ok(())
    }
}

// ============================================================================
// Split-display refresh task
// ============================================================================

/// Spawn the ~1 Hz refresh task for the split scheduling model: read the
/// latest published frame and redraw, re-arming until shutdown. The task
/// only ever reads complete frames — buffer mutation stays with the
/// acquisition worker.
pub fn spawn_refresh_task(
    display: SharedDisplay,
    reader: FrameReader,
    period: Duration,
    shutdown: ShutdownCoordinator,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let frame = reader.latest();
                    match display.lock() {
                        Ok(mut surface) => surface.redraw(&frame),
                        Err(_) => {
                            warn!("Display lock poisoned; stopping refresh task");
                            break;
                        }
                    }
                }
            }
        }
    })
}
