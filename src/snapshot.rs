//! Time-gated display snapshots.
//!
//! Once per interval the scheduler asks the display surface to render the
//! current view to a timestamped PNG. The interval anchor is owned here and
//! reset only by its own trigger; the unconditional final snapshot at
//! shutdown bypasses the gate entirely.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::info;

use crate::config::defaults::SNAPSHOT_PREFIX;
use crate::display::{DisplayError, DisplaySurface};

pub struct SnapshotScheduler {
    interval: Duration,
    last_snapshot: Instant,
    images_dir: PathBuf,
    count: u64,
}

impl SnapshotScheduler {
    pub fn new(images_dir: PathBuf, interval: Duration) -> Self {
        Self {
            interval,
            last_snapshot: Instant::now(),
            images_dir,
            count: 0,
        }
    }

    /// Trigger a periodic snapshot if the interval has elapsed since the
    /// last one; otherwise a no-op.
    ///
    /// The anchor resets as soon as the gate opens, even if rendering then
    /// fails — a failed render is reported once, not retried every
    /// iteration.
    pub fn maybe_trigger<S: DisplaySurface + ?Sized>(
        &mut self,
        now: Instant,
        display: &S,
    ) -> Result<Option<PathBuf>, DisplayError> {
        if now.duration_since(self.last_snapshot) < self.interval {
            return Ok(None);
        }
        self.last_snapshot = now;
        self.render(SNAPSHOT_PREFIX, display).map(Some)
    }

    /// Unconditional snapshot, independent of the interval gate. Used for
    /// the one-time final capture at shutdown.
    pub fn force_trigger<S: DisplaySurface + ?Sized>(
        &mut self,
        prefix: &str,
        display: &S,
    ) -> Result<PathBuf, DisplayError> {
        self.render(prefix, display)
    }

    /// Snapshots successfully rendered so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    fn render<S: DisplaySurface + ?Sized>(
        &mut self,
        prefix: &str,
        display: &S,
    ) -> Result<PathBuf, DisplayError> {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let path = self.images_dir.join(format!("{prefix}_{stamp}.png"));
        display.render_to_file(&path)?;
        self.count += 1;
        info!(path = %path.display(), "Snapshot saved");
        Ok(path)
    }
}
