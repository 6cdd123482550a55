//! Sliding display window and append-only sample log.
//!
//! The window is mutated by the acquisition loop only. After every mutation a
//! complete [`DisplayFrame`] is republished through an `ArcSwap`, so display
//! readers on another thread never observe a partially-evicted or
//! partially-appended window — they either see the previous frame or the new
//! one.

use std::collections::VecDeque;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::types::Sample;

/// Snapshot handed to the display path: the current window contents in
/// recency order, plus the most recent one-second average speed.
#[derive(Debug, Clone, Default)]
pub struct DisplayFrame {
    pub samples: Vec<Sample>,
    pub avg_speed: f64,
}

/// Fixed-capacity, oldest-evicted buffer of the most recent samples.
///
/// Capacity is fixed at construction and never changes.
pub struct SlidingWindow {
    capacity: usize,
    items: VecDeque<Sample>,
    avg_speed: f64,
    shared: Arc<ArcSwap<DisplayFrame>>,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
            avg_speed: 0.0,
            shared: Arc::new(ArcSwap::from_pointee(DisplayFrame::default())),
        }
    }

    /// Append a sample, evicting the oldest entry once the window is full.
    pub fn push(&mut self, sample: Sample) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(sample);
        self.publish();
    }

    /// Record the latest summary-window average and republish the frame.
    pub fn set_avg_speed(&mut self, avg_speed: f64) {
        self.avg_speed = avg_speed;
        self.publish();
    }

    /// Current contents, safe to iterate while a concurrent push is pending.
    pub fn snapshot(&self) -> Arc<DisplayFrame> {
        self.shared.load_full()
    }

    /// Cloneable read handle for the display-refresh path.
    pub fn reader(&self) -> FrameReader {
        FrameReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn publish(&self) {
        self.shared.store(Arc::new(DisplayFrame {
            samples: self.items.iter().cloned().collect(),
            avg_speed: self.avg_speed,
        }));
    }
}

/// Read-only handle onto the atomically-published display frame.
#[derive(Clone)]
pub struct FrameReader {
    shared: Arc<ArcSwap<DisplayFrame>>,
}

impl FrameReader {
    pub fn latest(&self) -> Arc<DisplayFrame> {
        self.shared.load_full()
    }
}

/// Unbounded, append-only record of every sample acquired during a run.
///
/// Source of truth for the bulk spreadsheet write at shutdown. Never shrinks.
#[derive(Default)]
pub struct SampleLog {
    samples: Vec<Sample>,
}

impl SampleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Every sample ever appended, in acquisition order.
    pub fn all(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn sample(speed: f64) -> Sample {
        Sample {
            timestamp: Local::now(),
            elapsed_secs: speed / 10.0,
            voltage: speed / 1000.0,
            speed,
        }
    }

    #[test]
    fn window_evicts_oldest_beyond_capacity() {
        let mut window = SlidingWindow::new(3);
        for i in 0..4 {
            window.push(sample(f64::from(i)));
        }
        let frame = window.snapshot();
        let speeds: Vec<f64> = frame.samples.iter().map(|s| s.speed).collect();
        assert_eq!(speeds, vec![1.0, 2.0, 3.0]);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn snapshot_never_exceeds_capacity() {
        let mut window = SlidingWindow::new(5);
        for i in 0..50 {
            window.push(sample(f64::from(i)));
            assert!(window.snapshot().samples.len() <= 5);
        }
    }

    #[test]
    fn reader_observes_published_frames() {
        let mut window = SlidingWindow::new(4);
        let reader = window.reader();
        assert!(reader.latest().samples.is_empty());

        window.push(sample(42.0));
        window.set_avg_speed(42.0);

        let frame = reader.latest();
        assert_eq!(frame.samples.len(), 1);
        assert!((frame.avg_speed - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn log_grows_without_eviction() {
        let mut log = SampleLog::new();
        for i in 0..100 {
            log.append(sample(f64::from(i)));
        }
        assert_eq!(log.len(), 100);
        assert!((log.all()[0].speed - 0.0).abs() < f64::EPSILON);
        assert!((log.all()[99].speed - 99.0).abs() < f64::EPSILON);
    }
}
