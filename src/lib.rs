//! tacholog — tachogenerator acquisition and logging.
//!
//! Continuously samples one analogue channel, converts raw ADC codes to
//! voltage and spindle RPM, keeps a bounded sliding window for the live
//! display plus an unbounded run log, persists every sample to a CSV row
//! store as it is taken, and on shutdown writes the full log to an XLSX
//! workbook and captures a final display snapshot. SIGINT/SIGTERM trigger a
//! cooperative drain that never loses buffered work.

pub mod acquisition;
pub mod buffer;
pub mod config;
pub mod convert;
pub mod display;
pub mod shutdown;
pub mod snapshot;
pub mod storage;
pub mod types;

pub use acquisition::{AcquisitionRig, DeviceError, Gain, RigConfig, RigState, RunReport, SamplingDevice};
pub use buffer::{DisplayFrame, FrameReader, SampleLog, SlidingWindow};
pub use config::AppConfig;
pub use convert::Converter;
pub use display::{ChartDisplay, DisplayError, DisplaySurface, NullDisplay, SharedDisplay};
pub use shutdown::ShutdownCoordinator;
pub use snapshot::SnapshotScheduler;
pub use storage::{PersistenceSink, StorageError};
pub use types::Sample;
