//! Durable storage for acquired samples.

pub mod paths;
pub mod sink;

pub use paths::{ensure_output_dirs, unique_path};
pub use sink::{PersistenceSink, StorageError};
