//! Durable persistence for acquired samples.
//!
//! Two formats, two cadences:
//! - every sample is appended to a CSV row store and flushed out of the
//!   runtime buffers before the next sample is acquired, so a crash loses at
//!   most the in-flight row;
//! - at finalization the full sample log is written once as an XLSX
//!   workbook.
//!
//! Both file names are reserved at open time via numeric suffixing (see
//! [`unique_path`](super::paths::unique_path)).

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::paths::unique_path;
use crate::types::Sample;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to create output directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV write to {path} failed: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV flush to {path} failed: {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bulk spreadsheet write to {path} failed: {source}")]
    Bulk {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}

/// Row-oriented CSV store plus the one-shot bulk spreadsheet writer.
pub struct PersistenceSink {
    writer: csv::Writer<Box<dyn Write + Send>>,
    csv_path: PathBuf,
    bulk_path: PathBuf,
}

impl PersistenceSink {
    /// Create the CSV row store under `dir`, write the fixed header row, and
    /// reserve a name for the bulk spreadsheet.
    pub fn open(dir: &Path, base: &str) -> Result<Self, StorageError> {
        let csv_path = unique_path(dir, base, "csv");
        let bulk_path = unique_path(dir, base, "xlsx");

        let file = File::create(&csv_path).map_err(|source| StorageError::Create {
            path: csv_path.clone(),
            source,
        })?;
        Self::from_writer(Box::new(file), csv_path, bulk_path)
    }

    /// Row store over an arbitrary writer; `open` goes through here with the
    /// created file. The header row is written and flushed immediately.
    pub(crate) fn from_writer(
        raw: Box<dyn Write + Send>,
        csv_path: PathBuf,
        bulk_path: PathBuf,
    ) -> Result<Self, StorageError> {
        let mut writer = csv::Writer::from_writer(raw);
        writer
            .write_record(Sample::COLUMNS)
            .map_err(|source| StorageError::Csv {
                path: csv_path.clone(),
                source,
            })?;
        writer.flush().map_err(|source| StorageError::Flush {
            path: csv_path.clone(),
            source,
        })?;

        info!(path = %csv_path.display(), "Row store opened");
        Ok(Self {
            writer,
            csv_path,
            bulk_path,
        })
    }

    /// Append one sample row and flush it through to the file before
    /// returning. A crash immediately after loses at most the next,
    /// not-yet-acquired sample.
    pub fn append_row(&mut self, sample: &Sample) -> Result<(), StorageError> {
        self.writer
            .write_record(sample.to_row())
            .map_err(|source| StorageError::Csv {
                path: self.csv_path.clone(),
                source,
            })?;
        self.writer.flush().map_err(|source| StorageError::Flush {
            path: self.csv_path.clone(),
            source,
        })
    }

    /// Write the entire sample log as one single-sheet XLSX workbook at the
    /// path reserved at open time. Called exactly once, at finalization.
    pub fn write_bulk(&mut self, samples: &[Sample]) -> Result<PathBuf, StorageError> {
        let bulk_err = |source| StorageError::Bulk {
            path: self.bulk_path.clone(),
            source,
        };

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();

        for (col, header) in Sample::COLUMNS.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            worksheet
                .write_string(0, col as u16, *header)
                .map_err(bulk_err)?;
        }
        for (i, sample) in samples.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let row = (i + 1) as u32;
            worksheet
                .write_string(row, 0, sample.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
                .map_err(bulk_err)?;
            worksheet
                .write_number(row, 1, sample.elapsed_secs)
                .map_err(bulk_err)?;
            worksheet
                .write_number(row, 2, sample.voltage)
                .map_err(bulk_err)?;
            worksheet
                .write_number(row, 3, sample.speed)
                .map_err(bulk_err)?;
        }

        workbook.save(&self.bulk_path).map_err(bulk_err)?;
        Ok(self.bulk_path.clone())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Reserved path of the bulk spreadsheet; the file does not exist until
    /// [`write_bulk`](Self::write_bulk) runs at finalization.
    pub fn bulk_path(&self) -> &Path {
        &self.bulk_path
    }
}
