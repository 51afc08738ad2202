//! Data writers for formatted position logs.
//!
//! This module provides functions for writing a formatted log to:
//! - CSV with a calendar timestamp column and x, y (no header)
//! - A binary snapshot for fast reload (see [`super::snapshot`])

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use thiserror::Error;

use super::snapshot::{self, SnapshotError};
use super::transforms::FormattedLog;

/// Timestamp format of the first CSV column.
pub const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create the target directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Snapshot encoding error.
    #[error("snapshot encoding failed for '{path}': {source}")]
    Snapshot {
        path: String,
        #[source]
        source: SnapshotError,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates a directory and its parents if it doesn't exist.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| WriteError::CreateDirectory {
            path: dir.display().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Creates a buffered writer for the given path.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

fn file_label(path: &Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().into_owned()
}

/// Write a formatted log as CSV.
///
/// One row per sample, no header:
///
/// ```text
/// 2021-04-01 12:00:00.000000,1.0,10.0
/// 2021-04-01 12:00:01.000000,2.0,20.0
/// ```
///
/// Positions use the shortest representation that round-trips to the same
/// `f32`.
///
/// # Arguments
///
/// * `path` - Output file path (parent directories will be created if needed)
/// * `log` - Formatted log
///
/// # Errors
///
/// Returns an error if:
/// - Parent directories cannot be created
/// - File cannot be created or written to
pub fn write_formatted_csv(path: &Path, log: &FormattedLog) -> Result<()> {
    ensure_parent_dirs(path)?;

    let buf_writer = create_buffered_writer(path)?;
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(buf_writer);

    let path_str = path.display().to_string();

    for (ts, [x, y]) in log.rows() {
        csv_writer
            .write_record(&[
                ts.format(CSV_TIMESTAMP_FORMAT).to_string(),
                format!("{:?}", x),
                format!("{:?}", y),
            ])
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    info!("written to {}", file_label(path));
    Ok(())
}

/// Write a formatted log as a binary snapshot.
///
/// The snapshot holds the same timestamps and positions as the CSV and can
/// be reloaded with [`crate::core::loaders::load_snapshot`].
///
/// # Errors
///
/// Returns an error if the log cannot be encoded or the file cannot be
/// created or written to.
pub fn write_snapshot(path: &Path, log: &FormattedLog) -> Result<()> {
    let path_str = path.display().to_string();

    let bytes = snapshot::encode(log).map_err(|e| WriteError::Snapshot {
        path: path_str.clone(),
        source: e,
    })?;

    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;

    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| WriteError::WriteFile {
            path: path_str,
            source: e,
        })?;

    info!("written to {}", file_label(path));
    Ok(())
}
