//! Data loaders for raw position logs and binary snapshots.
//!
//! This module provides parsers for:
//! - Raw position log CSV files (timestamp, x, y; no header)
//! - Binary snapshots written by [`crate::core::writers::write_snapshot`]

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use thiserror::Error;

use super::snapshot::{self, SnapshotError};
use super::transforms::FormattedLog;

/// Number of columns in a raw position log.
pub const LOG_COLUMNS: usize = 3;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("line {line}: expected 3 columns, found {found}")]
    FieldCount { line: u64, found: usize },

    #[error("line {line}: invalid {column} value '{value}'")]
    ParseError {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("Invalid snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// A single raw log sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRow {
    /// Seconds since an arbitrary epoch.
    pub timestamp: f64,
    pub x: f32,
    pub y: f32,
}

/// Container for a position log stored column-wise.
///
/// Rows are kept in file order. Ascending timestamps are assumed by the
/// transforms but never enforced here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionLog {
    /// Timestamp of every sample, in seconds.
    pub timestamps: Vec<f64>,
    /// `[x, y]` of every sample.
    pub positions: Vec<[f32; 2]>,
    /// Source file path.
    pub source_path: Option<PathBuf>,
}

impl PositionLog {
    /// Creates a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            source_path: None,
        }
    }

    /// Creates a log from parallel timestamp and position vectors.
    pub fn from_columns(timestamps: Vec<f64>, positions: Vec<[f32; 2]>) -> Self {
        debug_assert_eq!(timestamps.len(), positions.len());
        Self {
            timestamps,
            positions,
            source_path: None,
        }
    }

    /// Returns the number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns true if the log holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Appends a sample.
    #[inline]
    pub fn push(&mut self, row: LogRow) {
        self.timestamps.push(row.timestamp);
        self.positions.push([row.x, row.y]);
    }

    /// Returns the sample at `idx`.
    pub fn row(&self, idx: usize) -> Option<LogRow> {
        let timestamp = *self.timestamps.get(idx)?;
        let [x, y] = *self.positions.get(idx)?;
        Some(LogRow { timestamp, x, y })
    }

    /// Iterates over all samples in order.
    pub fn rows(&self) -> impl Iterator<Item = LogRow> + '_ {
        self.timestamps
            .iter()
            .zip(self.positions.iter())
            .map(|(&timestamp, &[x, y])| LogRow { timestamp, x, y })
    }

    /// Extracts one position column (0 = x, 1 = y).
    pub fn column(&self, axis: usize) -> Vec<f32> {
        self.positions.iter().map(|p| p[axis]).collect()
    }

    #[inline]
    pub fn first_timestamp(&self) -> Option<f64> {
        self.timestamps.first().copied()
    }

    #[inline]
    pub fn last_timestamp(&self) -> Option<f64> {
        self.timestamps.last().copied()
    }
}

impl FromIterator<LogRow> for PositionLog {
    fn from_iter<I: IntoIterator<Item = LogRow>>(iter: I) -> Self {
        let mut log = PositionLog::new();
        for row in iter {
            log.push(row);
        }
        log
    }
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    column: &'static str,
    line: u64,
) -> Result<T> {
    let raw = record.get(idx).unwrap_or_default();
    raw.parse().map_err(|_| LoaderError::ParseError {
        line,
        column,
        value: raw.to_string(),
    })
}

/// Load a raw position log from a CSV file.
///
/// The expected CSV format:
/// - No header row
/// - Exactly three comma-separated numeric columns: timestamp, x, y
/// - Blank lines and lines starting with `#` are ignored
///
/// # Arguments
///
/// * `path` - Path to the log file
///
/// # Returns
///
/// A `PositionLog` holding every row in file order.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a row does not have three
/// fields, a field is not numeric, or the file holds no rows.
pub fn load_position_log<P: AsRef<Path>>(path: P) -> Result<PositionLog> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(BufReader::new(file));

    let mut log = PositionLog::with_capacity(4096);

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());

        if record.len() != LOG_COLUMNS {
            return Err(LoaderError::FieldCount {
                line,
                found: record.len(),
            });
        }

        log.push(LogRow {
            timestamp: parse_field(&record, 0, "timestamp", line)?,
            x: parse_field(&record, 1, "x", line)?,
            y: parse_field(&record, 2, "y", line)?,
        });
    }

    if log.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    info!(
        "{} has been loaded ({} rows)",
        path.file_name().unwrap_or_default().to_string_lossy(),
        log.len()
    );

    log.source_path = Some(path.to_path_buf());
    Ok(log)
}

/// Reload a formatted log from a binary snapshot file.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<FormattedLog> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!("read {} snapshot bytes from {}", bytes.len(), path.display());

    snapshot::decode(&bytes).map_err(|source| LoaderError::Snapshot {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_log(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_position_log_operations() {
        let mut log = PositionLog::new();
        assert!(log.is_empty());

        log.push(LogRow { timestamp: 0.5, x: 1.0, y: 2.0 });
        log.push(LogRow { timestamp: 1.5, x: 3.0, y: 4.0 });

        assert_eq!(log.len(), 2);
        assert_eq!(log.first_timestamp(), Some(0.5));
        assert_eq!(log.last_timestamp(), Some(1.5));
        assert_eq!(log.column(1), vec![2.0, 4.0]);
        assert_eq!(log.row(1), Some(LogRow { timestamp: 1.5, x: 3.0, y: 4.0 }));
        assert_eq!(log.row(2), None);

        let collected: PositionLog = log.rows().collect();
        assert_eq!(collected.timestamps, log.timestamps);
        assert_eq!(collected.positions, log.positions);
    }

    #[test]
    fn test_load_position_log() -> Result<()> {
        let file = write_log(&["0,1,10", "1,2,20", "2,3,30"]);

        let log = load_position_log(file.path())?;
        assert_eq!(log.len(), 3);
        assert_eq!(log.timestamps, vec![0.0, 1.0, 2.0]);
        assert_eq!(log.positions, vec![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]]);
        assert_eq!(log.source_path.as_deref(), Some(file.path()));

        Ok(())
    }

    #[test]
    fn test_load_keeps_timestamp_precision() -> Result<()> {
        let file = write_log(&["1617278400.125, -0.5, 7.25", "1617278400.250, -0.25, 7.5"]);

        let log = load_position_log(file.path())?;
        assert_eq!(log.timestamps, vec![1617278400.125, 1617278400.25]);
        assert_eq!(log.positions[0], [-0.5, 7.25]);

        Ok(())
    }

    #[test]
    fn test_load_skips_comments_and_blank_lines() -> Result<()> {
        let file = write_log(&["# time,x,y", "0,1,2", "", "1,3,4"]);

        let log = load_position_log(file.path())?;
        assert_eq!(log.len(), 2);

        Ok(())
    }

    #[test]
    fn test_load_rejects_non_numeric() {
        let file = write_log(&["0,1,2", "1,abc,4"]);

        match load_position_log(file.path()) {
            Err(LoaderError::ParseError { line, column, value }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "x");
                assert_eq!(value, "abc");
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_wrong_field_count() {
        let file = write_log(&["0,1,2", "1,2"]);

        match load_position_log(file.path()) {
            Err(LoaderError::FieldCount { line, found }) => {
                assert_eq!(line, 2);
                assert_eq!(found, 2);
            }
            other => panic!("Expected FieldCount, got {:?}", other),
        }
    }

    #[test]
    fn test_load_empty_file() {
        let file = write_log(&[]);

        let result = load_position_log(file.path());
        assert!(matches!(result, Err(LoaderError::EmptyFile(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_position_log("/nonexistent/poslog/input.csv");
        assert!(matches!(result, Err(LoaderError::Io(_))));
    }

    #[test]
    fn test_load_snapshot_rejects_garbage() {
        let file = write_log(&["not a snapshot"]);

        let result = load_snapshot(file.path());
        assert!(matches!(result, Err(LoaderError::Snapshot { .. })));
    }
}
