//! Raw position log to formatted CSV and snapshot conversion.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use thiserror::Error;

use crate::config::{project_root, FormatConfig};
use crate::core::loaders::load_position_log;
use crate::core::transforms::normalize;
use crate::core::writers::{ensure_dir, write_formatted_csv, write_snapshot};

/// Output directory used when no target is given, relative to the project root.
const DEFAULT_TARGET_DIR: &str = "formatted";

/// Extension of the formatted CSV output.
pub const CSV_EXTENSION: &str = "csv";

/// Extension of the binary snapshot output.
pub const SNAPSHOT_EXTENSION: &str = "snap";

/// Errors raised before any data is read.
#[derive(Debug, Error)]
pub enum FormattingError {
    #[error("Source path has no file name: {path}")]
    NoFileName { path: PathBuf },
}

/// Paths and size of a completed conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatOutputs {
    pub csv_path: PathBuf,
    pub snapshot_path: PathBuf,
    /// Rows written to each output.
    pub rows: usize,
}

/// Directory that receives outputs when no target is given.
pub fn default_target_dir() -> PathBuf {
    project_root().join(DEFAULT_TARGET_DIR)
}

/// Derive `(csv_path, snapshot_path)` for a source file.
///
/// Both outputs take the source file's stem, e.g. `logs/run_07.txt` becomes
/// `<tgt_dir>/run_07.csv` and `<tgt_dir>/run_07.snap`.
pub fn output_paths(src_file: &Path, tgt_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let stem = src_file
        .file_stem()
        .ok_or_else(|| FormattingError::NoFileName {
            path: src_file.to_path_buf(),
        })?;

    // Appended rather than `with_extension`, which would eat dots in the stem.
    let named = |ext: &str| {
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(ext);
        tgt_dir.join(name)
    };

    Ok((named(CSV_EXTENSION), named(SNAPSHOT_EXTENSION)))
}

/// Convert one raw position log into a formatted CSV and a snapshot.
///
/// Loads `src_file`, resamples when `config.freq > 0`, rebases the time
/// axis onto `config.begin`, and writes both outputs into `tgt_dir`
/// (or [`default_target_dir`] when `None`).
///
/// # Arguments
///
/// * `src_file` - Raw log: timestamp, x, y per line, no header
/// * `tgt_dir` - Output directory, created if missing
/// * `config` - Begin time and sampling frequency
///
/// # Returns
///
/// The output paths and the number of rows written.
pub fn create_log(
    src_file: &Path,
    tgt_dir: Option<&Path>,
    config: &FormatConfig,
) -> Result<FormatOutputs> {
    let tgt_dir = tgt_dir.map_or_else(default_target_dir, Path::to_path_buf);
    let (csv_path, snapshot_path) = output_paths(src_file, &tgt_dir)?;

    let raw = load_position_log(src_file)
        .with_context(|| format!("Failed to load source file: {}", src_file.display()))?;

    let formatted = normalize(&raw, config)
        .with_context(|| format!("Failed to normalize {}", src_file.display()))?;

    debug!(
        "{} raw rows -> {} formatted rows (freq {} Hz)",
        raw.len(),
        formatted.len(),
        config.freq
    );

    ensure_dir(&tgt_dir)
        .with_context(|| format!("Failed to prepare target directory: {}", tgt_dir.display()))?;

    write_formatted_csv(&csv_path, &formatted)
        .with_context(|| format!("Failed to write CSV: {}", csv_path.display()))?;

    write_snapshot(&snapshot_path, &formatted)
        .with_context(|| format!("Failed to write snapshot: {}", snapshot_path.display()))?;

    Ok(FormatOutputs {
        csv_path,
        snapshot_path,
        rows: formatted.len(),
    })
}
