//! Time axis transformations for position logs.
//!
//! This module provides the resampler (fixed-step linear interpolation) and
//! the timestamp normalizer that anchors a numeric time axis to a calendar
//! origin. Both are pure: they read a `PositionLog` and return new values.

use chrono::{DateTime, NaiveDateTime};
use log::debug;
use thiserror::Error;

use super::loaders::PositionLog;
use crate::config::FormatConfig;

/// Errors that can occur while transforming a log.
#[derive(Error, Debug, PartialEq)]
pub enum TransformError {
    #[error("invalid resampling frequency {0}: must be finite and positive")]
    InvalidFrequency(f64),

    #[error("interpolation needs at least 2 samples, got {0}")]
    InsufficientSamples(usize),

    #[error("query timestamp {value} outside sampled range [{min}, {max}]")]
    OutOfDomain { value: f64, min: f64, max: f64 },

    #[error("timestamp {0} cannot be represented as a calendar time")]
    TimestampOutOfRange(f64),
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// A position series on an absolute calendar axis.
///
/// This is what both writers consume and what a snapshot stores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedLog {
    pub timestamps: Vec<NaiveDateTime>,
    pub positions: Vec<[f32; 2]>,
}

impl FormattedLog {
    /// Returns the number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns true if the series holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Iterates over `(timestamp, [x, y])` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (&NaiveDateTime, &[f32; 2])> + '_ {
        self.timestamps.iter().zip(self.positions.iter())
    }
}

/// Linear interpolation of `ys` over the ascending axis `xs`, evaluated at `x`.
///
/// Unlike a clamping interpolator, queries outside `[xs[0], xs[n-1]]` are
/// rejected rather than extrapolated.
///
/// # Example
///
/// ```
/// use poslog_pipeline::core::transforms::interpolate_linear;
///
/// let y = interpolate_linear(&[0.0, 2.0], &[10.0, 20.0], 0.5).unwrap();
/// assert_eq!(y, 12.5);
/// ```
pub fn interpolate_linear(xs: &[f64], ys: &[f64], x: f64) -> Result<f64> {
    debug_assert_eq!(xs.len(), ys.len(), "xs and ys must have same length");

    let n = xs.len();
    if n < 2 {
        return Err(TransformError::InsufficientSamples(n));
    }

    let (min, max) = (xs[0], xs[n - 1]);
    // Negated form also rejects NaN.
    if !(x >= min && x <= max) {
        return Err(TransformError::OutOfDomain { value: x, min, max });
    }

    // Largest segment start with xs[i - 1] <= x
    let i = xs.partition_point(|&v| v <= x).clamp(1, n - 1);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);

    if x1 == x0 {
        return Ok(y0);
    }
    Ok(y0 + (x - x0) * (y1 - y0) / (x1 - x0))
}

/// Resample a log onto a uniform time axis.
///
/// The new axis starts at the first raw timestamp and advances by
/// `1 / freq` seconds, stopping strictly before the last raw timestamp, so
/// it holds `ceil((last - first) * freq)` samples. Each position column is
/// interpolated independently.
///
/// # Arguments
///
/// * `log` - Raw log with ascending timestamps
/// * `freq` - Target sampling frequency in Hz, must be positive
///
/// # Errors
///
/// Returns an error if `freq` is not positive, the log has fewer than two
/// samples, or a query falls outside the raw timestamp range.
pub fn resample(log: &PositionLog, freq: f64) -> Result<PositionLog> {
    if !freq.is_finite() || freq <= 0.0 {
        return Err(TransformError::InvalidFrequency(freq));
    }
    if log.len() < 2 {
        return Err(TransformError::InsufficientSamples(log.len()));
    }

    let first = log.timestamps[0];
    let last = log.timestamps[log.len() - 1];
    let step = 1.0 / freq;
    let count = ((last - first) * freq).ceil().max(0.0) as usize;

    let timestamps: Vec<f64> = (0..count).map(|i| first + i as f64 * step).collect();

    let xs: Vec<f64> = log.positions.iter().map(|p| f64::from(p[0])).collect();
    let ys: Vec<f64> = log.positions.iter().map(|p| f64::from(p[1])).collect();

    let mut positions = Vec::with_capacity(count);
    for &t in &timestamps {
        let x = interpolate_linear(&log.timestamps, &xs, t)?;
        let y = interpolate_linear(&log.timestamps, &ys, t)?;
        positions.push([x as f32, y as f32]);
    }

    debug!(
        "resampled {} rows to {} rows at {} Hz",
        log.len(),
        timestamps.len(),
        freq
    );

    let mut resampled = PositionLog::from_columns(timestamps, positions);
    resampled.source_path = log.source_path.clone();
    Ok(resampled)
}

/// Calendar time of `seconds` since the Unix epoch, in UTC, at microsecond resolution.
fn calendar_time(seconds: f64) -> Result<NaiveDateTime> {
    if !seconds.is_finite() {
        return Err(TransformError::TimestampOutOfRange(seconds));
    }
    let micros = (seconds * 1e6).round() as i64;
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc())
        .ok_or(TransformError::TimestampOutOfRange(seconds))
}

/// Rebase numeric timestamps onto a calendar origin.
///
/// The offset `begin - calendar(timestamps[0])` is computed once and added
/// to every converted sample, so the first sample lands on `begin` and the
/// relative spacing is preserved. Discontinuities are passed through as-is.
pub fn rebase_timestamps(timestamps: &[f64], begin: NaiveDateTime) -> Result<Vec<NaiveDateTime>> {
    let Some(&first) = timestamps.first() else {
        return Ok(Vec::new());
    };

    let offset = begin - calendar_time(first)?;

    timestamps
        .iter()
        .map(|&t| {
            calendar_time(t)?
                .checked_add_signed(offset)
                .ok_or(TransformError::TimestampOutOfRange(t))
        })
        .collect()
}

/// Apply the configured resampling and rebase the time axis.
pub fn normalize(log: &PositionLog, config: &FormatConfig) -> Result<FormattedLog> {
    let resampled;
    let series = if config.resampling() {
        resampled = resample(log, config.freq)?;
        &resampled
    } else {
        log
    };

    let timestamps = rebase_timestamps(&series.timestamps, config.begin)?;

    Ok(FormattedLog {
        timestamps,
        positions: series.positions.clone(),
    })
}
