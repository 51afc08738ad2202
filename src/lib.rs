//! Position log normalization pipeline.
//!
//! This crate provides tools for:
//! - Loading raw `timestamp,x,y` position logs
//! - Resampling them onto a uniform time axis by linear interpolation
//! - Rebasing the time axis onto a configured calendar origin
//! - Writing the result as CSV and as a binary snapshot
//!
//! # Example
//!
//! ```no_run
//! use poslog_pipeline::{config::FormatConfig, processors::formatting::create_log};
//! use std::path::Path;
//!
//! let config = FormatConfig::load(None).unwrap();
//! let outputs = create_log(Path::new("raw/run_01.csv"), None, &config).unwrap();
//! println!("{} rows -> {}", outputs.rows, outputs.csv_path.display());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use crate::config::{ConfigError, FormatConfig};
pub use crate::core::loaders::{LogRow, PositionLog};
pub use crate::core::transforms::FormattedLog;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
