//! Core data types and I/O operations.

pub mod loaders;
pub mod snapshot;
pub mod transforms;
pub mod writers;

pub use loaders::{load_position_log, load_snapshot, LogRow, PositionLog};
pub use transforms::{normalize, rebase_timestamps, resample, FormattedLog};
pub use writers::{write_formatted_csv, write_snapshot, WriteError};
