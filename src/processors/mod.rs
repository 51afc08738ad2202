//! Data processing modules.

pub mod formatting;

// Re-export key types for convenience
pub use formatting::{create_log, default_target_dir, output_paths, FormatOutputs, FormattingError};
