//! Utility functions

mod format;
pub mod log_gate;
mod sanitize;

pub use format::{format_rate, format_size, megabytes_per_second};
pub use log_gate::{GatedLayer, ProgressGuard};
pub use sanitize::{sanitize_filename, sanitize_or};
