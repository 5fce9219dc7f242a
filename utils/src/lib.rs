//! Shared utilities for the proposal sync service.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat, LogFormatError};
pub use time::format_duration;
