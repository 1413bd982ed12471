//! Logging setup and timing helpers.

mod logging;
mod timer;

pub use logging::{console_filter, init_logging, LogLevel};
pub use timer::OperationTimer;
