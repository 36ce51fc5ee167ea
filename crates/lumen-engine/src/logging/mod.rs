//! Logging utilities.
//!
//! This module centralizes logger initialization. The pipeline itself only
//! talks to the standard `log` facade.

mod init;

pub use init::{init_logging, LoggingConfig};
