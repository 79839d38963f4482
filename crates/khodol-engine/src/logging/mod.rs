//! Logger initialization for binaries and tools built on the engine.
//!
//! Library code only uses the `log` facade; `env_logger` is installed here.

mod init;

pub use init::{DEFAULT_FILTER, LOG_ENV, LoggingConfig, init_logging};
