//! Logger construction shared by the epoch accounting crates.
//!
//! The accounting core never builds its own logger; callers hand it a `slog::Logger` and these
//! helpers exist for binaries, benches and tests.
use slog::Logger;
use sloggers::{
    null::NullLoggerBuilder,
    terminal::{Destination, TerminalLoggerBuilder},
    types::Severity,
    Build,
};

/// Parses a log level as given on a command line or in a config file.
pub fn parse_severity(level: &str) -> Result<Severity, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Severity::Trace),
        "debug" => Ok(Severity::Debug),
        "info" => Ok(Severity::Info),
        "warn" | "warning" => Ok(Severity::Warning),
        "error" => Ok(Severity::Error),
        "crit" | "critical" => Ok(Severity::Critical),
        other => Err(format!("Unknown log level: {}", other)),
    }
}

/// Builds a logger that writes human-readable records to stderr at `level` and above.
pub fn terminal_logger(level: &str) -> Result<Logger, String> {
    TerminalLoggerBuilder::new()
        .level(parse_severity(level)?)
        .destination(Destination::Stderr)
        .build()
        .map_err(|e| format!("Unable to build terminal logger: {:?}", e))
}

/// Returns a logger for use in tests.
///
/// Output is discarded unless the crate is built with the `test_logger` feature.
pub fn test_logger() -> Logger {
    if cfg!(feature = "test_logger") {
        terminal_logger("debug").expect("Should build test_logger")
    } else {
        NullLoggerBuilder
            .build()
            .expect("Should build null_logger")
    }
}
