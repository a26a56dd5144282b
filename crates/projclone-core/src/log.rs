use std::fmt;
use tracing::{error, info, warn};

/// Severity attached to every line handed to a [`LogSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Normal,
    Info,
    Warning,
    Error,
    Success,
    Skipped,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
            LogLevel::Skipped => "skipped",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver for the operator-facing log lines produced during a clone.
///
/// Lines arrive synchronously and in traversal order. Any
/// `Fn(&str, LogLevel)` closure can be used as a sink.
pub trait LogSink {
    fn emit(&self, message: &str, level: LogLevel);
}

impl<F> LogSink for F
where
    F: Fn(&str, LogLevel),
{
    fn emit(&self, message: &str, level: LogLevel) {
        self(message, level)
    }
}

/// Forwards sink lines to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, message: &str, level: LogLevel) {
        match level {
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
            LogLevel::Normal => info!("{}", message),
            other => info!(kind = %other, "{}", message),
        }
    }
}
