//! Statement logging.
//!
//! Every execution reports a [`QueryEvent`] to the configured
//! [`QueryLogger`], whether it succeeded or not. The default
//! [`TracingLogger`] emits `tracing` events:
//!
//! | Outcome | Level |
//! |---------|-------|
//! | failed | `error` |
//! | slower than the threshold | `warn` |
//! | otherwise | `debug` |

use std::time::Duration;

use crate::config::LoggingConfig;
use crate::error::DataError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Execute,
    Query,
    Begin,
    Commit,
    Rollback,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Execute => "execute",
            Operation::Query => "query",
            Operation::Begin => "begin",
            Operation::Commit => "commit",
            Operation::Rollback => "rollback",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct QueryEvent<'a> {
    pub operation: Operation,
    pub sql: &'a str,
    pub args: &'a [Value],
    pub duration: Duration,
    pub error: Option<&'a DataError>,
}

pub trait QueryLogger: Send + Sync + 'static {
    fn log(&self, event: &QueryEvent<'_>);
}

/// Default slow-statement threshold.
pub const DEFAULT_SLOW_QUERY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct TracingLogger {
    slow_threshold: Duration,
    log_args: bool,
    label: Option<String>,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self {
            slow_threshold: DEFAULT_SLOW_QUERY,
            log_args: true,
            label: None,
        }
    }
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            slow_threshold: Duration::from_millis(config.slow_query_ms),
            log_args: config.log_args,
            label: config.label.clone(),
        }
    }

    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Omit bound arguments from log events.
    pub fn hide_args(mut self) -> Self {
        self.log_args = false;
        self
    }

    /// Label attached to every event, e.g. the database name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl QueryLogger for TracingLogger {
    fn log(&self, event: &QueryEvent<'_>) {
        let label = self.label.as_deref().unwrap_or("");
        let duration_ms = event.duration.as_millis() as u64;
        let args = if self.log_args {
            format!("{:?}", event.args)
        } else {
            String::from("[hidden]")
        };
        match event.error {
            Some(err) => tracing::error!(
                operation = %event.operation,
                sql = event.sql,
                args = %args,
                duration_ms,
                label,
                error = %err,
                "Database operation failed"
            ),
            None if event.duration >= self.slow_threshold => tracing::warn!(
                operation = %event.operation,
                sql = event.sql,
                args = %args,
                duration_ms,
                label,
                "Slow query detected"
            ),
            None => tracing::debug!(
                operation = %event.operation,
                sql = event.sql,
                args = %args,
                duration_ms,
                label,
                "Database operation"
            ),
        }
    }
}

/// Logger that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl QueryLogger for NoopLogger {
    fn log(&self, _event: &QueryEvent<'_>) {}
}
