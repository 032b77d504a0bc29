//! Core types for container log processing.
//!
//! This module provides:
//! - [`LogLevel`] - Severity detected from a log line
//! - [`StreamKind`] - Which output stream a line came from
//! - [`LogEntry`] - A classified log line
//! - [`LogChunk`] - A raw frame from the engine's log source
//! - [`LogBatch`] - Result of a snapshot read
//! - [`LogOptions`] - What to read from the engine

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};

/// Severity detected from a log line.
///
/// `Unknown` is the result when no pattern matches, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Fine-grained tracing output
    Trace,
    /// Debugging information
    Debug,
    /// General information
    Info,
    /// Warning conditions
    Warn,
    /// Warning conditions, long spelling
    Warning,
    /// Error conditions
    Error,
    /// Unrecoverable conditions
    Fatal,
    /// Panics and emergencies
    Panic,
    /// No level could be detected
    #[default]
    Unknown,
}

impl LogLevel {
    /// All levels, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Warning,
        Self::Error,
        Self::Fatal,
        Self::Panic,
        Self::Unknown,
    ];

    /// Returns the wire representation of this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Panic => "PANIC",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LogError::invalid_option("level", format!("unknown level {s:?}")))
    }
}

/// Output stream a log line was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Standard output
    #[default]
    Stdout,
    /// Standard error
    Stderr,
}

impl StreamKind {
    /// Returns the wire representation of this stream.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp found at the start of the line, normalized to UTC
    pub timestamp: Option<DateTime<Utc>>,
    /// Detected severity
    pub level: LogLevel,
    /// Line with the timestamp prefix and ANSI escapes removed
    pub message: String,
    /// Stream the line was written to
    pub stream: StreamKind,
    /// The untouched input line
    pub raw: String,
}

/// One demultiplexed frame from an engine log source.
///
/// A frame may hold part of a line or several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    /// Stream the frame belongs to
    pub stream: StreamKind,
    /// Frame payload
    pub data: Bytes,
}

impl LogChunk {
    /// Creates a stdout frame.
    #[must_use]
    pub fn stdout(data: impl Into<Bytes>) -> Self {
        Self {
            stream: StreamKind::Stdout,
            data: data.into(),
        }
    }

    /// Creates a stderr frame.
    #[must_use]
    pub fn stderr(data: impl Into<Bytes>) -> Self {
        Self {
            stream: StreamKind::Stderr,
            data: data.into(),
        }
    }
}

/// Ordered result of a snapshot read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBatch {
    /// Entries in source order
    pub logs: Vec<LogEntry>,
    /// Number of entries
    pub count: usize,
}

impl From<Vec<LogEntry>> for LogBatch {
    fn from(logs: Vec<LogEntry>) -> Self {
        let count = logs.len();
        Self { logs, count }
    }
}

/// Default number of trailing lines to read.
pub const DEFAULT_TAIL: &str = "100";

/// Options for reading container logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOptions {
    /// Keep the stream open for new output
    pub follow: bool,
    /// Ask the engine to prefix lines with its own timestamps
    pub timestamps: bool,
    /// Lower bound of the time range, forwarded to the engine
    pub since: Option<String>,
    /// Upper bound of the time range, forwarded to the engine
    pub until: Option<String>,
    /// Number of trailing lines, or `all`
    pub tail: String,
    /// Include extra engine attributes
    pub details: bool,
    /// Include standard output
    pub show_stdout: bool,
    /// Include standard error
    pub show_stderr: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            follow: false,
            timestamps: true,
            since: None,
            until: None,
            tail: DEFAULT_TAIL.to_string(),
            details: false,
            show_stdout: true,
            show_stderr: true,
        }
    }
}

impl LogOptions {
    /// Builds options from query parameters.
    ///
    /// Recognized keys are `follow`, `timestamps`, `since`, `until`, `tail`,
    /// `details`, `stdout` and `stderr`. Unknown keys and empty values are
    /// ignored. A boolean value that does not parse is read as `false`.
    pub fn from_params<I, K, V>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in params {
            let value = value.as_ref();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "follow" => options.follow = parse_flag(value),
                "timestamps" => options.timestamps = parse_flag(value),
                "details" => options.details = parse_flag(value),
                "stdout" => options.show_stdout = parse_flag(value),
                "stderr" => options.show_stderr = parse_flag(value),
                "since" => options.since = Some(value.to_string()),
                "until" => options.until = Some(value.to_string()),
                "tail" => options.tail = value.to_string(),
                _ => {}
            }
        }
        options.validate()?;
        Ok(options)
    }

    /// Checks that the options can be sent to an engine.
    pub fn validate(&self) -> Result<()> {
        if self.tail != "all" && self.tail.parse::<u64>().is_err() {
            return Err(LogError::invalid_option(
                "tail",
                format!("expected a number or \"all\", got {:?}", self.tail),
            ));
        }
        Ok(())
    }

    /// Returns the tail as a line count, `None` meaning all lines.
    #[must_use]
    pub fn tail_lines(&self) -> Option<usize> {
        self.tail.parse().ok()
    }

    /// Returns true if the given stream is selected.
    #[must_use]
    pub const fn shows(&self, stream: StreamKind) -> bool {
        match stream {
            StreamKind::Stdout => self.show_stdout,
            StreamKind::Stderr => self.show_stderr,
        }
    }

    /// Sets follow mode.
    #[must_use]
    pub const fn with_follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    /// Sets the tail.
    #[must_use]
    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = tail.into();
        self
    }

    /// Selects which streams to read.
    #[must_use]
    pub const fn with_streams(mut self, stdout: bool, stderr: bool) -> Self {
        self.show_stdout = stdout;
        self.show_stderr = stderr;
        self
    }
}

/// Boolean query values use the conventional spellings.
fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "TRUE" | "true" | "True")
}
