use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::rotation::REFERENCE_OFFSET;

/// Severity of a log record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Verbose diagnostics.
    Debug,
    /// Routine events.
    Info,
    /// Something unexpected but recoverable.
    Warn,
    /// An operation failed.
    Error,
    /// The process cannot continue. The core never acts on this level
    /// itself; reacting to it is the caller's decision.
    Fatal,
}

impl Level {
    /// Tag rendered by the `%L` format directive.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Debug => "DEBG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "EROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One log event.
///
/// Immutable once constructed; ownership moves to the writer when the
/// record is enqueued, so nothing else can observe it afterwards.
#[derive(Debug, Clone)]
pub struct Record {
    /// Severity of the event.
    pub level: Level,
    /// Creation timestamp.
    pub created: OffsetDateTime,
    /// Source location, `file:line`.
    pub source: String,
    /// Message text.
    pub message: String,
}

impl Record {
    /// Build a record stamped with the current time (at the reference
    /// offset) and the caller's `file:line` location.
    #[track_caller]
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        let caller = std::panic::Location::caller();
        let file = caller.file().rsplit('/').next().unwrap_or("");
        Self {
            level,
            created: OffsetDateTime::now_utc().to_offset(REFERENCE_OFFSET),
            source: format!("{}:{}", file, caller.line()),
            message: message.into(),
        }
    }
}
