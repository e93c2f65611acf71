use crate::config::LogConfig;
use crate::error::Result;
use crate::record::{Level, Record};
use crate::writer::{RecordSink, RotatingWriter};

/// Leveled front end over a record sink.
///
/// Drops records below the minimum severity before they ever reach the
/// sink and stamps each accepted one with the caller's `file:line`
/// location.
pub struct Logger {
    level: Level,
    sink: Box<dyn RecordSink + Send + Sync>,
}

impl Logger {
    /// Build a logger backed by a rotating file writer.
    pub fn new(config: LogConfig) -> Result<Self> {
        let level = config.level;
        let sink = RotatingWriter::new(config)?;
        Ok(Self {
            level,
            sink: Box::new(sink),
        })
    }

    /// Build a logger over an arbitrary sink, e.g. an in-memory double.
    pub fn with_sink(level: Level, sink: impl RecordSink + Send + Sync + 'static) -> Self {
        Self {
            level,
            sink: Box::new(sink),
        }
    }

    /// Record a message at the given level, if it passes the minimum.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>) {
        if level < self.level {
            return;
        }
        self.sink.write(Record::new(level, message));
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    /// Drain and stop the underlying sink. Call exactly once, after the
    /// last write.
    pub fn close(&self) {
        self.sink.close();
    }
}
