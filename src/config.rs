use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::record::Level;
use crate::rotation::When;

/// Line template for access-style entries.
pub const ACCESS_FORMAT: &str = "[%D %T] [Access] %M";
/// Default line template: date, time, level, source, message.
pub const OPERATION_FORMAT: &str = "[%D %T] [%L] (%S) %M";
/// Line template rendering the bare message.
pub const MESSAGE_ONLY: &str = "%M";

/// Configuration for a rotating writer.
///
/// Read once at construction and never mutated afterwards; the one-shot
/// first-rollover bit is copied into the worker's private state before it
/// is cleared there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Rotation period selector.
    #[serde(default)]
    pub when: When,
    /// Number of backups kept after pruning; 0 disables pruning.
    #[serde(default = "default_backup_count")]
    pub backup_count: usize,
    /// Force the first rotation check to realign to the interval grid.
    #[serde(default)]
    pub first_rollover: bool,
    /// Suspend producers when the queue is full instead of dropping.
    #[serde(default)]
    pub blocking: bool,
    /// Queue capacity shared by all producers.
    #[serde(default = "default_buffer_length")]
    pub buffer_length: usize,
    /// Path of the active log file; backups live next to it.
    pub prefix_name: PathBuf,
    /// Line template (see the `%` directives in [`crate::format`]).
    #[serde(default = "default_format")]
    pub format: String,
    /// Minimum severity accepted by the leveled API.
    #[serde(default = "default_level")]
    pub level: Level,
}

impl LogConfig {
    /// Create a configuration for the given active-file path with default
    /// settings: daily rotation, seven backups, non-blocking writes.
    pub fn new<P: Into<PathBuf>>(prefix_name: P) -> Self {
        Self {
            when: When::default(),
            backup_count: default_backup_count(),
            first_rollover: false,
            blocking: false,
            buffer_length: default_buffer_length(),
            prefix_name: prefix_name.into(),
            format: default_format(),
            level: default_level(),
        }
    }

    /// Set the rotation period.
    pub fn with_when(mut self, when: When) -> Self {
        self.when = when;
        self
    }

    /// Set the retention count.
    pub fn with_backup_count(mut self, backup_count: usize) -> Self {
        self.backup_count = backup_count;
        self
    }

    /// Force an interval-grid realignment on the first rotation check.
    pub fn with_first_rollover(mut self, first_rollover: bool) -> Self {
        self.first_rollover = first_rollover;
        self
    }

    /// Choose backpressure over dropping when the queue is full.
    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Set the queue capacity.
    pub fn with_buffer_length(mut self, buffer_length: usize) -> Self {
        self.buffer_length = buffer_length;
        self
    }

    /// Set the line template.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the minimum severity.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("app.log")
    }
}

fn default_backup_count() -> usize {
    7
}

fn default_buffer_length() -> usize {
    10240
}

fn default_format() -> String {
    OPERATION_FORMAT.to_string()
}

fn default_level() -> Level {
    Level::Info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_new() {
        let config = LogConfig::new("test.log");
        assert_eq!(config.when, When::Day);
        assert_eq!(config.backup_count, 7);
        assert!(!config.first_rollover);
        assert!(!config.blocking);
        assert_eq!(config.buffer_length, 10240);
        assert_eq!(config.prefix_name, PathBuf::from("test.log"));
        assert_eq!(config.format, OPERATION_FORMAT);
        assert_eq!(config.level, Level::Info);
    }

    #[test]
    fn test_log_config_chaining() {
        let config = LogConfig::new("op.log")
            .with_when(When::Hour)
            .with_backup_count(72)
            .with_first_rollover(true)
            .with_blocking(true)
            .with_buffer_length(64)
            .with_format(ACCESS_FORMAT)
            .with_level(Level::Warn);

        assert_eq!(config.when, When::Hour);
        assert_eq!(config.backup_count, 72);
        assert!(config.first_rollover);
        assert!(config.blocking);
        assert_eq!(config.buffer_length, 64);
        assert_eq!(config.format, ACCESS_FORMAT);
        assert_eq!(config.level, Level::Warn);
    }

    #[test]
    fn test_log_config_deserialize() {
        let yaml = r#"
when: hour
backup_count: 72
first_rollover: true
buffer_length: 10240
prefix_name: op.log
level: info
"#;
        let config: LogConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.when, When::Hour);
        assert_eq!(config.backup_count, 72);
        assert!(config.first_rollover);
        assert!(!config.blocking);
        assert_eq!(config.prefix_name, PathBuf::from("op.log"));
        assert_eq!(config.format, OPERATION_FORMAT);
    }

    #[test]
    fn test_log_config_deserialize_minimal() {
        let config: LogConfig = serde_yaml::from_str("prefix_name: app.log").unwrap();
        assert_eq!(config.when, When::Day);
        assert_eq!(config.backup_count, 7);
        assert_eq!(config.level, Level::Info);
    }

    #[test]
    fn test_log_config_deserialize_unknown_when_degrades() {
        let yaml = "prefix_name: app.log\nwhen: weekly\n";
        let config: LogConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.when, When::Day);
    }
}
