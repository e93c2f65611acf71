//! # Rotolog
//!
//! An asynchronous, time-rotating log file writer.
//!
//! Producer threads hand [`Record`]s to a [`RotatingWriter`] through a
//! bounded queue; a single background thread renders them to text,
//! appends to the active file and transparently rotates it on a
//! configurable time boundary (minute, hour, day or midnight). Rotated
//! files are renamed with a timestamp suffix and the oldest backups
//! beyond the retention count are pruned.
//!
//! ## Features
//!
//! - Fire-and-forget writes: full queues either drop (with a diagnostic)
//!   or apply backpressure, by configuration
//! - Deterministic midnight rotation at a fixed reference offset
//! - Idempotent backups and retention pruning of the oldest excess
//! - A leveled convenience API ([`Logger`]) over any [`RecordSink`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use rotolog::{Level, LogConfig, Logger, When};
//!
//! let config = LogConfig::new("op.log")
//!     .with_when(When::Hour)
//!     .with_backup_count(72)
//!     .with_level(Level::Info);
//!
//! let logger = Logger::new(config)?;
//! logger.info("service started");
//! logger.close();
//! # Ok::<(), rotolog::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod logger;
pub mod record;
mod retention;
pub mod rotation;
pub mod writer;

pub use config::{ACCESS_FORMAT, LogConfig, MESSAGE_ONLY, OPERATION_FORMAT};
pub use error::{Error, Result};
pub use format::FormatCache;
pub use logger::Logger;
pub use record::{Level, Record};
pub use rotation::When;
pub use writer::{RecordSink, RotatingWriter};
