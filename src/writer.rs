use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use regex::Regex;
use time::OffsetDateTime;

use crate::config::LogConfig;
use crate::error::{Error, Result};
use crate::format::FormatCache;
use crate::record::Record;
use crate::retention;
use crate::rotation::{self, REFERENCE_OFFSET, When};

/// A sink for log records.
///
/// Implemented by [`RotatingWriter`] and substitutable by in-memory
/// doubles in tests. Both operations are fire-and-forget from the
/// producer's point of view: failures surface only on the diagnostic
/// side-channel, never as return values.
pub trait RecordSink {
    /// Hand one record to the sink. In non-blocking mode a full queue
    /// drops the record; in blocking mode the caller suspends until space
    /// frees.
    fn write(&self, record: Record);

    /// Drain queued records, flush to stable storage and stop the sink.
    /// Blocks until the background worker has acknowledged shutdown. Call
    /// exactly once; writing after close is unsupported.
    fn close(&self);
}

enum Message {
    Record(Record),
    Shutdown,
}

/// Asynchronous time-rotating file writer.
///
/// Producers enqueue records through a bounded channel; a single
/// background thread renders them in FIFO order, appends to the active
/// file and rotates it when the rollover instant passes: the old file is
/// renamed with a timestamp suffix and the oldest backups beyond the
/// retention count are deleted.
///
/// The worker thread is spawned at construction and joined during
/// [`RecordSink::close`]. A fatal rotation or write failure stops the
/// worker silently; nothing drains the queue afterwards, so a supervisor
/// that cares about liveness must recreate the writer.
pub struct RotatingWriter {
    tx: Sender<Message>,
    done_rx: Receiver<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
    blocking: bool,
    capacity: usize,
}

impl RotatingWriter {
    /// Open the active file, spawn the consumer thread and return the
    /// producer handle.
    pub fn new(config: LogConfig) -> Result<Self> {
        let (tx, rx) = bounded(config.buffer_length);
        let (done_tx, done_rx) = bounded(1);
        let blocking = config.blocking;
        let capacity = config.buffer_length;

        let worker = Worker::new(config, rx, done_tx)?;
        let handle = thread::Builder::new()
            .name("rotolog-writer".into())
            .spawn(move || worker.run())?;

        Ok(Self {
            tx,
            done_rx,
            handle: Mutex::new(Some(handle)),
            blocking,
            capacity,
        })
    }
}

impl RecordSink for RotatingWriter {
    fn write(&self, record: Record) {
        if !self.blocking && self.tx.len() >= self.capacity {
            // The length check and the send are two separate steps, so
            // racing producers can briefly exceed the capacity: the bound
            // is soft, not hard.
            tracing::warn!(capacity = self.capacity, "log buffer overflow, record dropped");
            return;
        }
        let _ = self.tx.send(Message::Record(record));
    }

    fn close(&self) {
        let _ = self.tx.send(Message::Shutdown);
        // Rendezvous with the worker; recv also returns once the worker
        // is gone for any reason.
        let _ = self.done_rx.recv();
        if let Ok(mut guard) = self.handle.lock()
            && let Some(handle) = guard.take()
        {
            let _ = handle.join();
        }
    }
}

/// State owned by the consumer thread. The active file handle never
/// leaves this struct, so no concurrent write to it is possible.
struct Worker {
    rx: Receiver<Message>,
    done_tx: Sender<()>,
    prefix: PathBuf,
    template: String,
    when: When,
    backup_count: usize,
    first_rollover: bool,
    interval: i64,
    rollover_at: i64,
    pattern: &'static Regex,
    cache: FormatCache,
    file: Option<File>,
}

impl Worker {
    fn new(config: LogConfig, rx: Receiver<Message>, done_tx: Sender<()>) -> Result<Self> {
        if let Some(parent) = config.prefix_name.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let interval = config.when.interval();

        // Align to the age of a pre-existing active file, else to now. A
        // stale file trips the rotation check in `rotate` below and is
        // backed up immediately; the real schedule is then recomputed
        // from the current time.
        let anchor = fs::metadata(&config.prefix_name)
            .and_then(|meta| meta.modified())
            .map(OffsetDateTime::from)
            .unwrap_or_else(|_| OffsetDateTime::now_utc());
        let rollover_at = rotation::next_boundary(anchor.unix_timestamp(), interval);

        let mut worker = Self {
            rx,
            done_tx,
            prefix: config.prefix_name,
            template: config.format,
            when: config.when,
            backup_count: config.backup_count,
            first_rollover: config.first_rollover,
            interval,
            rollover_at,
            pattern: config.when.pattern(),
            cache: FormatCache::new(),
            file: None,
        };
        worker.rotate()?;
        Ok(worker)
    }

    /// Consume until the shutdown sentinel or a fatal error. This thread
    /// is the only writer of the active file.
    fn run(mut self) {
        loop {
            match self.rx.recv() {
                Ok(Message::Record(record)) => {
                    if OffsetDateTime::now_utc().unix_timestamp() >= self.rollover_at {
                        if let Err(err) = self.rotate() {
                            tracing::error!(%err, "rotation failed, log worker stopped");
                            return;
                        }
                    }
                    if let Err(err) = self.append(&record) {
                        tracing::error!(%err, "log write failed, log worker stopped");
                        return;
                    }
                }
                Ok(Message::Shutdown) => {
                    self.sync();
                    let _ = self.done_tx.send(());
                    return;
                }
                // Every producer handle was dropped without a close.
                Err(_) => {
                    self.sync();
                    return;
                }
            }
        }
    }

    fn append(&mut self, record: &Record) -> Result<()> {
        let line = self.cache.render(&self.template, record);
        let Some(file) = self.file.as_mut() else {
            return Err(Error::Write(std::io::Error::other(
                "active log file is not open",
            )));
        };
        file.write_all(line.as_bytes()).map_err(Error::Write)
    }

    fn sync(&self) {
        if let Some(file) = self.file.as_ref() {
            let _ = file.sync_all();
        }
    }

    /// Close the active file, back it up if its rollover instant has
    /// passed, prune excess backups, reopen and schedule the next
    /// rollover.
    fn rotate(&mut self) -> Result<()> {
        self.file = None;

        let now = OffsetDateTime::now_utc();
        if now.unix_timestamp() >= self.rollover_at {
            self.backup()?;
        }

        if self.backup_count > 0 {
            for stale in retention::stale_backups(&self.prefix, self.pattern, self.backup_count) {
                let _ = fs::remove_file(stale);
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.prefix)
            .map_err(Error::Rotation)?;
        self.file = Some(file);

        // Collapse any boundaries missed during a stall into this single
        // rotation.
        let mut next = self.next_rollover(now);
        while next <= now.unix_timestamp() {
            next += self.interval;
        }
        self.rollover_at = next;

        Ok(())
    }

    /// Next rollover instant. The one-shot first-rollover override pins
    /// the first result to the plain interval grid and is never
    /// re-armed.
    fn next_rollover(&mut self, now: OffsetDateTime) -> i64 {
        if self.first_rollover {
            self.first_rollover = false;
            return rotation::next_boundary(now.unix_timestamp(), self.interval);
        }
        self.when.next_rollover(now)
    }

    /// Rename the active file to its timestamped backup name. A missing
    /// active file and an already-existing backup are both no-ops, so
    /// repeating a rotation never overwrites an earlier backup.
    fn backup(&self) -> Result<()> {
        if !self.prefix.exists() {
            return Ok(());
        }

        let stamp = OffsetDateTime::from_unix_timestamp(self.rollover_at - self.interval)
            .map_err(|err| Error::Time(err.into()))?
            .to_offset(REFERENCE_OFFSET);
        let suffix = stamp
            .format(self.when.suffix())
            .map_err(|err| Error::Time(err.into()))?;
        let target = PathBuf::from(format!("{}.{}", self.prefix.display(), suffix));

        if target.exists() {
            return Ok(());
        }
        fs::rename(&self.prefix, &target).map_err(Error::Rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;
    use time::macros::datetime;

    fn worker_for(config: LogConfig) -> Worker {
        let (_tx, rx) = bounded(1);
        let (done_tx, _done_rx) = bounded(1);
        Worker::new(config, rx, done_tx).expect("worker")
    }

    #[test]
    fn test_construction_creates_active_file() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("app.log");
        let _worker = worker_for(LogConfig::new(&prefix));
        assert!(prefix.exists());
    }

    #[test]
    fn test_initial_rollover_is_aligned_and_future() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker_for(LogConfig::new(dir.path().join("app.log")).with_when(When::Hour));
        let now = OffsetDateTime::now_utc().unix_timestamp();
        assert!(worker.rollover_at > now);
        assert_eq!(worker.rollover_at % 3600, 0);
    }

    #[test]
    fn test_midnight_initial_rollover_is_reference_day_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let worker =
            worker_for(LogConfig::new(dir.path().join("app.log")).with_when(When::Midnight));
        // A +08:00 day boundary, which is 16:00 on the UTC grid.
        assert_eq!((worker.rollover_at + 8 * 3600) % 86400, 0);
        assert!(worker.rollover_at > OffsetDateTime::now_utc().unix_timestamp());
    }

    #[test]
    fn test_first_rollover_is_one_shot() {
        let dir = tempfile::tempdir().unwrap();
        let mut worker = worker_for(
            LogConfig::new(dir.path().join("app.log"))
                .with_when(When::Midnight)
                .with_first_rollover(true),
        );
        // The construction-time rotation consumed the override: the
        // schedule sits on the plain interval grid, not the +08:00 day
        // boundary.
        assert!(!worker.first_rollover);
        assert_eq!(worker.rollover_at % 86400, 0);

        // From now on the calendar-day computation applies.
        let now = datetime!(2024-06-01 10:00:00 +8);
        assert_eq!(
            worker.next_rollover(now),
            datetime!(2024-06-02 00:00:00 +8).unix_timestamp()
        );
    }

    #[test]
    fn test_stale_preexisting_file_is_backed_up_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("app.log");
        fs::write(&prefix, "from a past interval\n").unwrap();
        let old = std::time::SystemTime::now() - std::time::Duration::from_secs(2 * 3600);
        let file = File::options().append(true).open(&prefix).unwrap();
        file.set_modified(old).unwrap();
        drop(file);

        let _worker = worker_for(LogConfig::new(&prefix).with_when(When::Hour));

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| {
                name.strip_prefix("app.log.")
                    .is_some_and(|s| When::Hour.pattern().is_match(s))
            })
            .collect();
        assert_eq!(backups.len(), 1, "{backups:?}");
        // The fresh active file starts empty again.
        assert_eq!(fs::read_to_string(&prefix).unwrap(), "");
    }

    #[test]
    fn test_hourly_rotation_prunes_oldest_backups() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("app.log");
        fs::write(dir.path().join("app.log.2024010100"), "old\n").unwrap();
        fs::write(dir.path().join("app.log.2024010101"), "old\n").unwrap();

        let mut worker = worker_for(
            LogConfig::new(&prefix)
                .with_when(When::Hour)
                .with_backup_count(2),
        );
        fs::write(&prefix, "active\n").unwrap();

        // Pretend the 03:00 boundary passed while 02:00's file is active.
        worker.rollover_at = datetime!(2024-01-01 03:00:00 +8).unix_timestamp();
        worker.rotate().unwrap();

        assert!(!dir.path().join("app.log.2024010100").exists());
        assert!(dir.path().join("app.log.2024010101").exists());
        let rotated = dir.path().join("app.log.2024010102");
        assert_eq!(fs::read_to_string(&rotated).unwrap(), "active\n");
        assert!(prefix.exists());
    }

    #[test]
    fn test_backup_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("app.log");
        let mut worker = worker_for(
            LogConfig::new(&prefix)
                .with_when(When::Hour)
                .with_backup_count(0),
        );

        worker.rollover_at = datetime!(2024-01-01 03:00:00 +8).unix_timestamp();
        let target = dir.path().join("app.log.2024010102");
        fs::write(&target, "earlier rotation\n").unwrap();
        fs::write(&prefix, "current\n").unwrap();

        worker.backup().unwrap();

        // The existing backup was not overwritten and the active file was
        // left in place.
        assert_eq!(fs::read_to_string(&target).unwrap(), "earlier rotation\n");
        assert_eq!(fs::read_to_string(&prefix).unwrap(), "current\n");
    }

    #[test]
    fn test_missed_boundaries_collapse_into_one_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let mut worker = worker_for(
            LogConfig::new(dir.path().join("app.log"))
                .with_when(When::Hour)
                .with_backup_count(0),
        );

        // Several boundaries behind, as after a long process suspension.
        worker.rollover_at = datetime!(2024-01-01 03:00:00 +8).unix_timestamp();
        worker.rotate().unwrap();

        let now = OffsetDateTime::now_utc().unix_timestamp();
        assert!(worker.rollover_at > now);
        assert!(worker.rollover_at <= now + 3600);
        assert_eq!(worker.rollover_at % 3600, 0);
    }

    #[test]
    fn test_zero_backup_count_leaves_backups_alone() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("app.log");
        for suffix in ["2024010100", "2024010101", "2024010102"] {
            fs::write(dir.path().join(format!("app.log.{suffix}")), "old\n").unwrap();
        }

        let mut worker = worker_for(
            LogConfig::new(&prefix)
                .with_when(When::Hour)
                .with_backup_count(0),
        );
        worker.rollover_at = datetime!(2024-01-01 04:00:00 +8).unix_timestamp();
        worker.rotate().unwrap();

        for suffix in ["2024010100", "2024010101", "2024010102"] {
            assert!(dir.path().join(format!("app.log.{suffix}")).exists());
        }
    }

    #[test]
    fn test_non_blocking_overflow_drops_excess_records() {
        let (tx, rx) = bounded(2);
        let (_done_tx, done_rx) = bounded(1);
        let writer = RotatingWriter {
            tx,
            done_rx,
            handle: Mutex::new(None),
            blocking: false,
            capacity: 2,
        };

        for i in 0..3 {
            writer.write(Record::new(Level::Info, format!("m{i}")));
        }

        // The third record was dropped; the first two survive in order.
        assert_eq!(rx.len(), 2);
        for expected in ["m0", "m1"] {
            match rx.recv().unwrap() {
                Message::Record(record) => assert_eq!(record.message, expected),
                Message::Shutdown => panic!("unexpected sentinel"),
            }
        }
    }

    #[test]
    fn test_writer_roundtrip_through_public_api() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("app.log");
        let writer = RotatingWriter::new(
            LogConfig::new(&prefix).with_format(crate::config::MESSAGE_ONLY),
        )
        .unwrap();

        for i in 0..5 {
            writer.write(Record::new(Level::Info, format!("line {i}")));
        }
        writer.close();

        let content = fs::read_to_string(&prefix).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, ["line 0", "line 1", "line 2", "line 3", "line 4"]);
    }
}
