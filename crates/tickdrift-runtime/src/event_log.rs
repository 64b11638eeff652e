//! Per-machine event log
//!
//! Append-only, one line per clock transition, flushed after every write.
//! The log is owned by its machine; the file is closed when the machine is
//! dropped, whichever way its loop ends.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tickdrift_core::{EventKind, LogRecord, MachineId, SimResult};

/// Records written, by kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub send: u64,
    pub receive: u64,
    pub internal: u64,
}

impl EventCounts {
    pub fn total(&self) -> u64 {
        self.send + self.receive + self.internal
    }

    fn bump(&mut self, kind: EventKind) {
        match kind {
            EventKind::Send => self.send += 1,
            EventKind::Receive => self.receive += 1,
            EventKind::Internal => self.internal += 1,
        }
    }
}

pub struct EventLog {
    writer: Box<dyn Write + Send>,
    path: Option<PathBuf>,
    counts: EventCounts,
}

impl EventLog {
    /// Create (truncating) `machine_<id>.log` inside `dir`
    pub fn create(dir: &Path, id: MachineId) -> SimResult<Self> {
        let path = dir.join(id.log_file_name());
        let file = File::create(&path)?;
        Ok(EventLog {
            writer: Box::new(BufWriter::new(file)),
            path: Some(path),
            counts: EventCounts::default(),
        })
    }

    /// Log into an arbitrary writer
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        EventLog {
            writer: Box::new(writer),
            path: None,
            counts: EventCounts::default(),
        }
    }

    /// Discard all records (counts are still kept)
    pub fn discard() -> Self {
        Self::from_writer(io::sink())
    }

    /// Append one record and flush it
    pub fn record(&mut self, record: &LogRecord) -> SimResult<()> {
        self.writer.write_all(record.to_line().as_bytes())?;
        self.writer.flush()?;
        self.counts.bump(record.kind);
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn counts(&self) -> EventCounts {
        self.counts
    }
}

/// Read back every record of a log file
pub fn read_log(path: &Path) -> SimResult<Vec<LogRecord>> {
    let contents = std::fs::read_to_string(path)?;
    contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(LogRecord::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    /// Writer whose contents stay readable after the log takes ownership
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenDisk;

    impl Write for BrokenDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_one_line_per_record() {
        let buffer = SharedBuffer::default();
        let mut log = EventLog::from_writer(buffer.clone());

        log.record(&LogRecord::new(EventKind::Internal, 1.0, 0, 1)).unwrap();
        log.record(&LogRecord::new(EventKind::Send, 2.5, 1, 2)).unwrap();

        let text = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert_eq!(
            text,
            "INTERNAL, system_time=1.000000, queue_length=0, logical_clock=1\n\
             SEND, system_time=2.500000, queue_length=1, logical_clock=2\n"
        );
        assert_eq!(log.counts(), EventCounts { send: 1, receive: 0, internal: 1 });
    }

    #[test]
    fn test_file_log_is_flushed_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = EventLog::create(dir.path(), MachineId(3)).unwrap();
        let path = log.path().unwrap().to_path_buf();
        assert!(path.ends_with("machine_3.log"));

        log.record(&LogRecord::new(EventKind::Receive, 3.0, 0, 7)).unwrap();

        // Readable before the log is dropped
        let records = read_log(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, EventKind::Receive);
        assert_eq!(records[0].logical_clock, 7);
    }

    #[test]
    fn test_create_truncates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("machine_0.log"), "stale\n").unwrap();
        let log = EventLog::create(dir.path(), MachineId(0)).unwrap();
        drop(log);
        assert!(read_log(&dir.path().join("machine_0.log")).unwrap().is_empty());
    }

    #[test]
    fn test_create_in_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(EventLog::create(&missing, MachineId(0)).is_err());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut log = EventLog::from_writer(BrokenDisk);
        let result = log.record(&LogRecord::new(EventKind::Internal, 1.0, 0, 1));
        assert!(matches!(result, Err(tickdrift_core::SimError::LogIo(_))));
        assert_eq!(log.counts().total(), 0);
    }
}
