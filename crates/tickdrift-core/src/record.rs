//! Event log records
//!
//! One line per state-changing event:
//! `<KIND>, system_time=<secs, 6 decimals>, queue_length=<n>, logical_clock=<n>`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{SimError, SimResult};

/// Kind of a logged event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Send,
    Receive,
    Internal,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Send => "SEND",
            EventKind::Receive => "RECEIVE",
            EventKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEND" => Ok(EventKind::Send),
            "RECEIVE" => Ok(EventKind::Receive),
            "INTERNAL" => Ok(EventKind::Internal),
            other => Err(SimError::UnknownEventType(other.to_string())),
        }
    }
}

/// A single event log entry, carrying the post-update clock value
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub kind: EventKind,
    pub system_time: f64,
    pub queue_length: u64,
    pub logical_clock: u64,
}

impl LogRecord {
    pub fn new(kind: EventKind, system_time: f64, queue_length: u64, logical_clock: u64) -> Self {
        LogRecord {
            kind,
            system_time,
            queue_length,
            logical_clock,
        }
    }

    /// Render as a newline-terminated log line
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }

    /// Parse a line produced by `to_line` (trailing newline optional)
    pub fn parse(line: &str) -> SimResult<Self> {
        let line = line.trim_end_matches(&['\n', '\r'][..]);
        let mut parts = line.split(", ");

        let kind = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SimError::InvalidRecord("empty line".into()))?
            .parse::<EventKind>()?;

        let system_time = field(parts.next(), "system_time")?
            .parse::<f64>()
            .map_err(|e| SimError::InvalidRecord(format!("system_time: {}", e)))?;
        let queue_length = field(parts.next(), "queue_length")?
            .parse::<u64>()
            .map_err(|e| SimError::InvalidRecord(format!("queue_length: {}", e)))?;
        let logical_clock = field(parts.next(), "logical_clock")?
            .parse::<u64>()
            .map_err(|e| SimError::InvalidRecord(format!("logical_clock: {}", e)))?;

        if let Some(extra) = parts.next() {
            return Err(SimError::InvalidRecord(format!("unexpected field: {}", extra)));
        }

        Ok(LogRecord::new(kind, system_time, queue_length, logical_clock))
    }
}

fn field<'a>(part: Option<&'a str>, name: &str) -> SimResult<&'a str> {
    let part = part.ok_or_else(|| SimError::InvalidRecord(format!("missing {}", name)))?;
    part.strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or_else(|| SimError::InvalidRecord(format!("expected {}=, got {:?}", name, part)))
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, system_time={:.6}, queue_length={}, logical_clock={}",
            self.kind, self.system_time, self.queue_length, self.logical_clock
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let record = LogRecord::new(EventKind::Receive, 1700000000.5, 3, 11);
        assert_eq!(
            record.to_line(),
            "RECEIVE, system_time=1700000000.500000, queue_length=3, logical_clock=11\n"
        );
    }

    #[test]
    fn test_six_decimals_rounding() {
        let record = LogRecord::new(EventKind::Internal, 12.3456789, 0, 1);
        assert!(record.to_string().contains("system_time=12.345679,"));
    }

    #[test]
    fn test_parse_line() {
        let record =
            LogRecord::parse("SEND, system_time=1.250000, queue_length=0, logical_clock=6\n")
                .unwrap();
        assert_eq!(record.kind, EventKind::Send);
        assert_eq!(record.system_time, 1.25);
        assert_eq!(record.queue_length, 0);
        assert_eq!(record.logical_clock, 6);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(LogRecord::parse("").is_err());
        assert!(LogRecord::parse("SEND, system_time=1.0, queue_length=0").is_err());
        assert!(LogRecord::parse("SEND, system_time=x, queue_length=0, logical_clock=1").is_err());
        assert!(
            LogRecord::parse("FOO, system_time=1.0, queue_length=0, logical_clock=1").is_err()
        );
        assert!(LogRecord::parse(
            "SEND, system_time=1.0, queue_length=0, logical_clock=1, extra=2"
        )
        .is_err());
        assert!(
            LogRecord::parse("SEND, time=1.0, queue_length=0, logical_clock=1").is_err()
        );
    }
}
