//! Bounded, human-readable log of cluster events.
//!
//! This is the operator-facing record shown next to the node and file lists.
//! It keeps only the most recent entries; anything older is evicted. Every
//! entry is mirrored to `tracing` so the same events reach structured logs.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::types::{Severity, Timestamp};

/// Default number of retained entries.
pub const DEFAULT_LOG_CAPACITY: usize = 20;

/// A single event log line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonic entry number, never reused.
    pub id: u64,
    /// Wall-clock time the entry was recorded, `HH:MM:SS`.
    pub timestamp: String,
    /// Human-readable message.
    pub message: String,
    /// Severity of the event.
    pub severity: Severity,
}

/// Ring buffer of the most recent log entries.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_id: u64,
}

impl EventLog {
    /// Creates an empty log retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Appends an entry, evicting the oldest on overflow. Returns its id.
    pub fn push(&mut self, now: Timestamp, message: impl Into<String>, severity: Severity) -> u64 {
        let message = message.into();
        match severity {
            Severity::Info | Severity::Success => info!(target: "nexus::events", "{}", message),
            Severity::Warning => warn!(target: "nexus::events", "{}", message),
            Severity::Error => error!(target: "nexus::events", "{}", message),
        }

        let id = self.next_id;
        self.next_id += 1;

        if self.capacity == 0 {
            return id;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            id,
            timestamp: now.format_hms(),
            message,
            severity,
        });
        id
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Owned copy of the retained entries, oldest first.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained entries with the given severity.
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ts() -> Timestamp {
        Timestamp::from_millis(0)
    }

    #[test]
    fn test_push_and_read() {
        let mut log = EventLog::default();
        log.push(ts(), "first", Severity::Info);
        log.push(ts(), "second", Severity::Error);

        assert_eq!(log.len(), 2);
        let latest = log.latest().expect("latest");
        assert_eq!(latest.message, "second");
        assert_eq!(latest.severity, Severity::Error);
        assert_eq!(latest.timestamp, "00:00:00");
        assert_eq!(log.count_severity(Severity::Info), 1);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut log = EventLog::new(3);
        for i in 0..5 {
            log.push(ts(), format!("msg {}", i), Severity::Info);
        }

        let messages: Vec<_> = log.entries().map(|e| e.message.clone()).collect();
        assert_eq!(messages, vec!["msg 2", "msg 3", "msg 4"]);
        assert_eq!(log.latest().map(|e| e.id), Some(5));
    }

    #[test]
    fn test_zero_capacity_retains_nothing() {
        let mut log = EventLog::new(0);
        let id = log.push(ts(), "dropped", Severity::Warning);
        assert_eq!(id, 1);
        assert!(log.is_empty());
    }

    proptest! {
        #[test]
        fn prop_log_bound_keeps_most_recent(count in 0usize..80) {
            let mut log = EventLog::default();
            for i in 0..count {
                log.push(ts(), format!("{}", i), Severity::Info);
            }

            prop_assert!(log.len() <= DEFAULT_LOG_CAPACITY);
            prop_assert_eq!(log.len(), count.min(DEFAULT_LOG_CAPACITY));

            let expected: Vec<String> = (count.saturating_sub(DEFAULT_LOG_CAPACITY)..count)
                .map(|i| i.to_string())
                .collect();
            let actual: Vec<String> = log.entries().map(|e| e.message.clone()).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
