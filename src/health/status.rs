//! Status history shared between the lifecycle controller and the health endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Recorded when the reporter is created.
pub const STARTING: &str = "starting";
/// Recorded once the listener is bound and serving.
pub const ACCEPTING_REQUESTS: &str = "accepting requests";
/// Recorded when the interrupt signal starts the drain.
pub const SHUTTING_DOWN: &str = "shutting down";

/// Default number of entries kept before the oldest are dropped.
pub const DEFAULT_CAPACITY: usize = 256;

/// One timestamped state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug)]
struct History {
    entries: VecDeque<StatusEntry>,
    capacity: usize,
}

/// Append-only, bounded status history.
///
/// Cloning is cheap and every clone shares the same history.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    inner: Arc<Mutex<History>>,
}

impl StatusReporter {
    /// Create a reporter holding the initial "starting" entry.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a reporter that keeps at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let reporter = Self {
            inner: Arc::new(Mutex::new(History {
                entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
                capacity,
            })),
        };
        reporter.report(STARTING);
        reporter
    }

    /// Append a new entry stamped with the current time.
    pub fn report(&self, message: impl Into<String>) {
        let message = message.into();
        let mut history = self.lock();

        let now = Utc::now();
        let timestamp = match history.entries.back() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        if history.entries.len() == history.capacity {
            history.entries.pop_front();
        }
        history.entries.push_back(StatusEntry {
            timestamp,
            message: message.clone(),
        });
        drop(history);

        tracing::info!(status = %message, "Status updated");
    }

    /// Copy of the full history, oldest first.
    pub fn snapshot(&self) -> Vec<StatusEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<StatusEntry> {
        self.lock().entries.back().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        // Entries are pushed whole, so a poisoned guard still holds a consistent ring.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_starting_entry() {
        let status = StatusReporter::new();
        let entries = status.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, STARTING);
    }

    #[test]
    fn keeps_report_order() {
        let status = StatusReporter::new();
        status.report(ACCEPTING_REQUESTS);
        status.report(SHUTTING_DOWN);

        let messages: Vec<_> = status.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec![STARTING, ACCEPTING_REQUESTS, SHUTTING_DOWN]);
        assert_eq!(status.latest().unwrap().message, SHUTTING_DOWN);
    }

    #[test]
    fn drops_oldest_when_full() {
        let status = StatusReporter::with_capacity(3);
        for i in 0..5 {
            status.report(format!("step {i}"));
        }

        let messages: Vec<_> = status.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["step 2", "step 3", "step 4"]);
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let status = StatusReporter::with_capacity(0);
        status.report(ACCEPTING_REQUESTS);
        assert_eq!(status.snapshot().len(), 1);
        assert_eq!(status.latest().unwrap().message, ACCEPTING_REQUESTS);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let status = StatusReporter::new();
        let before = status.snapshot();
        status.report(ACCEPTING_REQUESTS);
        assert_eq!(before.len(), 1);
        assert_eq!(status.snapshot().len(), 2);
    }

    #[test]
    fn concurrent_reports_are_time_ordered() {
        let status = StatusReporter::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let status = status.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        status.report(format!("thread {t} report {i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = status.snapshot();
        assert_eq!(entries.len(), 201);
        assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
