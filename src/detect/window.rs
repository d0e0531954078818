//! Per-key rolling windows of failure timestamps.

use std::collections::{HashMap, VecDeque};

use tracing::trace;

/// Build the composite `user|ip` window key.
pub fn window_key(user: &str, ip: &str) -> String {
    format!("{}|{}", user, ip)
}

/// Failure timestamps (milliseconds) per `user|ip`, oldest first.
///
/// Keys exist only while their window is non-empty.
#[derive(Debug, Clone)]
pub struct FailureWindowStore {
    window_ms: i64,
    windows: HashMap<String, VecDeque<i64>>,
}

impl FailureWindowStore {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms: i64::try_from(window_ms).unwrap_or(i64::MAX),
            windows: HashMap::new(),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Oldest instant still inside the window at `now` (inclusive).
    pub fn window_start(&self, now: i64) -> i64 {
        now.saturating_sub(self.window_ms)
    }

    /// Prune `key` against `now`, append `now`, and return the window length.
    ///
    /// `now` must not be earlier than any previous call for the same key.
    pub fn record(&mut self, key: &str, now: i64) -> usize {
        let window_start = self.window_start(now);
        let timestamps = self.windows.entry(key.to_string()).or_default();

        let before = timestamps.len();
        prune(timestamps, window_start);
        if before != timestamps.len() {
            trace!(key, pruned = before - timestamps.len(), "pruned stale failures");
        }

        timestamps.push_back(now);
        timestamps.len()
    }

    /// Prune every window against `now` and drop keys left empty.
    /// Returns the number of keys removed.
    pub fn sweep(&mut self, now: i64) -> usize {
        let window_start = self.window_start(now);
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            prune(timestamps, window_start);
            !timestamps.is_empty()
        });
        before - self.windows.len()
    }

    /// Stored failures for `key`, without pruning.
    pub fn len_of(&self, key: &str) -> usize {
        self.windows.get(key).map_or(0, VecDeque::len)
    }

    pub fn timestamps(&self, key: &str) -> Option<&VecDeque<i64>> {
        self.windows.get(key)
    }

    pub fn key_count(&self) -> usize {
        self.windows.len()
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }
}

fn prune(timestamps: &mut VecDeque<i64>, window_start: i64) {
    while timestamps.front().is_some_and(|&t| t < window_start) {
        timestamps.pop_front();
    }
}
