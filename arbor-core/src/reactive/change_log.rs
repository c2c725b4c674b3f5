//! Change Log
//!
//! An ordered record of which paths changed at which tick. The log is soft
//! capped: once it grows past `cap` entries the oldest `trim` entries are
//! dropped. It is an approximation of history, so the log remembers the
//! newest tick it has forgotten and treats any question about older ticks as
//! "changed".

use std::collections::VecDeque;

use crate::path;

/// One committed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub tick: u64,
    pub path: String,
}

#[derive(Debug)]
pub struct ChangeLog {
    entries: VecDeque<Change>,
    cap: usize,
    trim: usize,
    /// Highest tick among trimmed entries.
    horizon: u64,
}

impl ChangeLog {
    pub fn new(cap: usize, trim: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap,
            trim: trim.clamp(1, cap.max(1)),
            horizon: 0,
        }
    }

    pub fn record(&mut self, tick: u64, path: impl Into<String>) {
        self.entries.push_back(Change {
            tick,
            path: path.into(),
        });
    }

    /// Drop the oldest entries once the cap is exceeded.
    pub fn enforce_cap(&mut self) {
        if self.entries.len() <= self.cap {
            return;
        }
        for change in self.entries.drain(..self.trim.min(self.entries.len())) {
            self.horizon = self.horizon.max(change.tick);
        }
    }

    /// Whether anything under or above `path` changed after `from_tick`.
    pub fn changed_since(&self, path: &str, from_tick: u64) -> bool {
        if from_tick < self.horizon {
            return true;
        }
        self.entries
            .iter()
            .rev()
            .take_while(|change| change.tick > from_tick)
            .any(|change| path::related(&change.path, path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    pub fn entries(&self) -> impl Iterator<Item = &Change> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_under_and_above_a_path_count() {
        let mut log = ChangeLog::new(2000, 1000);
        log.record(1, "/a/b");
        log.record(2, "/c");

        assert!(log.changed_since("/a", 0));
        assert!(log.changed_since("/a/b/c", 0));
        assert!(!log.changed_since("/ab", 0));
        assert!(!log.changed_since("/a", 1));
        assert!(log.changed_since("/c", 1));
    }

    #[test]
    fn trimming_moves_the_horizon() {
        let mut log = ChangeLog::new(4, 2);
        for tick in 1..=5 {
            log.record(tick, format!("/p{tick}"));
            log.enforce_cap();
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.horizon(), 2);
        // Older than anything retained: answered conservatively.
        assert!(log.changed_since("/unrelated", 1));
        assert!(!log.changed_since("/unrelated", 2));
        assert!(log.changed_since("/p4", 3));
    }
}
