//! Append-only, ordered log of test results.

use crate::protocol::TestEvent;

/// Pass/fail totals over the whole log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Entries are never mutated or removed; `append` is the only mutator and
/// hands out indices 0, 1, 2, … in call order.
#[derive(Debug, Default, Clone)]
pub struct LogStore {
    entries: Vec<TestEvent>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: TestEvent) -> usize {
        let index = self.entries.len();
        self.entries.push(event);
        index
    }

    pub fn all(&self) -> &[TestEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TestEvent> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&TestEvent> {
        self.entries.last()
    }

    pub fn summary(&self) -> LogSummary {
        let passed = self.entries.iter().filter(|e| e.is_pass()).count();
        LogSummary {
            total: self.entries.len(),
            passed,
            failed: self.entries.len() - passed,
        }
    }
}
