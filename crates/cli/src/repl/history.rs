use std::collections::VecDeque;

use bmm_core::resource::SelectItem;

/// Default number of remembered lines
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Bounded record of submitted lines, oldest first.
#[derive(Clone, Debug)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl History {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_SIZE)),
            capacity,
        }
    }

    /// Records `line` unless it is blank or repeats the latest entry.
    pub fn push(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || self.capacity == 0 {
            return;
        }
        if self.entries.back().is_some_and(|last| last == line) {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from most to least recent.
    pub fn recent_first(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(String::as_str)
    }

    /// Entries as selector items, most recent first.
    pub fn select_items(&self) -> Vec<SelectItem> {
        self.recent_first()
            .enumerate()
            .map(|(i, line)| SelectItem::new(line, i.to_string()))
            .collect()
    }
}
