//! State for the select widget.
//!
//! [`SelectState`] is pure: keys go in, an action comes out, and
//! [`SelectState::render`] derives the visible lines from the state alone.

use bmm_core::error::{Error, Result};
use bmm_core::resource::SelectItem;

use crate::terminal::render::{bold, cyan, dim, reverse};
use crate::terminal::{Key, CTRL_C, CTRL_D};

/// Rows of items shown at once
pub const WINDOW_HEIGHT: usize = 12;

/// Result of feeding one key to the widget.
#[derive(Clone, PartialEq, Debug)]
pub enum SelectAction {
    Continue,
    Commit(SelectItem),
    Cancel,
}

#[derive(Clone, PartialEq, Debug)]
pub struct SelectState {
    label: String,
    items: Vec<SelectItem>,
    filter: String,
    /// Indexes into `items` matching `filter`, in original order
    filtered: Vec<usize>,
    cursor: usize,
    window_start: usize,
    window: Option<usize>,
}

impl SelectState {
    /// # Errors
    ///
    /// Returns an error if `items` is empty.
    pub fn new(label: &str, items: Vec<SelectItem>, window: Option<usize>) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::NoItemsToSelect);
        }
        let filtered = (0..items.len()).collect();
        Ok(Self {
            label: label.to_string(),
            items,
            filter: String::new(),
            filtered,
            cursor: 0,
            window_start: 0,
            window: window.filter(|w| *w > 0),
        })
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn window_start(&self) -> usize {
        self.window_start
    }

    pub fn filtered(&self) -> impl Iterator<Item = &SelectItem> {
        self.filtered.iter().map(|i| &self.items[*i])
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn highlighted(&self) -> Option<&SelectItem> {
        self.filtered.get(self.cursor).map(|i| &self.items[*i])
    }

    fn refilter(&mut self) {
        let needle = self.filter.to_lowercase();
        self.filtered = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.label.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
    }

    /// Rows visible at once; the whole list when unwindowed.
    fn visible_rows(&self) -> usize {
        self.window.unwrap_or(usize::MAX)
    }

    fn scroll_to_cursor(&mut self) {
        let rows = self.visible_rows();
        if self.cursor < self.window_start {
            self.window_start = self.cursor;
        } else if self.cursor >= self.window_start.saturating_add(rows) {
            self.window_start = self.cursor + 1 - rows;
        }
        let max_start = self.filtered.len().saturating_sub(rows);
        self.window_start = self.window_start.min(max_start);
    }

    pub fn handle_key(&mut self, key: Key) -> SelectAction {
        if let Some(c) = key.printable() {
            self.filter.push(c);
            self.refilter();
            self.cursor = 0;
            self.window_start = 0;
            return SelectAction::Continue;
        }

        if key.is_backspace() {
            if self.filter.pop().is_some() {
                self.refilter();
                self.cursor = self.cursor.min(self.filtered.len().saturating_sub(1));
                self.scroll_to_cursor();
            }
            return SelectAction::Continue;
        }

        if key.is_enter() {
            return match self.highlighted() {
                Some(item) => SelectAction::Commit(item.clone()),
                None => SelectAction::Continue,
            };
        }

        match key {
            Key::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                self.scroll_to_cursor();
            }
            Key::Down => {
                if self.cursor + 1 < self.filtered.len() {
                    self.cursor += 1;
                }
                self.scroll_to_cursor();
            }
            Key::Byte(CTRL_C | CTRL_D) => return SelectAction::Cancel,
            _ => {}
        }
        SelectAction::Continue
    }

    fn render_item(item: &SelectItem, highlighted: bool) -> String {
        let status = item
            .extra
            .get("status")
            .filter(|s| !s.is_empty())
            .map(|s| format!("  {}", dim(s)))
            .unwrap_or_default();

        if highlighted {
            format!("{} {}{status}", cyan(">"), reverse(&format!(" {} ", item.label)))
        } else {
            format!("   {}{status}", item.label)
        }
    }

    /// Lines for the current state: header, items or "no matches", then
    /// the position indicator when the list is longer than the window.
    pub fn render(&self) -> Vec<String> {
        let filter_hint = if self.filter.is_empty() {
            dim("(type to filter)")
        } else {
            format!("{} {}", dim("filter:"), self.filter)
        };
        let mut lines = vec![format!("{} {filter_hint}", bold(&self.label))];

        if self.filtered.is_empty() {
            lines.push(format!("   {}", dim("no matches")));
            return lines;
        }

        let total = self.filtered.len();
        let end = self.window_start.saturating_add(self.visible_rows()).min(total);
        for position in self.window_start..end {
            let item = &self.items[self.filtered[position]];
            lines.push(Self::render_item(item, position == self.cursor));
        }

        if self.window.is_some() && total > self.visible_rows() {
            let mut indicator = format!("{}–{end} of {total}", self.window_start + 1);
            if self.window_start > 0 {
                indicator.push_str("  ↑ more");
            }
            if end < total {
                indicator.push_str("  ↓ more");
            }
            lines.push(format!("   {}", dim(&indicator)));
        }

        lines
    }
}
