//! Single-line editor with live suggestions drawn below the prompt.
//!
//! The editor tracks how many suggestion lines it drew last so each redraw
//! erases exactly those before painting the prompt again.

use std::io::{Read, Write};

use log::debug;

use bmm_core::error::Result;

use super::history::History;
use crate::selection::{run_select, WINDOW_HEIGHT};
use crate::terminal::render::{
    clear_line, dim, move_to_column, move_up, reverse, show_cursor, visible_len,
};
use crate::terminal::{Key, KeyReader, CTRL_C, CTRL_D, TAB};

/// How a call to [`LineEditor::read_line`] ended.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LineOutcome {
    Submit(String),
    Eof,
}

#[derive(Debug, Default)]
pub struct LineEditor {
    line: String,
    selected: Option<usize>,
    /// Suggestions currently on screen
    shown: Vec<String>,
    max: usize,
}

impl LineEditor {
    pub fn new(max_suggestions: usize) -> Self {
        Self {
            max: max_suggestions,
            ..Self::default()
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn shown(&self) -> &[String] {
        &self.shown
    }

    fn clear_suggestions(&mut self, out: &mut impl Write) -> Result<()> {
        for _ in 0..self.shown.len() {
            write!(out, "\r\n")?;
            clear_line(out)?;
        }
        move_up(out, self.shown.len())?;
        self.shown.clear();
        Ok(())
    }

    fn render(&mut self, out: &mut impl Write, prompt: &str, mut suggestions: Vec<String>) -> Result<()> {
        suggestions.truncate(self.max);
        if self.line.is_empty() {
            suggestions.clear();
        }

        self.clear_suggestions(out)?;
        clear_line(out)?;
        write!(out, "\r{prompt}{}", self.line)?;

        self.selected = self
            .selected
            .map(|i| i.min(suggestions.len().saturating_sub(1)))
            .filter(|_| !suggestions.is_empty());

        if !suggestions.is_empty() {
            for (i, suggestion) in suggestions.iter().enumerate() {
                write!(out, "\r\n")?;
                clear_line(out)?;
                if self.selected == Some(i) {
                    write!(out, "  {}", reverse(&format!(" {suggestion} ")))?;
                } else {
                    write!(out, "  {}", dim(suggestion))?;
                }
            }
            move_up(out, suggestions.len())?;
            move_to_column(out, visible_len(prompt) + self.line.chars().count() + 1)?;
        }

        self.shown = suggestions;
        out.flush()?;
        Ok(())
    }

    /// Leaves the current line on screen and moves below it.
    fn finish_line(&mut self, out: &mut impl Write, prompt: &str) -> Result<()> {
        self.clear_suggestions(out)?;
        clear_line(out)?;
        write!(out, "\r{prompt}{}\r\n", self.line)?;
        out.flush()?;
        Ok(())
    }

    fn accept(&mut self, index: usize) -> bool {
        match self.shown.get(index) {
            Some(suggestion) => {
                self.line = suggestion.clone();
                self.selected = None;
                true
            }
            None => false,
        }
    }

    /// Opens the history picker on the same terminal.
    ///
    /// Cancelling the picker keeps the line as it was.
    fn browse_history<R: Read, W: Write>(
        &mut self,
        keys: &mut KeyReader<R>,
        out: &mut W,
        prompt: &str,
        history: &History,
    ) -> Result<()> {
        self.finish_line(out, prompt)?;
        match run_select(keys, out, "History:", &history.select_items(), Some(WINDOW_HEIGHT)) {
            Ok(item) => self.line = item.label,
            Err(e) if e.is_cancellation() => debug!("History browse cancelled"),
            Err(e) => return Err(e),
        }
        self.selected = None;
        Ok(())
    }

    /// Reads one line in raw mode.
    ///
    /// `suggest` is asked for suggestions after every edit. Accepting a
    /// suggestion replaces the line without submitting it; Enter with
    /// nothing highlighted submits the typed text.
    pub fn read_line<R, W, F>(
        &mut self,
        keys: &mut KeyReader<R>,
        out: &mut W,
        prompt: &str,
        mut suggest: F,
        history: &History,
    ) -> Result<LineOutcome>
    where
        R: Read,
        W: Write,
        F: FnMut(&str) -> Vec<String>,
    {
        self.line.clear();
        self.selected = None;
        self.shown.clear();

        show_cursor(out)?;
        self.render(out, prompt, suggest(""))?;

        loop {
            let key = keys.read_key()?;

            if key.is_enter() {
                if let Some(index) = self.selected {
                    if self.accept(index) {
                        let suggestions = suggest(&self.line);
                        self.render(out, prompt, suggestions)?;
                        continue;
                    }
                }
                self.finish_line(out, prompt)?;
                return Ok(LineOutcome::Submit(std::mem::take(&mut self.line)));
            }

            if key.is_backspace() {
                if self.line.pop().is_some() {
                    self.selected = None;
                }
            } else if let Some(c) = key.printable() {
                self.line.push(c);
                self.selected = None;
            } else {
                match key {
                    Key::Byte(CTRL_C) => {
                        self.line.clear();
                        self.selected = None;
                    }
                    Key::Byte(CTRL_D) => {
                        self.clear_suggestions(out)?;
                        write!(out, "\r\n")?;
                        out.flush()?;
                        return Ok(LineOutcome::Eof);
                    }
                    Key::Byte(TAB) => {
                        self.accept(self.selected.unwrap_or(0));
                    }
                    Key::Up if !self.shown.is_empty() => {
                        let last = self.shown.len() - 1;
                        self.selected = match self.selected {
                            None | Some(0) => Some(last),
                            Some(i) => Some(i - 1),
                        };
                    }
                    Key::Up if !history.is_empty() => {
                        self.browse_history(keys, out, prompt, history)?;
                    }
                    Key::Down if !self.shown.is_empty() => {
                        self.selected = match self.selected {
                            Some(i) if i + 1 < self.shown.len() => Some(i + 1),
                            _ => Some(0),
                        };
                    }
                    Key::Up | Key::Down => {}
                    _ => continue,
                }
            }

            let suggestions = suggest(&self.line);
            self.render(out, prompt, suggestions)?;
        }
    }
}
