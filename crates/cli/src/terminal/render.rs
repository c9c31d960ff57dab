//! Stateless ANSI helpers.
//!
//! Cursor and clear helpers queue commands on any writer; callers flush.
//! Callers also track how many lines they drew so they can erase precisely.

use std::io::Write;

use crossterm::cursor::{Hide, MoveDown, MoveToColumn, MoveUp, Show};
use crossterm::queue;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};

use bmm_core::error::Result;

pub fn move_up(out: &mut impl Write, lines: usize) -> Result<()> {
    if lines > 0 {
        queue!(out, MoveUp(lines as u16))?;
    }
    Ok(())
}

pub fn move_down(out: &mut impl Write, lines: usize) -> Result<()> {
    if lines > 0 {
        queue!(out, MoveDown(lines as u16))?;
    }
    Ok(())
}

pub fn clear_line(out: &mut impl Write) -> Result<()> {
    queue!(out, Clear(ClearType::CurrentLine))?;
    Ok(())
}

pub fn clear_to_end(out: &mut impl Write) -> Result<()> {
    queue!(out, Clear(ClearType::FromCursorDown))?;
    Ok(())
}

/// Moves to a 1-based column.
pub fn move_to_column(out: &mut impl Write, column: usize) -> Result<()> {
    queue!(out, MoveToColumn(column.saturating_sub(1) as u16))?;
    Ok(())
}

pub fn hide_cursor(out: &mut impl Write) -> Result<()> {
    queue!(out, Hide)?;
    Ok(())
}

pub fn show_cursor(out: &mut impl Write) -> Result<()> {
    queue!(out, Show)?;
    Ok(())
}

pub fn bold(text: &str) -> String {
    text.bold().to_string()
}

pub fn dim(text: &str) -> String {
    text.dim().to_string()
}

pub fn reverse(text: &str) -> String {
    text.reverse().to_string()
}

pub fn cyan(text: &str) -> String {
    text.dark_cyan().to_string()
}

pub fn green(text: &str) -> String {
    text.dark_green().to_string()
}

pub fn red(text: &str) -> String {
    text.dark_red().to_string()
}

pub fn yellow(text: &str) -> String {
    text.dark_yellow().to_string()
}

/// Removes escape sequences; each runs from ESC through the next letter.
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_escape = false;
    for c in text.chars() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == '\x1b' {
            in_escape = true;
        } else {
            out.push(c);
        }
    }
    out
}

/// Character count of `text` as displayed.
pub fn visible_len(text: &str) -> usize {
    strip_ansi(text).chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitted(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_cursor_sequences() {
        assert_eq!(emitted(|o| move_up(o, 3)), "\x1b[3A");
        assert_eq!(emitted(|o| move_down(o, 2)), "\x1b[2B");
        assert_eq!(emitted(|o| move_up(o, 0)), "");
        assert_eq!(emitted(clear_line), "\x1b[2K");
        assert_eq!(emitted(clear_to_end), "\x1b[J");
        assert_eq!(emitted(|o| move_to_column(o, 5)), "\x1b[5G");
        assert_eq!(emitted(hide_cursor), "\x1b[?25l");
        assert_eq!(emitted(show_cursor), "\x1b[?25h");
    }

    #[test]
    fn test_sgr_wrappers_keep_text() {
        for styled in [bold("x"), dim("x"), reverse("x"), cyan("x"), red("x")] {
            assert_eq!(strip_ansi(&styled), "x");
        }
        assert!(bold("x").contains("\x1b[1m"));
        assert!(dim("x").contains("\x1b[2m"));
        assert!(reverse("x").contains("\x1b[7m"));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[36mbmm:org\x1b[0m> "), "bmm:org> ");
        assert_eq!(strip_ansi("plain"), "plain");
        assert_eq!(strip_ansi("a\x1b[2Kb"), "ab");
    }

    #[test]
    fn test_visible_len() {
        assert_eq!(visible_len(&format!("{}> ", cyan("bmm:acme"))), 10);
        assert_eq!(visible_len("héllo"), 5);
    }
}
