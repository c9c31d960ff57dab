//! Raw terminal mode and single-key decoding.
//!
//! Keys are decoded from a plain byte stream so the widgets built on top can
//! be driven by any [`Read`] implementation.

pub mod render;

use std::io::{ErrorKind, Read};

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::debug;

use bmm_core::error::Result;

pub const CTRL_C: u8 = 3;
pub const CTRL_D: u8 = 4;
pub const TAB: u8 = 9;
pub const LINE_FEED: u8 = 10;
pub const CARRIAGE_RETURN: u8 = 13;
pub const ESC: u8 = 27;
pub const DELETE: u8 = 127;
pub const BACKSPACE: u8 = 8;

/// Raw mode lifetime guard; the terminal is restored when it drops.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn acquire() -> Result<Self> {
        enable_raw_mode()?;
        debug!("Raw mode enabled");
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        debug!("Raw mode disabled");
    }
}

/// One decoded keypress.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Key {
    /// A literal byte: printable characters and control codes
    Byte(u8),
    Up,
    Down,
    Left,
    Right,
    /// An escape sequence that is not an arrow key
    Unknown,
}

impl Key {
    #[must_use]
    pub fn is_enter(self) -> bool {
        matches!(self, Key::Byte(CARRIAGE_RETURN | LINE_FEED))
    }

    #[must_use]
    pub fn is_backspace(self) -> bool {
        matches!(self, Key::Byte(DELETE | BACKSPACE))
    }

    /// The character for printable ASCII (32..=126).
    #[must_use]
    pub fn printable(self) -> Option<char> {
        match self {
            Key::Byte(b @ 32..=126) => Some(b as char),
            _ => None,
        }
    }
}

/// Reads keys one at a time from a byte stream.
pub struct KeyReader<R> {
    input: R,
}

impl<R: Read> KeyReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Blocks for one key.
    ///
    /// After ESC a single read of up to two bytes follows. `[` plus `A`-`D`
    /// is an arrow key; fewer than two bytes is a bare ESC.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stream has ended.
    pub fn read_key(&mut self) -> Result<Key> {
        let mut byte = [0u8; 1];
        if self.input.read(&mut byte)? == 0 {
            return Err(std::io::Error::from(ErrorKind::UnexpectedEof).into());
        }

        if byte[0] != ESC {
            return Ok(Key::Byte(byte[0]));
        }

        let mut sequence = [0u8; 2];
        let read = self.input.read(&mut sequence)?;
        if read < 2 {
            return Ok(Key::Byte(ESC));
        }

        Ok(match sequence {
            [b'[', b'A'] => Key::Up,
            [b'[', b'B'] => Key::Down,
            [b'[', b'C'] => Key::Right,
            [b'[', b'D'] => Key::Left,
            _ => Key::Unknown,
        })
    }
}
