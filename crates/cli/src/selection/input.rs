use std::io::{stdin, stdout, BufRead, Read, Write};

use bmm_core::error::{Error, Result};

use crate::terminal::render::bold;
use crate::terminal::{Key, KeyReader, RawModeGuard, CTRL_C, CTRL_D};

/// Prompts for a line of text on the cooked terminal.
///
/// Required prompts repeat until something non-blank is entered.
pub fn prompt_text(label: &str, required: bool) -> Result<String> {
    read_text(&mut stdin().lock(), &mut stdout(), label, required)
}

pub fn read_text<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &str,
    required: bool,
) -> Result<String> {
    loop {
        let suffix = if required { "" } else { " (optional)" };
        write!(out, "{}{suffix}: ", bold(label))?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Err(Error::Eof);
        }

        let value = line.trim().to_string();
        if !value.is_empty() || !required {
            return Ok(value);
        }

        // Required and blank - ask again
    }
}

/// Asks a yes/no question; only `y` or `yes` confirm.
pub fn prompt_confirm(question: &str) -> Result<bool> {
    read_confirm(&mut stdin().lock(), &mut stdout(), question)
}

pub fn read_confirm<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    question: &str,
) -> Result<bool> {
    write!(out, "{question} [y/N]: ")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Reads a password in raw mode without echoing it.
pub fn prompt_password(label: &str) -> Result<String> {
    let _guard = RawModeGuard::acquire()?;
    read_password(&mut KeyReader::new(stdin()), &mut stdout(), label)
}

pub fn read_password<R: Read, W: Write>(
    keys: &mut KeyReader<R>,
    out: &mut W,
    label: &str,
) -> Result<String> {
    write!(out, "{}: ", bold(label))?;
    out.flush()?;

    let mut password = String::new();
    loop {
        let key = keys.read_key()?;
        if key.is_enter() {
            break;
        }
        if key.is_backspace() {
            password.pop();
            continue;
        }
        match key {
            Key::Byte(CTRL_C | CTRL_D) => {
                write!(out, "\r\n")?;
                out.flush()?;
                return Err(Error::Cancelled("input cancelled".to_string()));
            }
            other => {
                if let Some(c) = other.printable() {
                    password.push(c);
                }
            }
        }
    }

    write!(out, "\r\n")?;
    out.flush()?;
    Ok(password)
}
