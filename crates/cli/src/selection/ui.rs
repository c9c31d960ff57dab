use std::io::{stdin, stdout, Read, Write};

use log::debug;

use bmm_core::error::{Error, Result};
use bmm_core::resolver::Selector;
use bmm_core::resource::SelectItem;

use super::types::{SelectAction, SelectState, WINDOW_HEIGHT};
use crate::terminal::render::{
    bold, clear_to_end, green, hide_cursor, move_to_column, move_up, show_cursor,
};
use crate::terminal::{KeyReader, RawModeGuard};

/// Shows a filterable list on the terminal and returns the chosen item.
///
/// Raw mode is held only for the duration of the call.
///
/// # Errors
///
/// Returns an error if `items` is empty, the user cancels with Ctrl-C or
/// Ctrl-D, or the terminal fails.
pub fn select(label: &str, items: &[SelectItem]) -> Result<SelectItem> {
    if items.is_empty() {
        return Err(Error::NoItemsToSelect);
    }

    let _guard = RawModeGuard::acquire()?;
    let mut keys = KeyReader::new(stdin());
    let mut out = stdout();
    run_select(&mut keys, &mut out, label, items, Some(WINDOW_HEIGHT))
}

/// Erases the `drawn` lines above the cursor.
fn erase(out: &mut impl Write, drawn: usize) -> Result<()> {
    move_up(out, drawn)?;
    move_to_column(out, 1)?;
    clear_to_end(out)
}

fn redraw(out: &mut impl Write, state: &SelectState, drawn: usize) -> Result<usize> {
    erase(out, drawn)?;
    let lines = state.render();
    for line in &lines {
        write!(out, "{line}\r\n")?;
    }
    out.flush()?;
    Ok(lines.len())
}

fn select_loop<R: Read, W: Write>(
    keys: &mut KeyReader<R>,
    out: &mut W,
    state: &mut SelectState,
    drawn: &mut usize,
) -> Result<SelectItem> {
    loop {
        *drawn = redraw(out, state, *drawn)?;
        match state.handle_key(keys.read_key()?) {
            SelectAction::Continue => {}
            SelectAction::Commit(item) => return Ok(item),
            SelectAction::Cancel => {
                return Err(Error::Cancelled("selection cancelled".to_string()))
            }
        }
    }
}

/// Runs the widget against any key source and writer.
///
/// The cursor is hidden while the list is shown and made visible again
/// before this returns, whatever the outcome.
pub fn run_select<R: Read, W: Write>(
    keys: &mut KeyReader<R>,
    out: &mut W,
    label: &str,
    items: &[SelectItem],
    window: Option<usize>,
) -> Result<SelectItem> {
    let mut state = SelectState::new(label, items.to_vec(), window)?;
    let mut drawn = 0;

    let outcome = hide_cursor(out).and_then(|()| select_loop(keys, out, &mut state, &mut drawn));

    let cleanup = erase(out, drawn).and_then(|()| {
        if let Ok(item) = &outcome {
            write!(out, "{} {}\r\n", bold(label), green(&item.label))?;
        }
        Ok(())
    });
    show_cursor(out)?;
    out.flush()?;

    match &outcome {
        Ok(item) => debug!("Selected `{}` ({})", item.label, item.id),
        Err(e) => debug!("Selection ended: {e}"),
    }

    cleanup?;
    outcome
}

/// [`Selector`] backed by the interactive terminal widget.
#[derive(Default)]
pub struct TerminalSelector;

impl Selector for TerminalSelector {
    fn select(&mut self, label: &str, items: &[SelectItem]) -> Result<SelectItem> {
        select(label, items)
    }
}
