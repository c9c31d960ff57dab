//! Interactive selection and user input handling.
//!
//! This module provides the terminal widgets used by the REPL and by
//! commands that need a resource or a value from the user.
//!
//! # Key Features
//!
//! - **Select Widget**: Filterable, arrow-navigable list with a sliding window
//! - **Text Prompts**: Required and optional single-line input
//! - **Confirmation**: Yes/no questions defaulting to no
//! - **Password Input**: Raw-mode entry without echo
//!
//! # User Interface
//!
//! The select widget supports:
//! - Up/Down arrows to move the highlight
//! - Typing to filter (case-insensitive substring match)
//! - Backspace to edit the filter
//! - Enter to choose the highlighted item
//! - Ctrl-C or Ctrl-D to cancel

pub mod input;
pub mod types;
pub mod ui;

pub use input::{prompt_confirm, prompt_password, prompt_text};
pub use types::{SelectAction, SelectState, WINDOW_HEIGHT};
pub use ui::{run_select, select, TerminalSelector};
