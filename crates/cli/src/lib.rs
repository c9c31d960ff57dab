//! BMM interactive CLI library
//!
//! This crate provides the interactive terminal session for the bare-metal
//! manager REST API. It handles raw key input, the select widget, the line
//! editor with live suggestions, and the session commands.
//!
//! # Key Features
//!
//! - **Live Suggestions**: Command names and resource names complete as you type
//! - **Select Widget**: Filterable, windowed picker used whenever a resource is ambiguous
//! - **Scope**: Narrow every list to a site or VPC
//! - **History**: Recent lines, browsable with the Up arrow
//! - **CLI Equivalents**: Every action prints the scripted command it corresponds to
//!
//! # Architecture
//!
//! - [`terminal`]: Raw mode, key decoding and ANSI rendering helpers
//! - [`selection`]: Select widget and text, confirm and password prompts
//! - [`repl`]: Line editor, suggestions, history and the read-eval-print loop
//! - [`session`]: API client, resolver, scope and login state
//! - [`commands`]: The command set run from the loop
//! - [`cli_args`]: Command-line argument parsing
//!
//! # Examples
//!
//! ```bash
//! # Start with the default config (~/.bmm/config.yaml)
//! bmm
//!
//! # Pick a config and org explicitly
//! bmm --config ~/.bmm/config-dev.yaml --org my-org
//!
//! # Inside the session
//! bmm:my-org> scope site east
//! bmm:my-org/east> vpc list
//! bmm:my-org/east> vpc get prod-vpc
//! ```

pub mod cli_args;
pub mod commands;
pub mod repl;
pub mod selection;
pub mod session;
pub mod terminal;
