//! The interactive read-eval-print loop.
//!
//! Each iteration reads one line with live suggestions, records it in the
//! session history and dispatches it. Command errors are printed and the
//! loop carries on; only Ctrl-D, `exit` and `quit` end it.

pub mod editor;
pub mod history;
pub mod suggest;

use std::io::{stdin, stdout};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use log::debug;

use bmm_core::error::{Error, Result};
use bmm_core::resource::ResourceKind;

use crate::commands::{all_commands, arg_kinds, command_names, Command};
use crate::session::Session;
use crate::terminal::render::{bold, cyan, dim, red, yellow};
use crate::terminal::{KeyReader, RawModeGuard};
use editor::{LineEditor, LineOutcome};
use suggest::{suggestions, MAX_SUGGESTIONS};

/// What a submitted line asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplAction {
    Exit,
    ShowOrg,
    ListOrgs,
    SetOrg(String),
    ShowScope,
    ClearScope,
    SetScope(ResourceKind, String),
    /// Run `commands[index]` with the given arguments
    Run { index: usize, args: Vec<String> },
    Unknown { line: String, suggestion: Option<String> },
}

/// Remainder after `word` when `line` is exactly `word` or `word` plus arguments.
fn strip_word<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(word)?;
    (rest.is_empty() || rest.starts_with(' ')).then(|| rest.trim())
}

/// Closest command name to `line`, if any is a fuzzy match.
pub fn did_you_mean(line: &str, names: &[String]) -> Option<String> {
    let matcher = SkimMatcherV2::default();
    names
        .iter()
        .filter_map(|name| matcher.fuzzy_match(name, line).map(|score| (score, name)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, name)| name.clone())
}

/// Decides what a trimmed, non-empty line does.
///
/// Session commands come first. Otherwise an exact command name wins, then
/// the longest command name followed by a space, with the rest of the line
/// split on whitespace into arguments.
pub fn parse_line(line: &str, commands: &[Command]) -> ReplAction {
    match line {
        "exit" | "quit" => return ReplAction::Exit,
        "org" => return ReplAction::ShowOrg,
        "org list" => return ReplAction::ListOrgs,
        "scope" => return ReplAction::ShowScope,
        "scope clear" => return ReplAction::ClearScope,
        _ => {}
    }
    if let Some(org) = strip_word(line, "org set") {
        return ReplAction::SetOrg(org.to_string());
    }
    if let Some(query) = strip_word(line, "scope site") {
        return ReplAction::SetScope(ResourceKind::Site, query.to_string());
    }
    if let Some(query) = strip_word(line, "scope vpc") {
        return ReplAction::SetScope(ResourceKind::Vpc, query.to_string());
    }

    if let Some(index) = commands.iter().position(|c| c.name == line) {
        return ReplAction::Run {
            index,
            args: Vec::new(),
        };
    }

    let prefixed = commands
        .iter()
        .enumerate()
        .filter(|(_, c)| line.starts_with(&format!("{} ", c.name)))
        .max_by_key(|(_, c)| c.name.len());
    if let Some((index, command)) = prefixed {
        let args = line[command.name.len()..]
            .split_whitespace()
            .map(str::to_string)
            .collect();
        return ReplAction::Run { index, args };
    }

    ReplAction::Unknown {
        line: line.to_string(),
        suggestion: did_you_mean(line, &command_names(commands)),
    }
}

fn print_banner(session: &Session) {
    println!("\n{}", bold("BMM Interactive Mode"));
    println!("Org: {}", cyan(&session.org()));
    if let Some(path) = session.config_path() {
        println!("Config: {}", dim(path));
    }
    println!("Start typing a command. {} to quit.\n", bold("Ctrl+D"));
}

fn show_scope(session: &Session) {
    let scope = session.scope();
    if scope.is_empty() {
        println!("No scope set. All list commands return unfiltered results.");
        return;
    }
    if !scope.site_name.is_empty() {
        println!("  site: {} ({})", cyan(&scope.site_name), scope.site_id);
    }
    if !scope.vpc_name.is_empty() {
        println!("  vpc:  {} ({})", cyan(&scope.vpc_name), scope.vpc_id);
    }
}

fn list_orgs(session: &Session) {
    let current = session.org();
    println!("Current org: {}", cyan(&current));

    let Some(orgs) = session.orgs() else {
        println!("{} No token available. Run {} first.", yellow("Note:"), bold("login"));
        return;
    };
    if orgs.is_empty() {
        println!(
            "Could not extract orgs from token. Switch manually: {}",
            bold("org set <org-name>")
        );
        return;
    }

    println!();
    for org in &orgs {
        let marker = if *org == current { cyan("> ") } else { "  ".to_string() };
        println!("{marker}{org}");
    }
    println!("\nSwitch with: {}", bold("org set <org-name>"));
}

/// Carries out one action; the caller prints any error.
fn dispatch(session: &mut Session, commands: &[Command], action: ReplAction) -> Result<()> {
    match action {
        ReplAction::Exit => {}
        ReplAction::ShowOrg => println!("Current org: {}", cyan(&session.org())),
        ReplAction::ListOrgs => list_orgs(session),
        ReplAction::SetOrg(org) => {
            if org.is_empty() {
                return Err(Error::Misc("org name required".to_string()));
            }
            session.set_org(&org);
            println!("Org set to: {}", cyan(&org));
        }
        ReplAction::ShowScope => show_scope(session),
        ReplAction::ClearScope => {
            session.clear_scope();
            println!("Scope cleared.");
        }
        ReplAction::SetScope(kind, query) => {
            let item = session.set_scope(kind, &query)?;
            println!("Scope set: {kind} = {}", cyan(&item.name));
        }
        ReplAction::Run { index, args } => {
            if let Some(command) = commands.get(index) {
                command.run(session, &args)?;
            }
        }
        ReplAction::Unknown { line, suggestion } => {
            let hint = suggestion
                .map(|s| format!(" (did you mean {}?)", bold(&s)))
                .unwrap_or_default();
            return Err(Error::Misc(format!("unknown command: {line}{hint}")));
        }
    }
    Ok(())
}

fn read_line(
    session: &mut Session,
    editor: &mut LineEditor,
    names: &[String],
    arg_kinds: &indexmap::IndexMap<String, ResourceKind>,
) -> Result<LineOutcome> {
    let prompt = session.prompt_string();
    let history = session.history().clone();

    let _guard = RawModeGuard::acquire()?;
    let mut keys = KeyReader::new(stdin());
    let mut out = stdout();
    editor.read_line(
        &mut keys,
        &mut out,
        &prompt,
        |input| {
            suggestions(
                input,
                names,
                arg_kinds,
                |kind| session.fetch(kind),
                MAX_SUGGESTIONS,
            )
        },
        &history,
    )
}

/// Runs the loop until Ctrl-D, `exit` or `quit`.
///
/// # Errors
///
/// Returns an error if the terminal cannot be put into raw mode or read.
pub fn run_repl(session: &mut Session) -> Result<()> {
    let commands = all_commands();
    let names = command_names(&commands);
    let arg_kinds = arg_kinds(&commands);
    let mut editor = LineEditor::new(MAX_SUGGESTIONS);

    print_banner(session);

    loop {
        let line = match read_line(session, &mut editor, &names, &arg_kinds)? {
            LineOutcome::Eof => {
                println!("Goodbye.");
                return Ok(());
            }
            LineOutcome::Submit(line) => line.trim().to_string(),
        };
        if line.is_empty() {
            continue;
        }
        session.history_mut().push(&line);

        let action = parse_line(&line, &commands);
        debug!("Dispatching {action:?}");
        if action == ReplAction::Exit {
            println!("Goodbye.");
            return Ok(());
        }

        if let Err(e) = dispatch(session, &commands, action) {
            eprintln!("{} {e}", red("Error:"));
        }
        println!();
    }
}
