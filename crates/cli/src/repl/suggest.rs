//! Live suggestions for the line editor.

use indexmap::IndexMap;
use log::debug;

use bmm_core::error::Result;
use bmm_core::resource::{NamedItem, ResourceKind};

/// Suggestion lines drawn below the prompt at most
pub const MAX_SUGGESTIONS: usize = 6;

/// Suggestions for `input`, capped at `max`.
///
/// When the input starts with one of the argument-taking commands in
/// `arg_kinds` followed by a space, the rest of the line filters the
/// fetched items of that command's kind. Otherwise command names are
/// completed by prefix.
pub fn suggestions<F>(
    input: &str,
    command_names: &[String],
    arg_kinds: &IndexMap<String, ResourceKind>,
    mut fetch: F,
    max: usize,
) -> Vec<String>
where
    F: FnMut(ResourceKind) -> Result<Vec<NamedItem>>,
{
    if input.is_empty() || max == 0 {
        return Vec::new();
    }
    let lower = input.to_lowercase();

    for (command, kind) in arg_kinds {
        let prefix = format!("{} ", command.to_lowercase());
        let Some(partial) = lower.strip_prefix(&prefix) else {
            continue;
        };

        let items = match fetch(*kind) {
            Ok(items) => items,
            Err(e) => {
                debug!("No suggestions for `{command}`: {e}");
                return Vec::new();
            }
        };

        return items
            .iter()
            .filter_map(|item| {
                let name = if item.name.is_empty() { &item.id } else { &item.name };
                let matches = item.name.to_lowercase().contains(partial)
                    || item.id.to_lowercase().contains(partial);
                matches.then(|| format!("{command} {name}"))
            })
            .take(max)
            .collect();
    }

    command_names
        .iter()
        .filter(|name| name.to_lowercase().starts_with(&lower))
        .take(max)
        .cloned()
        .collect()
}
