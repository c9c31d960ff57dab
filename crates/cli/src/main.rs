use std::io::{stdin, stdout, IsTerminal};
use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use log::{debug, info, warn};

use bmm_cli::cli_args::Args;
use bmm_cli::repl::run_repl;
use bmm_cli::selection::{prompt_password, prompt_text, select, TerminalSelector};
use bmm_cli::session::{LoginFn, Session};
use bmm_core::api::ApiClient;
use bmm_core::auth;
use bmm_core::config::{self, ConfigFile};
use bmm_core::error::{Error, Result};
use bmm_core::resource::SelectItem;

/// Picks the config file, asking when several are available.
fn choose_config_path(args: &Args) -> Result<String> {
    if args.config.is_some() || !stdin().is_terminal() || !stdout().is_terminal() {
        return Ok(config::get_config_path(&args.config));
    }

    let dir = config::get_config_dir();
    let candidates = config::config_candidates(Path::new(&dir))?;
    match candidates.as_slice() {
        [] => return Ok(config::get_config_path(&None)),
        [only] => return Ok(only.display().to_string()),
        _ => {}
    }

    let items: Vec<SelectItem> = candidates
        .iter()
        .map(|path| SelectItem::new(config::display_path(path), path.display().to_string()))
        .collect();
    let chosen = select("Config:", &items)?;
    Ok(chosen.id)
}

fn login_fn(config: ConfigFile, config_path: String) -> LoginFn {
    Box::new(move || {
        let (method, token) = auth::login(&config, |label, secret| {
            if secret {
                prompt_password(label)
            } else {
                prompt_text(label, true)
            }
        })?;
        if let Err(e) = config::save_token(&config_path, method, &token) {
            warn!("Could not save token to {config_path}: {e}");
        }
        Ok(token)
    })
}

fn execute() -> Result<()> {
    let args = Args::parse();

    let config_path = choose_config_path(&args)?;
    debug!("Config path: `{config_path}`");
    let config = ConfigFile::load(&config_path)?;

    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.api.base.clone())
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| {
            Error::Misc("No API base URL. Set `api.base` in the config or pass `--base-url`.".into())
        })?;
    let org = args
        .org
        .clone()
        .or_else(|| config.api.org.clone())
        .unwrap_or_default();
    if org.is_empty() {
        warn!("No org configured; use `org set <name>` before running commands");
    }
    let token = args
        .token
        .clone()
        .or_else(|| config.auth_token().map(str::to_string));

    info!("Connecting to {base_url} as org `{org}`");
    let client = Rc::new(ApiClient::new(&base_url, &org, config.api_name(), token));
    let mut session = Session::new(client, args.cache_ttl(), Box::new(TerminalSelector))
        .with_config_path(config_path.clone());
    if config.login_method().is_some() {
        session = session.with_login(login_fn(config, config_path));
    }

    run_repl(&mut session)
}

fn main() -> ExitCode {
    env_logger::init();

    match execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancellation() => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
