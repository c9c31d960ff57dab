//! Commands available in the interactive session.
//!
//! Every resource kind gets `list` and `get`; a few also get `delete` or
//! `create`. Commands taking a resource argument feed the line editor's
//! argument suggestions.

use std::collections::HashMap;

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Value};

use bmm_core::error::{Error, Result};
use bmm_core::projection::str_field;
use bmm_core::resource::{NamedItem, ResourceKind};

use crate::selection::{prompt_confirm, prompt_text};
use crate::session::Session;
use crate::terminal::render::{dim, green};

/// Kinds that can be deleted from the session
pub const DELETABLE: [ResourceKind; 7] = [
    ResourceKind::Site,
    ResourceKind::Vpc,
    ResourceKind::Subnet,
    ResourceKind::Instance,
    ResourceKind::Allocation,
    ResourceKind::IpBlock,
    ResourceKind::OperatingSystem,
];

/// Read-only endpoints without an id: command name, description, path.
const SINGLETONS: [(&str, &str, &str); 6] = [
    ("metadata get", "Get API metadata", "metadata"),
    ("user current", "Get current user", "user/current"),
    ("tenant current", "Get current tenant", "tenant/current"),
    ("tenant stats", "Get tenant stats", "tenant/current/stats"),
    (
        "infrastructure-provider current",
        "Get current infrastructure provider",
        "infrastructure-provider/current",
    ),
    (
        "infrastructure-provider stats",
        "Get infrastructure provider stats",
        "infrastructure-provider/current/stats",
    ),
];

/// Commands handled by the REPL itself: name, usage, description.
pub const SESSION_COMMANDS: [(&str, &str, &str); 9] = [
    ("org", "org", "Show current org"),
    ("org list", "org list", "List available orgs (from the token)"),
    ("org set", "org set <name>", "Switch to a different org"),
    ("scope", "scope", "Show current scope filters"),
    ("scope site", "scope site [name|id]", "Set site scope (filters lists)"),
    ("scope vpc", "scope vpc [name|id]", "Set VPC scope (filters lists)"),
    ("scope clear", "scope clear", "Clear all scope filters"),
    ("exit", "exit", "Exit interactive mode"),
    ("quit", "quit", "Exit interactive mode"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    List(ResourceKind),
    Get(ResourceKind),
    Delete(ResourceKind),
    CreateVpc,
    CreateIpBlock,
    /// GET on a fixed path below the org
    Singleton(&'static str),
    Login,
    Help,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub description: String,
    pub action: Action,
}

impl Command {
    fn new(name: impl Into<String>, description: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            action,
        }
    }

    /// Kind whose names complete this command's argument.
    pub fn arg_kind(&self) -> Option<ResourceKind> {
        match self.action {
            Action::Get(kind) | Action::Delete(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn run(&self, session: &mut Session, args: &[String]) -> Result<()> {
        debug!("Running `{}` with {args:?}", self.name);
        match self.action {
            Action::List(kind) => list(session, kind),
            Action::Get(kind) => get(session, kind, args),
            Action::Delete(kind) => delete(session, kind, args),
            Action::CreateVpc => create_vpc(session),
            Action::CreateIpBlock => create_ip_block(session),
            Action::Singleton(path) => singleton(session, &self.name, path),
            Action::Login => login(session),
            Action::Help => {
                println!("{}", help_table(&all_commands()));
                Ok(())
            }
        }
    }
}

pub fn all_commands() -> Vec<Command> {
    let mut commands = Vec::new();
    for kind in ResourceKind::ALL {
        let name = kind.as_str();
        let label = kind.label();
        commands.push(Command::new(
            format!("{name} list"),
            format!("List {label}s"),
            Action::List(kind),
        ));
        commands.push(Command::new(
            format!("{name} get"),
            format!("Get {label} details"),
            Action::Get(kind),
        ));
        match kind {
            ResourceKind::Vpc => {
                commands.push(Command::new("vpc create", "Create a VPC", Action::CreateVpc));
            }
            ResourceKind::IpBlock => commands.push(Command::new(
                "ip-block create",
                "Create an IP Block",
                Action::CreateIpBlock,
            )),
            _ => {}
        }
        if DELETABLE.contains(&kind) {
            commands.push(Command::new(
                format!("{name} delete"),
                format!("Delete a {label}"),
                Action::Delete(kind),
            ));
        }
    }

    for (name, description, path) in SINGLETONS {
        commands.push(Command::new(name, description, Action::Singleton(path)));
    }
    commands.push(Command::new("login", "Login / refresh auth token", Action::Login));
    commands.push(Command::new("help", "Show available commands", Action::Help));
    commands
}

/// Command names offered as suggestions, session commands included.
pub fn command_names(commands: &[Command]) -> Vec<String> {
    commands
        .iter()
        .map(|c| c.name.clone())
        .chain(SESSION_COMMANDS.iter().map(|(name, _, _)| name.to_string()))
        .collect()
}

/// Argument-taking commands and the kind completing their argument.
pub fn arg_kinds(commands: &[Command]) -> IndexMap<String, ResourceKind> {
    commands
        .iter()
        .filter_map(|c| Some((c.name.clone(), c.arg_kind()?)))
        .collect()
}

pub fn help_table(commands: &[Command]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["COMMAND", "DESCRIPTION"]);
    for command in commands {
        table.add_row(vec![command.name.clone(), command.description.clone()]);
    }
    for (_, usage, description) in SESSION_COMMANDS {
        table.add_row(vec![usage, description]);
    }
    table
}

/// Table header for an extra field, e.g. `deviceType` becomes `DEVICE TYPE`.
fn column_header(key: &str) -> String {
    match key {
        "siteId" => "SITE".to_string(),
        "vpcId" => "VPC".to_string(),
        _ => {
            let mut header = String::new();
            for c in key.chars() {
                if c.is_ascii_uppercase() && !header.is_empty() {
                    header.push(' ');
                }
                header.push(c.to_ascii_uppercase());
            }
            header
        }
    }
}

/// Rows for `<kind> list`. Parent ids are shown as names via `resolve`.
pub fn list_table<F>(
    kind: ResourceKind,
    items: &[NamedItem],
    resolve: F,
    machine_vpcs: &HashMap<String, String>,
) -> Table
where
    F: Fn(ResourceKind, &str) -> String,
{
    let keys: Vec<&str> = kind
        .extra_keys()
        .iter()
        .copied()
        .filter(|k| *k != "machineId")
        .collect();
    let is_machine = kind == ResourceKind::Machine;

    let mut header = vec!["NAME".to_string(), "STATUS".to_string()];
    header.extend(keys.iter().map(|k| column_header(k)));
    if is_machine {
        header.push("VPC".to_string());
    }
    header.push("ID".to_string());

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(header);

    for item in items {
        let mut row = vec![item.name.clone(), item.status.clone()];
        for key in &keys {
            let value = item.extra(key).unwrap_or_default();
            row.push(match *key {
                "siteId" if !value.is_empty() => resolve(ResourceKind::Site, value),
                "vpcId" if !value.is_empty() => resolve(ResourceKind::Vpc, value),
                _ => value.to_string(),
            });
        }
        if is_machine {
            let vpcs = machine_vpcs
                .get(&item.id)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or("-");
            row.push(vpcs.to_string());
        }
        row.push(item.id.clone());
        table.add_row(row);
    }
    table
}

fn warm(session: &mut Session, kind: ResourceKind) {
    if let Err(e) = session.fetch(kind) {
        debug!("Could not warm {kind} cache: {e}");
    }
}

fn list(session: &mut Session, kind: ResourceKind) -> Result<()> {
    session.log_cmd(&[kind.as_str(), "list"]);

    let items = match session.fetch(kind) {
        Ok(items) => items,
        Err(e)
            if kind == ResourceKind::Machine
                && e.api_status() == Some(400)
                && session.scope().site_id.is_empty() =>
        {
            println!(
                "{} Machine listing requires a site filter. Select a site.",
                dim("Note:")
            );
            let site = session.resolve(ResourceKind::Site, ResourceKind::Site.label())?;
            session.scope_to_site(&site);
            session.fetch(kind)?
        }
        Err(e) => return Err(e),
    };

    let keys = kind.extra_keys();
    if keys.contains(&"siteId") {
        warm(session, ResourceKind::Site);
    }
    let is_machine = kind == ResourceKind::Machine;
    if keys.contains(&"vpcId") || is_machine {
        warm(session, ResourceKind::Vpc);
    }
    let machine_vpcs = if is_machine {
        session.machine_vpc_names()
    } else {
        HashMap::new()
    };

    eprintln!("{} items", items.len());
    let table = list_table(kind, &items, |k, id| session.resolve_id(k, id), &machine_vpcs);
    println!("{table}");
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn get(session: &mut Session, kind: ResourceKind, args: &[String]) -> Result<()> {
    let item = session.resolve_with_args(kind, kind.label(), args)?;
    session.log_cmd(&[kind.as_str(), "get", &item.id]);
    print_json(&session.client().get(kind, &item.id)?)
}

fn delete(session: &mut Session, kind: ResourceKind, args: &[String]) -> Result<()> {
    let label = format!("{} to delete", kind.label());
    let item = session.resolve_with_args(kind, &label, args)?;

    let question = format!("Delete {} {} ({})?", kind.label(), item.name, item.id);
    if !prompt_confirm(&question)? {
        println!("Cancelled.");
        return Ok(());
    }

    session.log_cmd(&[kind.as_str(), "delete", &item.id]);
    session.client().delete(kind, &item.id)?;
    session.invalidate(kind);
    println!("{} {} deleted: {}", green("OK"), kind.label(), item.name);
    Ok(())
}

pub fn vpc_body(name: &str, site_id: &str, description: &str) -> Value {
    let mut body = json!({ "name": name, "siteId": site_id });
    if !description.trim().is_empty() {
        body["description"] = json!(description.trim());
    }
    body
}

fn report_created(label: &str, created: &Value) {
    println!(
        "{} {label} created: {} ({})",
        green("OK"),
        str_field(created, "name"),
        str_field(created, "id")
    );
}

fn create_vpc(session: &mut Session) -> Result<()> {
    let site = session.resolve(ResourceKind::Site, ResourceKind::Site.label())?;
    let name = prompt_text("VPC name", true)?;
    let description = prompt_text("Description", false)?;

    session.log_cmd(&["vpc", "create", "--name", &name, "--site-id", &site.id]);
    let created = session
        .client()
        .create(ResourceKind::Vpc, &vpc_body(&name, &site.id, &description))?;
    session.invalidate(ResourceKind::Vpc);
    report_created("VPC", &created);
    Ok(())
}

/// Parses an IPv4 prefix length.
pub fn parse_prefix_length(input: &str) -> Result<u8> {
    match input.trim().parse::<u8>() {
        Ok(length) if (1..=32).contains(&length) => Ok(length),
        _ => Err(Error::Misc(
            "prefix length must be between 1 and 32".to_string(),
        )),
    }
}

pub fn ip_block_body(name: &str, site_id: &str, prefix: &str, prefix_length: u8) -> Value {
    json!({
        "name": name,
        "siteId": site_id,
        "ipVersion": "IPv4",
        "usageType": "DatacenterOnly",
        "prefix": prefix,
        "prefixLength": prefix_length,
    })
}

fn create_ip_block(session: &mut Session) -> Result<()> {
    let site = session.resolve(ResourceKind::Site, ResourceKind::Site.label())?;
    let name = prompt_text("IP block name", true)?;
    let prefix = prompt_text("Prefix (e.g. 10.0.0.0)", true)?;
    let prefix_length = parse_prefix_length(&prompt_text("Prefix length (e.g. 16)", true)?)?;

    let length = prefix_length.to_string();
    session.log_cmd(&[
        "ip-block",
        "create",
        "--name",
        &name,
        "--site-id",
        &site.id,
        "--prefix",
        &prefix,
        "--prefix-length",
        &length,
    ]);
    let body = ip_block_body(&name, &site.id, &prefix, prefix_length);
    let created = session.client().create(ResourceKind::IpBlock, &body)?;
    session.invalidate(ResourceKind::IpBlock);
    report_created("IP block", &created);
    Ok(())
}

fn singleton(session: &mut Session, name: &str, path: &str) -> Result<()> {
    let parts: Vec<&str> = name.split_whitespace().collect();
    session.log_cmd(&parts);
    print_json(&session.client().get_path(path)?)
}

fn login(session: &mut Session) -> Result<()> {
    if !session.has_login() {
        return Err(Error::LoginUnavailable);
    }
    println!("Logging in...");
    session.login()?;
    println!("{} Logged in successfully.", green("OK"));
    Ok(())
}
