//! The interactive session: API client, resolver, scope and history.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use itertools::Itertools;
use log::{debug, info};

use bmm_core::api::ApiClient;
use bmm_core::auth::orgs_from_jwt;
use bmm_core::cache::ResourceCache;
use bmm_core::error::{Error, Result};
use bmm_core::resolver::{ResolvedBy, Resolver, Selector};
use bmm_core::resource::{with_scope_flags, NamedItem, ResourceKind, Scope};

use crate::repl::history::History;
use crate::terminal::render::{bold, cyan, dim, green};

/// Obtains a fresh bearer token.
pub type LoginFn = Box<dyn FnMut() -> Result<String>>;

/// Program name shown in CLI equivalents
pub const PROGRAM_NAME: &str = "bmm";

pub struct Session {
    client: Rc<ApiClient>,
    config_path: Option<String>,
    scope: Scope,
    resolver: Resolver,
    history: History,
    login: Option<LoginFn>,
}

impl Session {
    /// Creates a session whose resolver fetches every kind through `client`.
    pub fn new(client: Rc<ApiClient>, ttl: Duration, selector: Box<dyn Selector>) -> Self {
        let mut resolver = Resolver::new(ResourceCache::new(ttl), selector);
        for kind in ResourceKind::ALL {
            let client = Rc::clone(&client);
            resolver.register_fetcher(kind, move |scope: &Scope| client.list(kind, scope));
        }

        Self {
            client,
            config_path: None,
            scope: Scope::default(),
            resolver,
            history: History::default(),
            login: None,
        }
    }

    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_login(mut self, login: LoginFn) -> Self {
        self.login = Some(login);
        self
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn config_path(&self) -> Option<&str> {
        self.config_path.as_deref()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    pub fn org(&self) -> String {
        self.client.org()
    }

    /// `bmm:<org>[/<site>][/<vpc>]> ` with the location in cyan.
    pub fn prompt_string(&self) -> String {
        let mut location = format!("bmm:{}", self.org());
        for name in [&self.scope.site_name, &self.scope.vpc_name] {
            if !name.is_empty() {
                location.push('/');
                location.push_str(name);
            }
        }
        format!("{}> ", cyan(&location))
    }

    pub fn fetch(&mut self, kind: ResourceKind) -> Result<Vec<NamedItem>> {
        self.resolver.fetch(kind, &self.scope)
    }

    /// Fetches `kind` and asks the user to pick one.
    pub fn resolve(&mut self, kind: ResourceKind, label: &str) -> Result<NamedItem> {
        let resolution = self.resolver.resolve(kind, &self.scope, label)?;
        Ok(report(label, resolution.item, resolution.by))
    }

    pub fn resolve_with_args(
        &mut self,
        kind: ResourceKind,
        label: &str,
        args: &[String],
    ) -> Result<NamedItem> {
        let resolution = self.resolver.resolve_with_args(kind, &self.scope, label, args)?;
        Ok(report(label, resolution.item, resolution.by))
    }

    pub fn resolve_id(&self, kind: ResourceKind, id: &str) -> String {
        self.resolver.resolve_id(kind, id)
    }

    pub fn invalidate(&mut self, kind: ResourceKind) {
        self.resolver.cache_mut().invalidate(kind);
    }

    /// Scopes the session to a site or VPC chosen by name, id or selector.
    ///
    /// The kind's cache entry is dropped first so the choice is made from
    /// fresh data. A site clears any VPC scope. A VPC also scopes its site
    /// when no site is set yet, and is refused when it belongs to a site
    /// other than the scoped one.
    pub fn set_scope(&mut self, kind: ResourceKind, query: &str) -> Result<NamedItem> {
        if !matches!(kind, ResourceKind::Site | ResourceKind::Vpc) {
            return Err(Error::Misc(format!("cannot scope by {kind}")));
        }

        self.invalidate(kind);
        let args: Vec<String> = (!query.is_empty())
            .then(|| query.to_string())
            .into_iter()
            .collect();
        let item = self.resolve_with_args(kind, kind.label(), &args)?;

        if kind == ResourceKind::Site {
            self.scope.site_id = item.id.clone();
            self.scope.site_name = item.name.clone();
            self.scope.vpc_id.clear();
            self.scope.vpc_name.clear();
        } else {
            if let Some(site_id) = item.extra("siteId") {
                if !self.scope.site_id.is_empty() && site_id != self.scope.site_id {
                    return Err(Error::Misc(format!(
                        "selected VPC belongs to a different site ({}). Current site scope is {}. \
                         Use `scope clear` first or choose a VPC in the current site.",
                        self.resolve_id(ResourceKind::Site, site_id),
                        self.scope.site_name
                    )));
                }
            }

            self.scope.vpc_id = item.id.clone();
            self.scope.vpc_name = item.name.clone();
            if let Some(site_id) = item.extra("siteId").filter(|_| self.scope.site_id.is_empty()) {
                // Warm the site cache so the name resolves
                if let Err(e) = self.fetch(ResourceKind::Site) {
                    debug!("Could not warm site cache: {e}");
                }
                let site_name = self.resolve_id(ResourceKind::Site, site_id);
                println!("Scope set: site = {} (from VPC)", cyan(&site_name));
                self.scope.site_id = site_id.to_string();
                self.scope.site_name = site_name;
            }
        }

        self.resolver.cache_mut().invalidate_filtered();
        info!("Scope set: {kind} = {} ({})", item.name, item.id);
        Ok(item)
    }

    /// Sets the site scope directly from an already resolved site.
    pub fn scope_to_site(&mut self, site: &NamedItem) {
        self.scope.site_id = site.id.clone();
        self.scope.site_name = site.name.clone();
        self.resolver.cache_mut().invalidate_filtered();
    }

    pub fn clear_scope(&mut self) {
        self.scope = Scope::default();
        self.resolver.cache_mut().invalidate_filtered();
    }

    /// Switches org; every cached list belonged to the old one.
    pub fn set_org(&mut self, org: &str) {
        self.client.set_org(org);
        self.resolver.cache_mut().invalidate_all();
        info!("Org set to {org}");
    }

    /// Orgs the current token grants access to.
    pub fn orgs(&self) -> Option<Vec<String>> {
        self.client.token().map(|token| orgs_from_jwt(&token))
    }

    pub fn has_login(&self) -> bool {
        self.login.is_some()
    }

    /// Runs the login callback and switches the client to the new token.
    pub fn login(&mut self) -> Result<()> {
        let login = self.login.as_mut().ok_or(Error::LoginUnavailable)?;
        let token = login()?;
        self.client.set_token(&token);
        debug!("Session token refreshed");
        Ok(())
    }

    /// The scripted command line equivalent to `parts`.
    pub fn cli_equivalent(&self, parts: &[&str]) -> String {
        let mut words = vec![PROGRAM_NAME.to_string()];
        if let Some(path) = self.config_path.as_deref().filter(|p| !p.trim().is_empty()) {
            words.push("--config".to_string());
            words.push(format!("{path:?}"));
        }
        let parts: Vec<String> = parts.iter().map(ToString::to_string).collect();
        words.extend(with_scope_flags(&self.scope, &parts));
        words.join(" ")
    }

    /// Prints the CLI equivalent of the action being run.
    pub fn log_cmd(&self, parts: &[&str]) {
        println!("{} {}", dim("INFO:"), self.cli_equivalent(parts));
    }

    /// VPC names per machine id, derived from the instances running on them.
    pub fn machine_vpc_names(&mut self) -> HashMap<String, String> {
        let instances = match self.fetch(ResourceKind::Instance) {
            Ok(instances) => instances,
            Err(e) => {
                debug!("No instances for machine VPC names: {e}");
                return HashMap::new();
            }
        };

        instances
            .iter()
            .filter_map(|inst| Some((inst.extra("machineId")?, inst.extra("vpcId")?)))
            .into_group_map()
            .into_iter()
            .map(|(machine_id, vpc_ids)| {
                let names = vpc_ids
                    .into_iter()
                    .unique()
                    .map(|vpc_id| self.resolve_id(ResourceKind::Vpc, vpc_id))
                    .sorted()
                    .join(", ");
                (machine_id.to_string(), names)
            })
            .collect()
    }
}

/// The line announcing how a resource was resolved without the selector.
fn report_line(label: &str, item: &NamedItem, by: ResolvedBy) -> Option<String> {
    let how = match by {
        ResolvedBy::AutoSelected => "(auto-selected)",
        ResolvedBy::Matched => "(matched)",
        ResolvedBy::Selected => return None,
    };
    Some(format!(
        "{} {} {}",
        bold(&format!("{label}:")),
        green(&item.name),
        dim(how)
    ))
}

fn report(label: &str, item: NamedItem, by: ResolvedBy) -> NamedItem {
    if let Some(line) = report_line(label, &item, by) {
        println!("{line}");
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmm_core::resource::SelectItem;
    use crate::terminal::render::strip_ansi;
    use std::cell::Cell;

    struct NoTerminal;

    impl Selector for NoTerminal {
        fn select(&mut self, _: &str, _: &[SelectItem]) -> Result<SelectItem> {
            Err(Error::Cancelled("selection cancelled".to_string()))
        }
    }

    fn session() -> Session {
        let client = Rc::new(ApiClient::new("http://127.0.0.1:9", "acme", "carbide", None));
        let mut session = Session::new(client, Duration::from_secs(30), Box::new(NoTerminal));
        let resolver = session.resolver_mut();
        resolver.register_fetcher(ResourceKind::Site, |_: &Scope| {
            Ok(vec![NamedItem::new("east", "s-1"), NamedItem::new("west", "s-2")])
        });
        resolver.register_fetcher(ResourceKind::Vpc, |_: &Scope| {
            Ok(vec![
                NamedItem::new("prod-vpc", "v-1").with_extra("siteId", "s-2"),
                NamedItem::new("dev-vpc", "v-2").with_extra("siteId", "s-1"),
            ])
        });
        resolver.register_fetcher(ResourceKind::Instance, |_: &Scope| {
            Ok(vec![
                NamedItem::new("i1", "i-1")
                    .with_extra("machineId", "m-1")
                    .with_extra("vpcId", "v-2"),
                NamedItem::new("i2", "i-2")
                    .with_extra("machineId", "m-1")
                    .with_extra("vpcId", "v-1"),
                NamedItem::new("i3", "i-3")
                    .with_extra("machineId", "m-1")
                    .with_extra("vpcId", "v-1"),
                NamedItem::new("i4", "i-4").with_extra("vpcId", "v-1"),
            ])
        });
        session
    }

    #[test]
    fn test_prompt_string_shows_scope() {
        let mut session = session();
        assert_eq!(strip_ansi(&session.prompt_string()), "bmm:acme> ");
        session.set_scope(ResourceKind::Site, "EAST").unwrap();
        assert_eq!(strip_ansi(&session.prompt_string()), "bmm:acme/east> ");
    }

    #[test]
    fn test_site_scope_clears_vpc() {
        let mut session = session();
        session.set_scope(ResourceKind::Vpc, "dev-vpc").unwrap();
        assert_eq!(session.scope().vpc_id, "v-2");
        session.set_scope(ResourceKind::Site, "west").unwrap();
        assert_eq!(session.scope().site_id, "s-2");
        assert!(session.scope().vpc_id.is_empty());
    }

    #[test]
    fn test_vpc_scope_sets_site_when_unscoped() {
        let mut session = session();
        session.set_scope(ResourceKind::Vpc, "prod-vpc").unwrap();
        assert_eq!(session.scope().site_id, "s-2");
        assert_eq!(session.scope().site_name, "west");

        session.set_scope(ResourceKind::Site, "east").unwrap();
        session.set_scope(ResourceKind::Vpc, "dev-vpc").unwrap();
        // Site already scoped, so it is left alone.
        assert_eq!(session.scope().site_id, "s-1");
        assert_eq!(session.scope().vpc_id, "v-2");
    }

    #[test]
    fn test_vpc_from_other_site_rejected() {
        let mut session = session();
        session.set_scope(ResourceKind::Site, "east").unwrap();
        let err = session.set_scope(ResourceKind::Vpc, "prod-vpc").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("different site (west)"), "{message}");
        assert!(message.contains("Current site scope is east"), "{message}");

        assert_eq!(session.scope().site_id, "s-1");
        assert!(session.scope().vpc_id.is_empty());
    }

    #[test]
    fn test_vpc_scope_survives_failed_site_warm_up() {
        let mut session = session();
        session
            .resolver_mut()
            .register_fetcher(ResourceKind::Site, |_: &Scope| {
                Err(Error::Misc("site list unavailable".to_string()))
            });
        session.set_scope(ResourceKind::Vpc, "prod-vpc").unwrap();
        assert_eq!(session.scope().site_id, "s-2");
        // Unresolvable site ids display as themselves
        assert_eq!(session.scope().site_name, "s-2");
    }

    #[test]
    fn test_report_line_names_how_the_item_was_found() {
        let item = NamedItem::new("prod-vpc", "v-1");
        let matched = report_line("VPC", &item, ResolvedBy::Matched).unwrap();
        assert_eq!(strip_ansi(&matched), "VPC: prod-vpc (matched)");
        let auto = report_line("VPC", &item, ResolvedBy::AutoSelected).unwrap();
        assert_eq!(strip_ansi(&auto), "VPC: prod-vpc (auto-selected)");
        assert!(report_line("VPC", &item, ResolvedBy::Selected).is_none());
    }

    #[test]
    fn test_scope_change_invalidates_scoped_kinds_only() {
        let mut session = session();
        session.fetch(ResourceKind::Site).unwrap();
        session.fetch(ResourceKind::Instance).unwrap();
        session.set_scope(ResourceKind::Site, "east").unwrap();
        assert!(session.resolver().cache().get(ResourceKind::Site).is_some());
        assert!(session.resolver().cache().get(ResourceKind::Instance).is_none());
    }

    #[test]
    fn test_scope_set_refetches_the_scoped_kind() {
        let calls = Rc::new(Cell::new(0));
        let mut session = session();
        let counter = Rc::clone(&calls);
        session
            .resolver_mut()
            .register_fetcher(ResourceKind::Site, move |_: &Scope| {
                counter.set(counter.get() + 1);
                Ok(vec![NamedItem::new("east", "s-1")])
            });
        session.fetch(ResourceKind::Site).unwrap();
        session.set_scope(ResourceKind::Site, "").unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_unknown_scope_target_fails_fast() {
        let mut session = session();
        let err = session.set_scope(ResourceKind::Site, "north").unwrap_err();
        assert_eq!(err.to_string(), "no site matching \"north\" found");
        assert!(session.scope().is_empty());
    }

    #[test]
    fn test_clear_scope() {
        let mut session = session();
        session.set_scope(ResourceKind::Vpc, "prod-vpc").unwrap();
        session.clear_scope();
        assert!(session.scope().is_empty());
    }

    #[test]
    fn test_set_org_invalidates_everything() {
        let mut session = session();
        session.fetch(ResourceKind::Site).unwrap();
        session.set_org("other");
        assert_eq!(session.org(), "other");
        assert!(session.resolver().cache().get(ResourceKind::Site).is_none());
    }

    #[test]
    fn test_cli_equivalent_adds_scope_flags() {
        let mut session = session().with_config_path("~/.bmm/config-dev.yaml");
        session.set_scope(ResourceKind::Vpc, "prod-vpc").unwrap();
        assert_eq!(
            session.cli_equivalent(&["subnet", "list"]),
            "bmm --config \"~/.bmm/config-dev.yaml\" subnet list --site-id s-2 --vpc-id v-1"
        );
        assert_eq!(
            session.cli_equivalent(&["subnet", "get", "sn-1"]),
            "bmm --config \"~/.bmm/config-dev.yaml\" subnet get sn-1"
        );
    }

    #[test]
    fn test_cli_equivalent_quotes_config_path_with_spaces() {
        let session = session().with_config_path("/home/me/My Configs/config.yaml");
        assert_eq!(
            session.cli_equivalent(&["site", "list"]),
            "bmm --config \"/home/me/My Configs/config.yaml\" site list"
        );
    }

    #[test]
    fn test_login_without_method() {
        let mut session = session();
        assert!(!session.has_login());
        assert!(matches!(session.login(), Err(Error::LoginUnavailable)));
    }

    #[test]
    fn test_login_sets_token() {
        let mut session = session().with_login(Box::new(|| Ok("fresh".to_string())));
        session.login().unwrap();
        assert_eq!(session.client().token().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_machine_vpc_names() {
        let mut session = session();
        session.fetch(ResourceKind::Vpc).unwrap();
        let names = session.machine_vpc_names();
        assert_eq!(names.len(), 1);
        assert_eq!(names["m-1"], "dev-vpc, prod-vpc");
    }
}
