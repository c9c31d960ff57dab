//! Name/ID resolution over the resource cache with interactive fallback.
//!
//! The resolver owns the [`ResourceCache`] and one fetch callback per
//! [`ResourceKind`]. Interactive selection is delegated to a [`Selector`], so
//! the resolver itself never touches the terminal.

use std::collections::HashMap;

use log::debug;

use crate::cache::ResourceCache;
use crate::error::{Error, Result};
use crate::resource::{NamedItem, ResourceKind, Scope, SelectItem};

/// Presents a list of items and returns the one the user picked.
pub trait Selector {
    fn select(&mut self, label: &str, items: &[SelectItem]) -> Result<SelectItem>;
}

/// Fetch callback producing the full list for one kind under a scope.
pub type Fetcher<P> = Box<dyn FnMut(&Scope) -> Result<Vec<NamedItem<P>>>>;

/// How a resolution was reached, so the caller can report it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResolvedBy {
    /// The list held exactly one item
    AutoSelected,
    /// An argument matched the item's name or id
    Matched,
    /// The user picked the item from the selector
    Selected,
}

#[derive(Clone, Debug)]
pub struct Resolution<P = serde_json::Value> {
    pub item: NamedItem<P>,
    pub by: ResolvedBy,
}

pub struct Resolver<P = serde_json::Value> {
    cache: ResourceCache<P>,
    fetchers: HashMap<ResourceKind, Fetcher<P>>,
    selector: Box<dyn Selector>,
}

impl<P: Clone> Resolver<P> {
    pub fn new(cache: ResourceCache<P>, selector: Box<dyn Selector>) -> Self {
        Self {
            cache,
            fetchers: HashMap::new(),
            selector,
        }
    }

    pub fn register_fetcher<F>(&mut self, kind: ResourceKind, fetcher: F)
    where
        F: FnMut(&Scope) -> Result<Vec<NamedItem<P>>> + 'static,
    {
        self.fetchers.insert(kind, Box::new(fetcher));
    }

    pub fn cache(&self) -> &ResourceCache<P> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResourceCache<P> {
        &mut self.cache
    }

    /// Cached items for `kind`, fetching and caching them on a miss.
    ///
    /// Fetch errors are returned unchanged and leave the cache untouched.
    pub fn fetch(&mut self, kind: ResourceKind, scope: &Scope) -> Result<Vec<NamedItem<P>>> {
        if let Some(items) = self.cache.get(kind) {
            debug!("Cache hit for {kind}");
            return Ok(items.to_vec());
        }

        let fetcher = self
            .fetchers
            .get_mut(&kind)
            .ok_or_else(|| Error::NoFetcher(kind.to_string()))?;

        debug!("Cache miss for {kind}, fetching");
        let items = fetcher(scope)?;
        self.cache.set(kind, items.clone());
        Ok(items)
    }

    /// Fetched items whose `extra[key]` equals `value`.
    pub fn fetch_filtered(
        &mut self,
        kind: ResourceKind,
        scope: &Scope,
        key: &str,
        value: &str,
    ) -> Result<Vec<NamedItem<P>>> {
        Ok(self
            .fetch(kind, scope)?
            .into_iter()
            .filter(|item| item.extra.get(key).is_some_and(|v| v == value))
            .collect())
    }

    /// Fetches `kind` and lets the user choose among the results.
    pub fn resolve(
        &mut self,
        kind: ResourceKind,
        scope: &Scope,
        label: &str,
    ) -> Result<Resolution<P>> {
        let items = self.fetch(kind, scope)?;
        self.select_from_items(label, items)
    }

    pub fn resolve_filtered(
        &mut self,
        kind: ResourceKind,
        scope: &Scope,
        label: &str,
        key: &str,
        value: &str,
    ) -> Result<Resolution<P>> {
        let items = self.fetch_filtered(kind, scope, key, value)?;
        self.select_from_items(label, items)
    }

    /// Resolves from the first argument if there is one, else interactively.
    ///
    /// A non-empty `args[0]` is matched case-insensitively against each
    /// item's name or id. A miss is an error and never falls back to the
    /// selector, so scripted input cannot block on the terminal.
    pub fn resolve_with_args<S: AsRef<str>>(
        &mut self,
        kind: ResourceKind,
        scope: &Scope,
        label: &str,
        args: &[S],
    ) -> Result<Resolution<P>> {
        let items = self.fetch(kind, scope)?;

        if let Some(query) = args.first().map(AsRef::as_ref).filter(|q| !q.is_empty()) {
            return items
                .into_iter()
                .find(|item| item.matches(query))
                .map(|item| Resolution {
                    item,
                    by: ResolvedBy::Matched,
                })
                .ok_or_else(|| Error::no_match(kind.as_str(), query));
        }

        self.select_from_items(label, items)
    }

    /// Picks one of `items`, auto-selecting a lone item.
    pub fn select_from_items(
        &mut self,
        label: &str,
        items: Vec<NamedItem<P>>,
    ) -> Result<Resolution<P>> {
        if items.is_empty() {
            return Err(Error::NoItems(label.to_string()));
        }

        if items.len() == 1 {
            let mut items = items;
            return Ok(Resolution {
                item: items.remove(0),
                by: ResolvedBy::AutoSelected,
            });
        }

        let select_items: Vec<SelectItem> = items.iter().map(to_select_item).collect();
        let selected = self.selector.select(&format!("{label}:"), &select_items)?;

        items
            .into_iter()
            .find(|item| item.id == selected.id)
            .map(|item| Resolution {
                item,
                by: ResolvedBy::Selected,
            })
            .ok_or(Error::SelectedNotFound)
    }

    /// Display name for `id`, or `id` itself when it isn't cached.
    pub fn resolve_id(&self, kind: ResourceKind, id: &str) -> String {
        self.cache
            .lookup_by_id(kind, id)
            .map_or_else(|| id.to_string(), |item| item.name.clone())
    }

    /// Id for a cached `name`.
    pub fn resolve_name(&self, kind: ResourceKind, name: &str) -> Option<String> {
        self.cache
            .lookup_by_name(kind, name)
            .map(|item| item.id.clone())
    }
}

fn to_select_item<P>(item: &NamedItem<P>) -> SelectItem {
    let mut select_item = SelectItem::new(item.name.clone(), item.id.clone());
    if !item.status.is_empty() {
        select_item
            .extra
            .insert("status".to_string(), item.status.clone());
    }
    select_item
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type Item = NamedItem<()>;

    /// Records invocations and picks a fixed index.
    struct ScriptedSelector {
        calls: Rc<Cell<usize>>,
        pick: usize,
    }

    impl Selector for ScriptedSelector {
        fn select(&mut self, _label: &str, items: &[SelectItem]) -> Result<SelectItem> {
            self.calls.set(self.calls.get() + 1);
            items.get(self.pick).cloned().ok_or(Error::NoItemsToSelect)
        }
    }

    fn resolver(pick: usize) -> (Resolver<()>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let selector = ScriptedSelector {
            calls: calls.clone(),
            pick,
        };
        (
            Resolver::new(ResourceCache::default(), Box::new(selector)),
            calls,
        )
    }

    fn vpcs() -> Vec<Item> {
        vec![
            Item::new("prod-vpc", "v-1").with_status("Ready"),
            Item::new("dev-vpc", "v-2"),
        ]
    }

    #[test]
    fn test_fetch_uses_cache_after_first_call() {
        let (mut resolver, _) = resolver(0);
        let fetches = Rc::new(Cell::new(0));
        let counter = fetches.clone();
        resolver.register_fetcher(ResourceKind::Vpc, move |_| {
            counter.set(counter.get() + 1);
            Ok(vpcs())
        });

        let scope = Scope::default();
        assert_eq!(resolver.fetch(ResourceKind::Vpc, &scope).unwrap().len(), 2);
        assert_eq!(resolver.fetch(ResourceKind::Vpc, &scope).unwrap().len(), 2);
        assert_eq!(fetches.get(), 1);

        resolver.cache_mut().invalidate(ResourceKind::Vpc);
        resolver.fetch(ResourceKind::Vpc, &scope).unwrap();
        assert_eq!(fetches.get(), 2);
    }

    #[test]
    fn test_fetch_passes_scope_to_fetcher() {
        let (mut resolver, _) = resolver(0);
        let seen = Rc::new(RefCell::new(String::new()));
        let sink = seen.clone();
        resolver.register_fetcher(ResourceKind::Vpc, move |scope| {
            *sink.borrow_mut() = scope.site_id.clone();
            Ok(vpcs())
        });
        let scope = Scope {
            site_id: "s-9".into(),
            ..Scope::default()
        };
        resolver.fetch(ResourceKind::Vpc, &scope).unwrap();
        assert_eq!(*seen.borrow(), "s-9");
    }

    #[test]
    fn test_fetch_error_propagates_unchanged() {
        let (mut resolver, _) = resolver(0);
        resolver.register_fetcher(ResourceKind::Vpc, |_| {
            Err(Error::Api {
                status: 503,
                body: "down".into(),
            })
        });
        let err = resolver
            .fetch(ResourceKind::Vpc, &Scope::default())
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 503, .. }));
        assert!(resolver.cache().get(ResourceKind::Vpc).is_none());
    }

    #[test]
    fn test_fetch_without_fetcher() {
        let (mut resolver, _) = resolver(0);
        assert!(matches!(
            resolver.fetch(ResourceKind::Rack, &Scope::default()),
            Err(Error::NoFetcher(_))
        ));
    }

    #[test]
    fn test_resolve_with_args_matches_without_selector() {
        let (mut resolver, calls) = resolver(0);
        resolver.cache_mut().set(ResourceKind::Vpc, vpcs());

        let resolution = resolver
            .resolve_with_args(ResourceKind::Vpc, &Scope::default(), "VPC", &["PROD-VPC"])
            .unwrap();
        assert_eq!(resolution.item.id, "v-1");
        assert_eq!(resolution.by, ResolvedBy::Matched);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_resolve_with_args_matches_by_id() {
        let (mut resolver, calls) = resolver(0);
        resolver.cache_mut().set(ResourceKind::Vpc, vpcs());
        let resolution = resolver
            .resolve_with_args(ResourceKind::Vpc, &Scope::default(), "VPC", &["V-2"])
            .unwrap();
        assert_eq!(resolution.item.name, "dev-vpc");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_resolve_with_args_no_match_fails_fast() {
        let (mut resolver, calls) = resolver(0);
        resolver.cache_mut().set(ResourceKind::Vpc, vpcs());
        let err = resolver
            .resolve_with_args(ResourceKind::Vpc, &Scope::default(), "VPC", &["staging"])
            .unwrap_err();
        assert_eq!(err.to_string(), "no vpc matching \"staging\" found");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_resolve_with_empty_args_uses_selector() {
        let (mut resolver, calls) = resolver(1);
        resolver.cache_mut().set(ResourceKind::Vpc, vpcs());
        let no_args: [&str; 0] = [];
        let resolution = resolver
            .resolve_with_args(ResourceKind::Vpc, &Scope::default(), "VPC", &no_args)
            .unwrap();
        assert_eq!(resolution.item.id, "v-2");
        assert_eq!(resolution.by, ResolvedBy::Selected);
        assert_eq!(calls.get(), 1);

        resolver
            .resolve_with_args(ResourceKind::Vpc, &Scope::default(), "VPC", &[""])
            .unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_resolve_single_item_auto_selects() {
        let (mut resolver, calls) = resolver(0);
        resolver
            .cache_mut()
            .set(ResourceKind::Site, vec![Item::new("east", "s-1")]);
        let resolution = resolver
            .resolve(ResourceKind::Site, &Scope::default(), "Site")
            .unwrap();
        assert_eq!(resolution.by, ResolvedBy::AutoSelected);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_resolve_empty_list_errors() {
        let (mut resolver, _) = resolver(0);
        resolver.cache_mut().set(ResourceKind::Site, vec![]);
        let err = resolver
            .resolve(ResourceKind::Site, &Scope::default(), "Site")
            .unwrap_err();
        assert_eq!(err.to_string(), "no Site available");
    }

    #[test]
    fn test_selector_receives_status_and_colon_label() {
        struct Inspect;
        impl Selector for Inspect {
            fn select(&mut self, label: &str, items: &[SelectItem]) -> Result<SelectItem> {
                assert_eq!(label, "VPC:");
                assert_eq!(items[0].extra.get("status").map(String::as_str), Some("Ready"));
                assert!(items[1].extra.get("status").is_none());
                Ok(items[0].clone())
            }
        }
        let mut resolver: Resolver<()> =
            Resolver::new(ResourceCache::default(), Box::new(Inspect));
        resolver.cache_mut().set(ResourceKind::Vpc, vpcs());
        let resolution = resolver
            .resolve(ResourceKind::Vpc, &Scope::default(), "VPC")
            .unwrap();
        assert_eq!(resolution.item.id, "v-1");
    }

    #[test]
    fn test_selected_item_not_found() {
        struct Stranger;
        impl Selector for Stranger {
            fn select(&mut self, _: &str, _: &[SelectItem]) -> Result<SelectItem> {
                Ok(SelectItem::new("ghost", "nope"))
            }
        }
        let mut resolver: Resolver<()> =
            Resolver::new(ResourceCache::default(), Box::new(Stranger));
        resolver.cache_mut().set(ResourceKind::Vpc, vpcs());
        assert!(matches!(
            resolver.resolve(ResourceKind::Vpc, &Scope::default(), "VPC"),
            Err(Error::SelectedNotFound)
        ));
    }

    #[test]
    fn test_resolve_filtered_narrows_by_extra() {
        let (mut resolver, _) = resolver(0);
        resolver.cache_mut().set(
            ResourceKind::Subnet,
            vec![
                Item::new("a", "n-1").with_extra("vpcId", "v-1"),
                Item::new("b", "n-2").with_extra("vpcId", "v-2"),
            ],
        );
        let resolution = resolver
            .resolve_filtered(ResourceKind::Subnet, &Scope::default(), "Subnet", "vpcId", "v-2")
            .unwrap();
        assert_eq!(resolution.item.id, "n-2");
        assert_eq!(resolution.by, ResolvedBy::AutoSelected);
    }

    #[test]
    fn test_resolve_id_never_fetches() {
        let (mut resolver, _) = resolver(0);
        let fetches = Rc::new(Cell::new(0));
        let counter = fetches.clone();
        resolver.register_fetcher(ResourceKind::Site, move |_| {
            counter.set(counter.get() + 1);
            Ok(vec![])
        });

        assert_eq!(resolver.resolve_id(ResourceKind::Site, "s-1"), "s-1");
        assert_eq!(fetches.get(), 0);

        resolver
            .cache_mut()
            .set(ResourceKind::Site, vec![Item::new("east", "s-1")]);
        assert_eq!(resolver.resolve_id(ResourceKind::Site, "s-1"), "east");
        assert_eq!(
            resolver.resolve_name(ResourceKind::Site, "EAST"),
            Some("s-1".to_string())
        );
    }
}
