//! Time-bounded cache of fetched resource lists, keyed by resource kind.
//!
//! The cache never performs I/O. A stale entry behaves exactly like a missing
//! one for both [`ResourceCache::get`] and the lookup helpers.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;

use crate::resource::{eq_fold, NamedItem, ResourceKind};

/// Default freshness bound for cached lists
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

struct CacheEntry<P> {
    items: Vec<NamedItem<P>>,
    fetched_at: Instant,
}

pub struct ResourceCache<P = serde_json::Value> {
    entries: HashMap<ResourceKind, CacheEntry<P>>,
    ttl: Duration,
}

impl<P> Default for ResourceCache<P> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<P> ResourceCache<P> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached items for `kind`, or `None` if never set or older than the TTL.
    pub fn get(&self, kind: ResourceKind) -> Option<&[NamedItem<P>]> {
        self.get_at(kind, Instant::now())
    }

    /// Same as [`Self::get`], evaluated at `now`.
    ///
    /// An entry exactly `ttl` old is still fresh.
    pub fn get_at(&self, kind: ResourceKind, now: Instant) -> Option<&[NamedItem<P>]> {
        let entry = self.entries.get(&kind)?;
        if now.saturating_duration_since(entry.fetched_at) > self.ttl {
            return None;
        }
        Some(&entry.items)
    }

    pub fn set(&mut self, kind: ResourceKind, items: Vec<NamedItem<P>>) {
        self.set_at(kind, items, Instant::now());
    }

    pub fn set_at(&mut self, kind: ResourceKind, items: Vec<NamedItem<P>>, fetched_at: Instant) {
        debug!("Caching {} {kind} item(s)", items.len());
        self.entries
            .insert(kind, CacheEntry { items, fetched_at });
    }

    pub fn invalidate(&mut self, kind: ResourceKind) {
        if self.entries.remove(&kind).is_some() {
            debug!("Invalidated {kind} cache");
        }
    }

    pub fn invalidate_all(&mut self) {
        debug!("Invalidated all caches");
        self.entries.clear();
    }

    /// Drops every scope-sensitive kind and keeps the rest.
    pub fn invalidate_filtered(&mut self) {
        debug!("Invalidated scope-sensitive caches");
        self.entries.retain(|kind, _| !kind.is_scope_sensitive());
    }

    /// Case-insensitive exact name match among fresh items.
    pub fn lookup_by_name(&self, kind: ResourceKind, name: &str) -> Option<&NamedItem<P>> {
        self.get(kind)?
            .iter()
            .find(|item| eq_fold(&item.name, name))
    }

    /// Exact id match among fresh items.
    pub fn lookup_by_id(&self, kind: ResourceKind, id: &str) -> Option<&NamedItem<P>> {
        self.get(kind)?.iter().find(|item| item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Item = NamedItem<()>;

    fn items() -> Vec<Item> {
        vec![Item::new("alpha", "a-1"), Item::new("beta", "b-1")]
    }

    #[test]
    fn test_get_missing_kind() {
        let cache: ResourceCache<()> = ResourceCache::default();
        assert!(cache.get(ResourceKind::Site).is_none());
    }

    #[test]
    fn test_get_immediately_after_set() {
        let mut cache = ResourceCache::default();
        cache.set(ResourceKind::Site, items());
        let got = cache.get(ResourceKind::Site).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].name, "alpha");
    }

    #[test]
    fn test_ttl_boundary_is_fresh() {
        let mut cache = ResourceCache::default();
        let t0 = Instant::now();
        cache.set_at(ResourceKind::Site, items(), t0);

        assert!(cache.get_at(ResourceKind::Site, t0 + DEFAULT_TTL).is_some());
        assert!(cache
            .get_at(ResourceKind::Site, t0 + DEFAULT_TTL + Duration::from_nanos(1))
            .is_none());
        assert!(cache
            .get_at(ResourceKind::Site, t0 + Duration::from_secs(31))
            .is_none());
    }

    #[test]
    fn test_invalidate_single_kind() {
        let mut cache = ResourceCache::default();
        cache.set(ResourceKind::Site, items());
        cache.set(ResourceKind::Vpc, items());
        cache.invalidate(ResourceKind::Vpc);
        assert!(cache.get(ResourceKind::Vpc).is_none());
        assert!(cache.get(ResourceKind::Site).is_some());
    }

    #[test]
    fn test_invalidate_filtered_keeps_scope_independent_kinds() {
        let mut cache = ResourceCache::default();
        for kind in ResourceKind::ALL {
            cache.set(kind, items());
        }
        cache.invalidate_filtered();
        for kind in ResourceKind::ALL {
            assert_eq!(
                cache.get(kind).is_some(),
                !kind.is_scope_sensitive(),
                "unexpected state for {kind}"
            );
        }
        assert!(cache.get(ResourceKind::Site).is_some());
    }

    #[test]
    fn test_invalidate_all() {
        let mut cache = ResourceCache::default();
        cache.set(ResourceKind::Site, items());
        cache.set(ResourceKind::Audit, items());
        cache.invalidate_all();
        assert!(cache.get(ResourceKind::Site).is_none());
        assert!(cache.get(ResourceKind::Audit).is_none());
    }

    #[test]
    fn test_lookup_by_name_case_insensitive() {
        let mut cache = ResourceCache::default();
        cache.set(ResourceKind::Vpc, items());
        assert_eq!(
            cache.lookup_by_name(ResourceKind::Vpc, "ALPHA").unwrap().id,
            "a-1"
        );
        assert!(cache.lookup_by_name(ResourceKind::Vpc, "alp").is_none());
    }

    #[test]
    fn test_lookup_by_name_folds_non_ascii() {
        let mut cache = ResourceCache::default();
        cache.set(ResourceKind::Site, vec![Item::new("Ålesund", "s-9")]);
        assert_eq!(
            cache.lookup_by_name(ResourceKind::Site, "ÅLESUND").unwrap().id,
            "s-9"
        );
    }

    #[test]
    fn test_lookup_by_id_exact() {
        let mut cache = ResourceCache::default();
        cache.set(ResourceKind::Vpc, items());
        assert_eq!(cache.lookup_by_id(ResourceKind::Vpc, "b-1").unwrap().name, "beta");
        assert!(cache.lookup_by_id(ResourceKind::Vpc, "B-1").is_none());
    }

    #[test]
    fn test_lookup_ignores_stale_entries() {
        let mut cache = ResourceCache::new(Duration::ZERO);
        cache.set(ResourceKind::Vpc, items());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.lookup_by_name(ResourceKind::Vpc, "alpha").is_none());
        assert!(cache.lookup_by_id(ResourceKind::Vpc, "a-1").is_none());
    }
}
