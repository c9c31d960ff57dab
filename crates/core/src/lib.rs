//! BMM Core Library
//!
//! This crate provides the terminal-independent parts of the bmm interactive
//! client: the resource model, a TTL cache of fetched resource lists, a
//! resolver that turns names or ids into resources, configuration handling,
//! and a blocking REST client for the BMM API.
//!
//! # Key Features
//!
//! - **Resource Model**: A closed set of resource kinds projected into uniform named items
//! - **Resource Cache**: Per-kind lists with a freshness bound and scope-aware invalidation
//! - **Resolver**: Name/ID matching with an interactive fallback behind a `Selector` trait
//! - **Configuration Management**: YAML configuration with token priority and safe saving
//! - **API Client**: Paginated list fetching and item get/create/delete
//! - **Error Handling**: One error type for terminal, resolution, and upstream failures
//!
//! # Examples
//!
//! Resolving a VPC by name from the cache:
//!
//! ```
//! use bmm_core::cache::ResourceCache;
//! use bmm_core::error::{Error, Result};
//! use bmm_core::resolver::{Resolver, Selector};
//! use bmm_core::resource::{NamedItem, ResourceKind, Scope, SelectItem};
//!
//! struct NoTerminal;
//!
//! impl Selector for NoTerminal {
//!     fn select(&mut self, _: &str, _: &[SelectItem]) -> Result<SelectItem> {
//!         Err(Error::Cancelled("selection cancelled".to_string()))
//!     }
//! }
//!
//! let mut resolver: Resolver<()> = Resolver::new(ResourceCache::default(), Box::new(NoTerminal));
//! resolver.register_fetcher(ResourceKind::Vpc, |_scope| {
//!     Ok(vec![NamedItem::new("prod-vpc", "v-1"), NamedItem::new("dev-vpc", "v-2")])
//! });
//!
//! let found = resolver.resolve_with_args(ResourceKind::Vpc, &Scope::default(), "VPC", &["PROD-VPC"])?;
//! assert_eq!(found.item.id, "v-1");
//! # Ok::<(), bmm_core::error::Error>(())
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod projection;
pub mod resolver;
pub mod resource;
