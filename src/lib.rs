//! # siteproxy
//!
//! Rewrites asset URLs, links and social meta tags in HTML (and in HTML
//! carried by ajax JSON envelopes) served behind a reverse proxy that hosts
//! several language-prefixed sites on one domain and serves static assets
//! from a separate path or CDN origin.
//!
//! ## Modules
//!
//! - `core` - errors, content kinds and the `ProxyManager` engine facade
//! - `config` - configuration model, loading and validation
//! - `selector` - which attributes are rewritten and how
//! - `cdn` - trusted asset origin detection
//! - `site_prefix` - per-language site prefixes and the request context
//! - `resolver` - the attribute value rewrite rules
//! - `parsers` - HTML, JSON and CSS processing
//! - `response` - robots, CORS and redirect rules
//! - `web` - reverse proxy server (optional)

pub mod cdn;
pub mod config;
pub mod core;
pub mod env;
pub mod parsers;
pub mod resolver;
pub mod response;
pub mod selector;
pub mod site_prefix;
pub mod utils;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used items for convenience
pub use crate::config::{ConfigKey, ProxyConfig};
pub use crate::core::{ContentKind, ProxyError, ProxyManager, ProxyResult};
pub use crate::resolver::AttributeResolver;
pub use crate::selector::{default_registry, Locator, Rewrite, Selector, SelectorRegistry, SelectorSpec};
pub use crate::site_prefix::{RequestContext, SitePrefixResolver};
