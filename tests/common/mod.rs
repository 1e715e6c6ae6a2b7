// Shared helpers for the integration tests

#![allow(dead_code)]

use indexmap::IndexMap;

use siteproxy::config::ProxyConfig;
use siteproxy::core::ProxyManager;
use siteproxy::selector::{default_registry, Selector};
use siteproxy::site_prefix::RequestContext;

pub const ASSET_PATH: &str = "test-assets";

/// sv, en and fi prefixes, in that order.
pub fn prefixes() -> IndexMap<String, String> {
    let mut prefixes = IndexMap::new();
    prefixes.insert("sv".to_string(), "prefix-sv".to_string());
    prefixes.insert("en".to_string(), "prefix-en".to_string());
    prefixes.insert("fi".to_string(), "prefix-fi".to_string());
    prefixes
}

pub fn config() -> ProxyConfig {
    ProxyConfig {
        asset_path: Some(ASSET_PATH.to_string()),
        prefixes: prefixes(),
        azure_blob_storage_name: Some("kymp".to_string()),
        ..Default::default()
    }
}

pub fn manager() -> ProxyManager {
    ProxyManager::new(config()).unwrap()
}

pub fn manager_with(config: ProxyConfig) -> ProxyManager {
    ProxyManager::new(config).unwrap()
}

pub fn ctx(path: &str) -> RequestContext {
    RequestContext::new(path, "http", "example.test")
}

pub fn selector(name: &str) -> Selector {
    default_registry().get(name).cloned().unwrap()
}
