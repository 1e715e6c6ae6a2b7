//! Proxy configuration.
//!
//! Configuration comes from a TOML or JSON file, with environment variables
//! applied on top once, at construction time. The rewrite engine only ever
//! sees the resulting read-only [`ProxyConfig`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ProxyError;
use crate::selector::{SelectorRegistry, SelectorSpec};
use crate::utils::url::parse_host_name;

/// Places searched when no explicit configuration file is given.
pub const CONFIG_PATHS: &[&str] = &["siteproxy.toml", "/etc/siteproxy/siteproxy.toml"];

pub const DEFAULT_IMAGE_STYLE_PATTERN: &str = "/files/styles/";

fn default_image_style_pattern() -> String {
    DEFAULT_IMAGE_STYLE_PATTERN.to_string()
}

fn default_cors_allowed_domains() -> Vec<String> {
    vec!["hel.fi".to_string(), "docker.so".to_string()]
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Path segment static assets are served under, e.g. `assets`.
    pub asset_path: Option<String>,

    /// Language code to site prefix segment, in priority order.
    pub prefixes: IndexMap<String, String>,

    /// Stage file proxy origin; values on this host are never rewritten.
    pub stage_file_proxy_origin: Option<String>,

    /// Blob storage account; `{name}.blob.core.windows.net` is never rewritten.
    pub azure_blob_storage_name: Option<String>,

    /// Hostname of the backend itself.
    pub hostname: Option<String>,

    /// Marker identifying on-demand generated image derivatives.
    #[serde(default = "default_image_style_pattern")]
    pub image_style_pattern: String,

    /// Domain every request is redirected to, when set.
    pub default_proxy_domain: Option<String>,

    /// Path patterns that get `X-Robots-Tag: noindex, nofollow`.
    pub robots_paths: Vec<String>,

    /// Add the robots header to every response.
    pub robots_header_everywhere: bool,

    /// Origins (and their subdomains) allowed cross-origin access.
    #[serde(default = "default_cors_allowed_domains")]
    pub cors_allowed_domains: Vec<String>,

    /// Selectors appended to the default registry.
    pub selectors: Vec<SelectorSpec>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            asset_path: None,
            prefixes: IndexMap::new(),
            stage_file_proxy_origin: None,
            azure_blob_storage_name: None,
            hostname: None,
            image_style_pattern: default_image_style_pattern(),
            default_proxy_domain: None,
            robots_paths: Vec::new(),
            robots_header_everywhere: false,
            cors_allowed_domains: default_cors_allowed_domains(),
            selectors: Vec::new(),
        }
    }
}

impl ProxyConfig {
    /// Reads `path`; `.toml` files are parsed as TOML, anything else as JSON.
    pub fn load_from_file(path: &Path) -> Result<Self, ProxyError> {
        let content = std::fs::read_to_string(path)?;

        let config: ProxyConfig = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        tracing::info!(path = %path.display(), "Loaded proxy configuration");
        Ok(config)
    }

    /// Loads the explicit file, else `SITEPROXY_CONFIG`, else the first
    /// existing [`CONFIG_PATHS`] entry, else defaults. Environment overrides
    /// are applied and the result validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ProxyError> {
        use crate::env::{core::ConfigPath, EnvVar};

        let path: Option<PathBuf> = explicit
            .map(Path::to_path_buf)
            .or_else(|| ConfigPath::get_opt().map(PathBuf::from))
            .or_else(|| {
                CONFIG_PATHS
                    .iter()
                    .map(PathBuf::from)
                    .find(|candidate| candidate.exists())
            });

        let mut config = match path {
            Some(path) => Self::load_from_file(&path)?,
            None => {
                tracing::info!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Fills unset fields from the environment.
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{cdn, headers, EnvVar};

        if self.stage_file_proxy_origin.is_none() {
            self.stage_file_proxy_origin = cdn::StageFileProxyOrigin::get_opt();
        }

        if self.azure_blob_storage_name.is_none() {
            match cdn::AzureBlobStorageName::get() {
                Ok(name) => self.azure_blob_storage_name = Some(name),
                Err(e) if std::env::var(cdn::AzureBlobStorageName::NAME).is_ok() => {
                    tracing::warn!("Ignoring blob storage setting: {}", e);
                }
                Err(_) => {}
            }
        }

        if self.hostname.is_none() {
            self.hostname = hostname_from_env();
        }

        if let Ok(true) = headers::RobotsTagEverywhere::get() {
            self.robots_header_everywhere = true;
        }
    }

    /// Semantic checks; serde already handled the syntax.
    pub fn validate(&self) -> Result<(), ProxyError> {
        if let Some(asset_path) = &self.asset_path {
            if !asset_path.is_empty() && asset_path.trim_matches('/').is_empty() {
                return Err(ProxyError::Config(format!(
                    "asset_path '{asset_path}' has no path segment"
                )));
            }
        }

        for (langcode, segment) in &self.prefixes {
            if langcode.trim().is_empty() {
                return Err(ProxyError::Config("prefix language code cannot be empty".to_string()));
            }
            if segment.trim().is_empty() {
                return Err(ProxyError::Config(format!(
                    "prefix for language '{langcode}' cannot be empty"
                )));
            }
            if segment.starts_with('/') || segment.ends_with('/') {
                return Err(ProxyError::Config(format!(
                    "prefix '{segment}' for language '{langcode}' must not start or end with '/'"
                )));
            }
        }

        if self.image_style_pattern.is_empty() {
            return Err(ProxyError::Config("image_style_pattern cannot be empty".to_string()));
        }

        for pattern in &self.robots_paths {
            if pattern.trim().is_empty() {
                return Err(ProxyError::Config("robots path pattern cannot be empty".to_string()));
            }
        }

        SelectorRegistry::from_specs(&self.selectors)?;

        Ok(())
    }

    /// Asset path without surrounding slashes; `None` when unset or empty.
    pub fn asset_path(&self) -> Option<&str> {
        self.asset_path
            .as_deref()
            .map(|path| path.trim_matches('/'))
            .filter(|path| !path.is_empty())
    }

    pub fn is_configured(&self, key: ConfigKey) -> bool {
        !is_empty_value(&self.value_of(key))
    }

    /// Value of `key`, or `default` when it is not configured.
    pub fn get_config(&self, key: ConfigKey, default: Value) -> Value {
        let value = self.value_of(key);
        if is_empty_value(&value) {
            default
        } else {
            value
        }
    }

    fn value_of(&self, key: ConfigKey) -> Value {
        match key {
            ConfigKey::AssetPath => self.asset_path().map(Value::from).unwrap_or(Value::Null),
            ConfigKey::Prefixes => serde_json::to_value(&self.prefixes).unwrap_or(Value::Null),
            ConfigKey::StageFileProxyOrigin => to_value(&self.stage_file_proxy_origin),
            ConfigKey::AzureBlobStorageName => to_value(&self.azure_blob_storage_name),
            ConfigKey::Hostname => to_value(&self.hostname),
            ConfigKey::ImageStylePattern => Value::from(self.image_style_pattern.as_str()),
            ConfigKey::DefaultProxyDomain => to_value(&self.default_proxy_domain),
            ConfigKey::RobotsPaths => Value::from(self.robots_paths.clone()),
            ConfigKey::CorsAllowedDomains => Value::from(self.cors_allowed_domains.clone()),
        }
    }
}

fn to_value(value: &Option<String>) -> Value {
    match value {
        Some(value) => Value::from(value.as_str()),
        None => Value::Null,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Backend hostname from the environment.
///
/// `APP_ENV=dev` uses `HOSTNAME` verbatim; otherwise the first of
/// `DRUPAL_BACKEND_DOMAIN`, `DRUPAL_ROUTES` and `DRUPAL_REVERSE_PROXY_ADDRESS`
/// that is set, parsed as a host list.
pub fn hostname_from_env() -> Option<String> {
    use crate::env::{hostname, EnvVar};

    if hostname::AppEnv::get_opt().as_deref() == Some("dev") {
        if let Some(host) = hostname::Hostname::get_opt() {
            return Some(host);
        }
    }

    hostname::BackendDomain::get_opt()
        .or_else(hostname::Routes::get_opt)
        .or_else(hostname::ReverseProxyAddress::get_opt)
        .map(|hosts| parse_host_name(&hosts))
        .filter(|host| !host.is_empty())
}

/// Names of the settings exposed to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    AssetPath,
    Prefixes,
    StageFileProxyOrigin,
    AzureBlobStorageName,
    Hostname,
    ImageStylePattern,
    DefaultProxyDomain,
    RobotsPaths,
    CorsAllowedDomains,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 9] = [
        ConfigKey::AssetPath,
        ConfigKey::Prefixes,
        ConfigKey::StageFileProxyOrigin,
        ConfigKey::AzureBlobStorageName,
        ConfigKey::Hostname,
        ConfigKey::ImageStylePattern,
        ConfigKey::DefaultProxyDomain,
        ConfigKey::RobotsPaths,
        ConfigKey::CorsAllowedDomains,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::AssetPath => "asset_path",
            ConfigKey::Prefixes => "prefixes",
            ConfigKey::StageFileProxyOrigin => "stage_file_proxy_origin",
            ConfigKey::AzureBlobStorageName => "azure_blob_storage_name",
            ConfigKey::Hostname => "hostname",
            ConfigKey::ImageStylePattern => "image_style_pattern",
            ConfigKey::DefaultProxyDomain => "default_proxy_domain",
            ConfigKey::RobotsPaths => "robots_paths",
            ConfigKey::CorsAllowedDomains => "cors_allowed_domains",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ProxyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .iter()
            .find(|candidate| candidate.as_str() == key)
            .copied()
            .ok_or_else(|| ProxyError::Config(format!("unknown configuration key '{key}'")))
    }
}
