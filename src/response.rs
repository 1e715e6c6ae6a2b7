//! Response header and redirect rules.
//!
//! Plain decisions over the request; the web layer turns them into headers
//! and redirects.

use regex::Regex;

use crate::config::ProxyConfig;
use crate::core::ProxyError;
use crate::utils::url::parse_host;

pub const ROBOTS_HEADER_VALUE: &str = "noindex, nofollow";

#[derive(Debug, Clone)]
pub struct ResponsePolicy {
    robots_everywhere: bool,
    robots_paths: Option<Regex>,
    cors_allowed_domains: Vec<String>,
    default_proxy_domain: Option<String>,
}

impl ResponsePolicy {
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        Ok(Self {
            robots_everywhere: config.robots_header_everywhere,
            robots_paths: compile_path_patterns(&config.robots_paths)?,
            cors_allowed_domains: config
                .cors_allowed_domains
                .iter()
                .map(|domain| domain.trim().trim_start_matches('.').to_lowercase())
                .filter(|domain| !domain.is_empty())
                .collect(),
            default_proxy_domain: config
                .default_proxy_domain
                .as_deref()
                .map(str::trim)
                .filter(|domain| !domain.is_empty())
                .map(str::to_string),
        })
    }

    /// Whether `X-Robots-Tag` should be added for `path`.
    pub fn robots_header(&self, path: &str) -> bool {
        self.robots_everywhere
            || self
                .robots_paths
                .as_ref()
                .is_some_and(|patterns| patterns.is_match(path))
    }

    /// Whether `origin` is one of the allowed domains or a subdomain of one.
    pub fn allows_origin(&self, origin: &str) -> bool {
        let host = parse_host(origin).unwrap_or_else(|| origin.trim().to_lowercase());

        self.cors_allowed_domains
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    }

    /// Location to redirect to when the request did not arrive on the
    /// default proxy domain.
    pub fn redirect_location(&self, host: &str, path: &str, query: Option<&str>) -> Option<String> {
        let domain = self.default_proxy_domain.as_deref()?;

        if host_without_port(host).eq_ignore_ascii_case(host_without_port(domain)) {
            return None;
        }

        let mut location = format!("https://{}/{}", domain, path.trim_start_matches('/'));
        if let Some(query) = query.filter(|query| !query.is_empty()) {
            location.push('?');
            location.push_str(query);
        }
        Some(location)
    }
}

/// `www.hel.fi:443` -> `www.hel.fi`; bracketed IPv6 literals keep their colons.
fn host_without_port(host: &str) -> &str {
    let host = host.trim();
    if let Some(end) = host.strip_prefix('[').and_then(|rest| rest.find(']')) {
        return &host[..end + 2];
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// One anchored alternative per pattern; `*` matches anything.
fn compile_path_patterns(patterns: &[String]) -> Result<Option<Regex>, ProxyError> {
    let alternatives: Vec<String> = patterns
        .iter()
        .map(|pattern| pattern.trim())
        .filter(|pattern| !pattern.is_empty())
        .map(|pattern| regex::escape(pattern).replace(r"\*", ".*"))
        .collect();

    if alternatives.is_empty() {
        return Ok(None);
    }

    Regex::new(&format!("^(?:{})$", alternatives.join("|")))
        .map(Some)
        .map_err(|e| ProxyError::Config(format!("invalid robots path pattern: {e}")))
}
