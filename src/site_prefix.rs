//! Language/site prefixes.
//!
//! Several site instances share one domain, each under its own per-language
//! path segment, e.g. `/fi/prefix-fi/...`. The resolver answers which segment
//! belongs to a language and which one is active for the current request.

use std::cell::OnceCell;

use indexmap::IndexMap;

/// The current request, as seen by the rewrite engine.
///
/// Carries a per-request memo of the active prefix; a new context is created
/// for every request so the memo never outlives it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub path: String,
    pub scheme: String,
    pub host: String,
    active_prefix: OnceCell<Option<String>>,
}

impl RequestContext {
    pub fn new(path: &str, scheme: &str, host: &str) -> Self {
        Self {
            path: path.to_string(),
            scheme: scheme.to_string(),
            host: host.to_string(),
            active_prefix: OnceCell::new(),
        }
    }

    /// `{scheme}://{host}`
    pub fn scheme_and_host(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Active prefix for this request, computed at most once.
    pub fn active_prefix(&self, resolver: &SitePrefixResolver) -> Option<&str> {
        self.active_prefix
            .get_or_init(|| resolver.active_prefix_for_path(&self.path))
            .as_deref()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("/", "http", "localhost")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitePrefixResolver {
    prefixes: IndexMap<String, String>,
}

impl SitePrefixResolver {
    pub fn new(prefixes: IndexMap<String, String>) -> Self {
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &IndexMap<String, String> {
        &self.prefixes
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Segment configured for `langcode`.
    pub fn prefix_for(&self, langcode: &str) -> Option<&str> {
        self.prefixes.get(langcode).map(String::as_str)
    }

    /// First `/{langcode}/{segment}` whose segment occurs in `path`, in
    /// configuration order.
    pub fn active_prefix_for_path(&self, path: &str) -> Option<String> {
        self.prefixes
            .iter()
            .find(|(_, segment)| !segment.is_empty() && path.contains(segment.as_str()))
            .map(|(langcode, segment)| format!("/{langcode}/{segment}"))
    }

    /// True when any configured segment occurs in `value`.
    ///
    /// Substring containment, not a path segment match: `/foo-prefix-fi-bar`
    /// counts as prefixed when `prefix-fi` is configured.
    pub fn contains_any_prefix(&self, value: &str) -> bool {
        self.prefixes
            .values()
            .any(|segment| !segment.is_empty() && value.contains(segment.as_str()))
    }

    /// Strips a leading configured segment from an incoming path.
    ///
    /// `/prefix-fi/node/1` becomes `/node/1`; other paths are returned as-is.
    pub fn process_inbound(&self, path: &str) -> String {
        let trimmed = path.trim_matches('/');
        let (first, rest) = match trimmed.split_once('/') {
            Some((first, rest)) => (first, rest),
            None => (trimmed, ""),
        };

        if self.prefixes.values().any(|segment| segment == first) {
            format!("/{rest}")
        } else {
            path.to_string()
        }
    }

    /// Segment to append to an outgoing URL's language prefix, e.g. `prefix-fi/`.
    pub fn process_outbound(&self, langcode: Option<&str>) -> Option<String> {
        langcode
            .and_then(|langcode| self.prefix_for(langcode))
            .filter(|segment| !segment.is_empty())
            .map(|segment| format!("{segment}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> SitePrefixResolver {
        let mut prefixes = IndexMap::new();
        prefixes.insert("sv".to_string(), "prefix-sv".to_string());
        prefixes.insert("en".to_string(), "prefix-en".to_string());
        prefixes.insert("fi".to_string(), "prefix-fi".to_string());
        SitePrefixResolver::new(prefixes)
    }

    #[test]
    fn prefix_lookup() {
        let resolver = resolver();
        assert_eq!(resolver.prefix_for("fi"), Some("prefix-fi"));
        assert_eq!(resolver.prefix_for("de"), None);
    }

    #[test]
    fn active_prefix_follows_path() {
        let resolver = resolver();
        assert_eq!(
            resolver.active_prefix_for_path("/fi/prefix-fi/page"),
            Some("/fi/prefix-fi".to_string())
        );
        assert_eq!(
            resolver.active_prefix_for_path("/en/prefix-en"),
            Some("/en/prefix-en".to_string())
        );
        assert_eq!(resolver.active_prefix_for_path("/fi/other"), None);
    }

    #[test]
    fn active_prefix_is_scoped_to_the_context() {
        let resolver = resolver();

        let first = RequestContext::new("/fi/prefix-fi/page", "https", "www.hel.fi");
        assert_eq!(first.active_prefix(&resolver), Some("/fi/prefix-fi"));

        let second = RequestContext::new("/sv/prefix-sv/sida", "https", "www.hel.fi");
        assert_eq!(second.active_prefix(&resolver), Some("/sv/prefix-sv"));

        let third = RequestContext::new("/", "https", "www.hel.fi");
        assert_eq!(third.active_prefix(&resolver), None);
    }

    #[test]
    fn inbound_strips_known_segment() {
        let resolver = resolver();
        assert_eq!(resolver.process_inbound("/prefix-fi/node/1"), "/node/1");
        assert_eq!(resolver.process_inbound("/prefix-fi"), "/");
        assert_eq!(resolver.process_inbound("/node/1"), "/node/1");
    }

    #[test]
    fn outbound_adds_language_segment() {
        let resolver = resolver();
        assert_eq!(resolver.process_outbound(Some("sv")), Some("prefix-sv/".to_string()));
        assert_eq!(resolver.process_outbound(Some("zxx")), None);
        assert_eq!(resolver.process_outbound(None), None);
    }
}
