//! Attribute value resolver.
//!
//! Given a selector's [`Rewrite`] strategy, the current [`RequestContext`] and
//! a raw attribute value, decides what the value should become. The first
//! matching rule wins:
//!
//! 1. empty values are left alone
//! 2. values on a trusted CDN origin are left alone
//! 3. image style derivatives are pointed at the backend's own host
//! 4. always-absolute values become `{scheme}://{host}/{asset_path}/...`
//! 5. other absolute values (`http...`, `//...`) are left alone
//! 6. links get the active site prefix
//! 7. multi-value attributes get the asset path per entry
//! 8. everything else gets the asset path
//!
//! Resolution is total: a value that cannot be classified is returned as-is.
//! Unchanged values are returned borrowed.

use std::borrow::Cow;

use crate::cdn::CdnPatterns;
use crate::config::ProxyConfig;
use crate::selector::{Rewrite, Selector};
use crate::site_prefix::{RequestContext, SitePrefixResolver};
use crate::utils::url::{convert_absolute_to_relative, is_absolute, is_root_relative, parse_host};

#[derive(Debug, Clone)]
pub struct AttributeResolver {
    asset_path: Option<String>,
    hostname: Option<String>,
    image_style_pattern: String,
    cdn: CdnPatterns,
    prefixes: SitePrefixResolver,
}

impl AttributeResolver {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            asset_path: config.asset_path().map(str::to_string),
            hostname: config
                .hostname
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_lowercase),
            image_style_pattern: config.image_style_pattern.clone(),
            cdn: CdnPatterns::new(
                config.stage_file_proxy_origin.as_deref(),
                config.azure_blob_storage_name.as_deref(),
            ),
            prefixes: SitePrefixResolver::new(config.prefixes.clone()),
        }
    }

    pub fn asset_path(&self) -> Option<&str> {
        self.asset_path.as_deref()
    }

    pub fn cdn(&self) -> &CdnPatterns {
        &self.cdn
    }

    pub fn prefixes(&self) -> &SitePrefixResolver {
        &self.prefixes
    }

    /// Resolves a possibly absent attribute value.
    pub fn resolve_opt<'v>(
        &self,
        selector: &Selector,
        ctx: &RequestContext,
        value: Option<&'v str>,
    ) -> Option<Cow<'v, str>> {
        value.map(|value| self.resolve(selector, ctx, value))
    }

    pub fn resolve<'v>(
        &self,
        selector: &Selector,
        ctx: &RequestContext,
        value: &'v str,
    ) -> Cow<'v, str> {
        self.resolve_with(&selector.rewrite, ctx, value)
    }

    pub fn resolve_with<'v>(
        &self,
        rewrite: &Rewrite,
        ctx: &RequestContext,
        value: &'v str,
    ) -> Cow<'v, str> {
        if value.is_empty() || self.cdn.is_cdn_address(value) {
            return Cow::Borrowed(value);
        }

        if self.is_image_style(value) {
            return self.handle_image_style(rewrite, ctx, value);
        }

        match rewrite {
            Rewrite::AbsoluteUri => return self.handle_always_absolute(ctx, value),
            Rewrite::ForceRelative => return self.handle_force_relative(ctx, value),
            _ => {}
        }

        if is_absolute(value) {
            return Cow::Borrowed(value);
        }

        match rewrite {
            Rewrite::SitePrefix => self.handle_site_prefix(ctx, value),
            Rewrite::MultiValue { separator } => {
                self.handle_multi_value(value, separator, |item| self.multi_value_item(item))
            }
            _ => self.add_asset_path(value),
        }
    }

    /// `/{asset_path}/{value}`, or `value` when no asset path is configured.
    pub fn add_asset_path<'v>(&self, value: &'v str) -> Cow<'v, str> {
        match &self.asset_path {
            Some(asset_path) => {
                Cow::Owned(format!("/{}/{}", asset_path, value.trim_start_matches('/')))
            }
            None => Cow::Borrowed(value),
        }
    }

    /// Inverse of [`add_asset_path`](Self::add_asset_path). Values outside the
    /// asset path come back as-is.
    pub fn strip_asset_path<'v>(&self, value: &'v str) -> Cow<'v, str> {
        let Some(asset_path) = &self.asset_path else {
            return Cow::Borrowed(value);
        };

        let rest = value
            .strip_prefix('/')
            .and_then(|v| v.strip_prefix(asset_path.as_str()));

        match rest {
            Some("") => Cow::Borrowed("/"),
            Some(rest) if rest.starts_with('/') => Cow::Borrowed(rest),
            _ => Cow::Borrowed(value),
        }
    }

    fn is_image_style(&self, value: &str) -> bool {
        !self.image_style_pattern.is_empty() && value.contains(self.image_style_pattern.as_str())
    }

    fn handle_image_style<'v>(
        &self,
        rewrite: &Rewrite,
        ctx: &RequestContext,
        value: &'v str,
    ) -> Cow<'v, str> {
        match rewrite.separator() {
            Some(separator) => {
                self.handle_multi_value(value, separator, |item| self.add_domain(ctx, item))
            }
            None => self.add_domain(ctx, value),
        }
    }

    /// Serves a relative value from the backend host instead of the asset origin.
    fn add_domain<'v>(&self, ctx: &RequestContext, value: &'v str) -> Cow<'v, str> {
        if value.is_empty() || is_absolute(value) {
            return Cow::Borrowed(value);
        }

        let hostname = self.hostname.as_deref().unwrap_or(ctx.host.as_str());
        Cow::Owned(format!("//{}/{}", hostname, value.trim_start_matches('/')))
    }

    fn handle_always_absolute<'v>(&self, ctx: &RequestContext, value: &'v str) -> Cow<'v, str> {
        let relative = self.to_relative_if_local(ctx, value);

        if !is_root_relative(&relative) {
            return Cow::Borrowed(value);
        }

        Cow::Owned(format!(
            "{}{}",
            ctx.scheme_and_host(),
            self.add_asset_path(&relative)
        ))
    }

    fn handle_force_relative<'v>(&self, ctx: &RequestContext, value: &'v str) -> Cow<'v, str> {
        let relative = self.to_relative_if_local(ctx, value);

        if !is_root_relative(&relative) {
            return Cow::Borrowed(value);
        }

        match self.add_asset_path(&relative) {
            Cow::Borrowed(_) if relative == value => Cow::Borrowed(value),
            rewritten => Cow::Owned(rewritten.into_owned()),
        }
    }

    /// Drops scheme and host when `value` points at this backend.
    fn to_relative_if_local<'v>(&self, ctx: &RequestContext, value: &'v str) -> Cow<'v, str> {
        match parse_host(value) {
            Some(host) if self.is_local_host(ctx, &host) => {
                Cow::Owned(convert_absolute_to_relative(value))
            }
            _ => Cow::Borrowed(value),
        }
    }

    fn is_local_host(&self, ctx: &RequestContext, host: &str) -> bool {
        let request_host = ctx.host.split(':').next().unwrap_or_default();

        host.eq_ignore_ascii_case(&ctx.host)
            || host.eq_ignore_ascii_case(request_host)
            || self
                .hostname
                .as_deref()
                .is_some_and(|hostname| host.eq_ignore_ascii_case(hostname))
    }

    fn handle_site_prefix<'v>(&self, ctx: &RequestContext, value: &'v str) -> Cow<'v, str> {
        let Some(prefix) = ctx.active_prefix(&self.prefixes) else {
            return Cow::Borrowed(value);
        };

        if !value.starts_with('/') || self.prefixes.contains_any_prefix(value) {
            return Cow::Borrowed(value);
        }

        Cow::Owned(format!("{}/{}", prefix, value.trim_start_matches('/')))
    }

    fn multi_value_item<'v>(&self, item: &'v str) -> Cow<'v, str> {
        if item.is_empty() || is_absolute(item) || self.cdn.is_cdn_address(item) {
            Cow::Borrowed(item)
        } else {
            self.add_asset_path(item)
        }
    }

    /// Splits on `separator`, maps each trimmed entry and joins them back.
    fn handle_multi_value<'v, F>(&self, value: &'v str, separator: &str, callback: F) -> Cow<'v, str>
    where
        F: for<'i> Fn(&'i str) -> Cow<'i, str>,
    {
        let parts: Vec<Cow<'_, str>> = value
            .split(separator)
            .map(|item| callback(item.trim()))
            .collect();

        let joined = parts.join(separator);
        if joined == value {
            Cow::Borrowed(value)
        } else {
            Cow::Owned(joined)
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::selector::default_registry;

    fn config() -> ProxyConfig {
        let mut prefixes = IndexMap::new();
        prefixes.insert("sv".to_string(), "prefix-sv".to_string());
        prefixes.insert("en".to_string(), "prefix-en".to_string());
        prefixes.insert("fi".to_string(), "prefix-fi".to_string());

        ProxyConfig {
            asset_path: Some("test-assets".to_string()),
            prefixes,
            azure_blob_storage_name: Some("kymp".to_string()),
            hostname: Some("backend.test".to_string()),
            ..Default::default()
        }
    }

    fn selector(name: &str) -> &'static Selector {
        default_registry().get(name).unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::new("/fi/prefix-fi/page", "http", "example.test")
    }

    #[test]
    fn script_gets_asset_path() {
        let resolver = AttributeResolver::new(&config());
        assert_eq!(
            resolver.resolve(selector("script"), &ctx(), "/core/modules/system/test.js"),
            "/test-assets/core/modules/system/test.js"
        );
    }

    #[test]
    fn link_gets_active_prefix_once() {
        let resolver = AttributeResolver::new(&config());
        let ctx = ctx();
        let once = resolver.resolve(selector("a"), &ctx, "/link").into_owned();
        assert_eq!(once, "/fi/prefix-fi/link");
        assert_eq!(resolver.resolve(selector("a"), &ctx, &once), once);
    }

    #[test]
    fn link_without_active_prefix_is_unchanged() {
        let resolver = AttributeResolver::new(&config());
        let ctx = RequestContext::new("/node/1", "http", "example.test");
        assert!(matches!(
            resolver.resolve(selector("a"), &ctx, "/link"),
            Cow::Borrowed("/link")
        ));
        assert_eq!(
            resolver.resolve(selector("a"), &self::ctx(), "#main-content"),
            "#main-content"
        );
    }

    #[test]
    fn always_absolute_rebuilds_local_urls() {
        let resolver = AttributeResolver::new(&config());
        assert_eq!(
            resolver.resolve(
                selector("og:image"),
                &ctx(),
                "https://example.test/themes/x/img.png"
            ),
            "http://example.test/test-assets/themes/x/img.png"
        );
        assert_eq!(
            resolver.resolve(selector("twitter:image"), &ctx(), "/themes/x/img.png"),
            "http://example.test/test-assets/themes/x/img.png"
        );
        assert_eq!(
            resolver.resolve(
                selector("og:image"),
                &ctx(),
                "https://elsewhere.test/themes/x/img.png"
            ),
            "https://elsewhere.test/themes/x/img.png"
        );
    }

    #[test]
    fn cdn_values_pass_through_every_selector() {
        let resolver = AttributeResolver::new(&config());
        let value = "https://kymp.blob.core.windows.net/test/img.png?itok=1";
        for selector in default_registry().iter() {
            assert_eq!(resolver.resolve(selector, &ctx(), value), value, "{}", selector.name);
        }
    }

    #[test]
    fn srcset_keeps_foreign_entries() {
        let resolver = AttributeResolver::new(&config());
        assert_eq!(
            resolver.resolve(
                selector("source"),
                &ctx(),
                "/a/img.png 1x, //foreign.example/b/img.png 2x"
            ),
            "/test-assets/a/img.png 1x, //foreign.example/b/img.png 2x"
        );
    }

    #[test]
    fn image_styles_use_backend_domain() {
        let resolver = AttributeResolver::new(&config());
        assert_eq!(
            resolver.resolve(selector("img"), &ctx(), "/sites/default/files/styles/thumb/a.png"),
            "//backend.test/sites/default/files/styles/thumb/a.png"
        );
        assert_eq!(
            resolver.resolve(
                selector("source"),
                &ctx(),
                "/files/styles/1x/a.png 1x, /files/styles/2x/a.png 2x"
            ),
            "//backend.test/files/styles/1x/a.png 1x, //backend.test/files/styles/2x/a.png 2x"
        );
    }

    #[test]
    fn image_styles_fall_back_to_request_host() {
        let config = ProxyConfig {
            hostname: None,
            ..config()
        };
        let resolver = AttributeResolver::new(&config);
        assert_eq!(
            resolver.resolve(selector("img"), &ctx(), "/files/styles/a.png"),
            "//example.test/files/styles/a.png"
        );
    }

    #[test]
    fn zero_config_changes_nothing() {
        let resolver = AttributeResolver::new(&ProxyConfig::default());
        for selector in default_registry().iter() {
            if selector.rewrite == Rewrite::AbsoluteUri {
                continue;
            }
            for value in ["/core/misc/a.js", "/link", "https://example.test/a.png", ""] {
                assert_eq!(resolver.resolve(selector, &ctx(), value), value);
            }
        }

        assert_eq!(
            resolver.resolve(selector("og:image"), &ctx(), "https://example.test/a.png"),
            "http://example.test/a.png"
        );
    }

    #[test]
    fn empty_and_absent_values() {
        let resolver = AttributeResolver::new(&config());
        for selector in default_registry().iter() {
            assert_eq!(resolver.resolve(selector, &ctx(), ""), "");
            assert_eq!(resolver.resolve_opt(selector, &ctx(), None), None);
        }
    }

    #[test]
    fn force_relative_drops_local_origin() {
        let resolver = AttributeResolver::new(&config());
        assert_eq!(
            resolver.resolve_with(
                &Rewrite::ForceRelative,
                &ctx(),
                "https://backend.test/core/misc/a.js?v=1"
            ),
            "/test-assets/core/misc/a.js?v=1"
        );
        assert_eq!(
            resolver.resolve_with(&Rewrite::ForceRelative, &ctx(), "https://foreign.test/a.js"),
            "https://foreign.test/a.js"
        );
    }

    #[test]
    fn asset_path_round_trip() {
        let resolver = AttributeResolver::new(&config());
        for path in ["/core/misc/a.js", "/a/b/", "/"] {
            let added = resolver.add_asset_path(path);
            assert_eq!(resolver.strip_asset_path(&added), path);
        }
        assert_eq!(resolver.strip_asset_path("/test-assets-other/a"), "/test-assets-other/a");
    }
}
