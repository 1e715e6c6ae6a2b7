use std::borrow::Cow;

use serde_json::Value;
use thiserror::Error;

use crate::config::{ConfigKey, ProxyConfig};
use crate::env::EnvError;
use crate::parsers::css::rewrite_css;
use crate::parsers::html::dom::{charset_from_content_type, decode, get_charset, parse_html_document};
use crate::parsers::html::serializer::encode;
use crate::parsers::html::walker::rewrite_markup;
use crate::parsers::json::rewrite_ajax_json;
use crate::resolver::AttributeResolver;
use crate::selector::{Rewrite, Selector, SelectorRegistry};
use crate::site_prefix::{RequestContext, SitePrefixResolver};

/// Errors raised while setting the proxy up.
///
/// The rewrite operations themselves never fail: anything they cannot make
/// sense of is passed through unchanged.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error(transparent)]
    Env(#[from] EnvError),
}

pub type ProxyResult<T> = Result<T, ProxyError>;

/// What a response body is, judging by its media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
    Css,
    /// XML dialects (RSS, sitemaps, ...) that must never be touched.
    Xml,
    Other,
}

impl ContentKind {
    pub fn from_content_type(content_type: &str) -> Self {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if media_type.contains("xml") || media_type.contains("rss") {
            ContentKind::Xml
        } else if media_type == "text/html" {
            ContentKind::Html
        } else if media_type == "application/json" || media_type.ends_with("+json") {
            ContentKind::Json
        } else if media_type == "text/css" {
            ContentKind::Css
        } else {
            ContentKind::Other
        }
    }

    /// Guesses from a file name, for input without a media type.
    pub fn from_extension(path: &str) -> Self {
        let extension = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "html" | "htm" => ContentKind::Html,
            "json" => ContentKind::Json,
            "css" => ContentKind::Css,
            "xml" | "rss" | "svg" => ContentKind::Xml,
            _ => ContentKind::Other,
        }
    }

    /// Guesses from the body itself.
    pub fn sniff(body: &str) -> Self {
        let trimmed = body.trim_start();
        if trimmed.starts_with("<?xml") {
            ContentKind::Xml
        } else if trimmed.starts_with('<') {
            ContentKind::Html
        } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
            ContentKind::Json
        } else {
            ContentKind::Other
        }
    }
}

/// The rewrite engine.
///
/// Built once from a validated [`ProxyConfig`] and shared read-only by every
/// request. Per-request state lives in the [`RequestContext`] passed to each
/// operation.
#[derive(Debug, Clone)]
pub struct ProxyManager {
    config: ProxyConfig,
    resolver: AttributeResolver,
    selectors: SelectorRegistry,
}

impl ProxyManager {
    pub fn new(config: ProxyConfig) -> ProxyResult<Self> {
        config.validate()?;

        let selectors = SelectorRegistry::with_extra(&config.selectors)?;
        let resolver = AttributeResolver::new(&config);

        tracing::debug!(
            selectors = selectors.len(),
            asset_path = ?resolver.asset_path(),
            prefixes = config.prefixes.len(),
            cdn_patterns = ?resolver.cdn().patterns(),
            "Proxy manager ready"
        );

        Ok(Self {
            config,
            resolver,
            selectors,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn resolver(&self) -> &AttributeResolver {
        &self.resolver
    }

    pub fn selectors(&self) -> &SelectorRegistry {
        &self.selectors
    }

    pub fn prefixes(&self) -> &SitePrefixResolver {
        self.resolver.prefixes()
    }

    /// Whether anything would ever be rewritten.
    pub fn is_active(&self) -> bool {
        self.config.is_configured(ConfigKey::AssetPath)
            || self.config.is_configured(ConfigKey::Prefixes)
    }

    /// Rewrites an HTML document or fragment. `selectors` defaults to the
    /// registry.
    pub fn rewrite_html<'b>(
        &self,
        body: &'b str,
        ctx: &RequestContext,
        selectors: Option<&[Selector]>,
    ) -> Cow<'b, str> {
        let selectors = selectors.unwrap_or_else(|| self.selectors.selectors());
        rewrite_markup(body, &self.resolver, ctx, selectors)
    }

    /// Rewrites a single value, e.g. a generated asset URL.
    ///
    /// Each selector sees the original value, as in [`rewrite_html`](Self::rewrite_html);
    /// the first one that changes it wins. With no selectors the value only
    /// gets the asset path.
    pub fn rewrite_value<'v>(
        &self,
        value: &'v str,
        ctx: &RequestContext,
        selectors: Option<&[Selector]>,
    ) -> Cow<'v, str> {
        let Some(selectors) = selectors.filter(|selectors| !selectors.is_empty()) else {
            return self.resolver.resolve_with(&Rewrite::Plain, ctx, value);
        };

        selectors
            .iter()
            .map(|selector| self.resolver.resolve(selector, ctx, value))
            .find(|rewritten| rewritten.as_ref() != value)
            .unwrap_or(Cow::Borrowed(value))
    }

    /// Rewrites the markup carried by an ajax JSON envelope.
    pub fn rewrite_json<'b>(&self, body: &'b str, ctx: &RequestContext) -> Cow<'b, str> {
        rewrite_ajax_json(body, |data| match self.rewrite_html(data, ctx, None) {
            Cow::Owned(rewritten) => Some(rewritten),
            Cow::Borrowed(_) => None,
        })
    }

    /// Rewrites the `url()` references of a stylesheet living in `base_path`.
    pub fn rewrite_css<'c>(&self, css: &'c str, base_path: &str) -> Cow<'c, str> {
        rewrite_css(css, base_path, &self.resolver)
    }

    /// Rewrites a raw response body according to its media type.
    ///
    /// Returns `None` when the body is left as it is: XML and unknown media
    /// types, or nothing to rewrite. The charset of the media type (or, for
    /// HTML, of a `<meta>` declaration) is used for decoding and re-encoding.
    pub fn rewrite_body(
        &self,
        content_type: &str,
        body: &[u8],
        ctx: &RequestContext,
    ) -> Option<Vec<u8>> {
        let kind = ContentKind::from_content_type(content_type);
        self.rewrite_body_as(kind, charset_from_content_type(content_type), body, ctx)
    }

    pub fn rewrite_body_as(
        &self,
        kind: ContentKind,
        charset: Option<String>,
        body: &[u8],
        ctx: &RequestContext,
    ) -> Option<Vec<u8>> {
        if matches!(kind, ContentKind::Xml | ContentKind::Other) || body.is_empty() {
            return None;
        }

        let charset = charset
            .or_else(|| (kind == ContentKind::Html).then(|| sniff_charset(body)).flatten())
            .unwrap_or_else(|| "utf-8".to_string());
        let text = decode(body, &charset);

        let rewritten = match kind {
            ContentKind::Html => self.rewrite_html(&text, ctx, None),
            ContentKind::Json => self.rewrite_json(&text, ctx),
            ContentKind::Css => self.rewrite_css(&text, &base_path_of(&ctx.path)),
            ContentKind::Xml | ContentKind::Other => return None,
        };

        match rewritten {
            Cow::Owned(output) => {
                tracing::debug!(?kind, path = %ctx.path, "Rewrote response body");
                Some(encode(&output, &charset))
            }
            Cow::Borrowed(_) => None,
        }
    }

    /// `IsConfigured` for collaborators that only know the key by name.
    /// Unknown keys are never configured.
    pub fn is_configured(&self, key: &str) -> bool {
        key.parse::<ConfigKey>()
            .map(|key| self.config.is_configured(key))
            .unwrap_or(false)
    }

    /// `GetConfig` for collaborators that only know the key by name.
    pub fn get_config(&self, key: &str, default: Value) -> Value {
        match key.parse::<ConfigKey>() {
            Ok(key) => self.config.get_config(key, default),
            Err(_) => default,
        }
    }
}

/// Charset declared inside a document that is not valid UTF-8.
fn sniff_charset(body: &[u8]) -> Option<String> {
    if std::str::from_utf8(body).is_ok() {
        return None;
    }

    let dom = parse_html_document(&String::from_utf8_lossy(body));
    get_charset(&dom.document)
}

/// Directory of a request path, without surrounding slashes.
fn base_path_of(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit_once('/') {
        Some((directory, _)) => directory.trim_matches('/').to_string(),
        None => String::new(),
    }
}
