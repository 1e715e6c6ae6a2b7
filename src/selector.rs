//! Selector registry.
//!
//! A [`Selector`] names one class of rewritable attribute: which elements to
//! visit ([`Locator`]), which attribute to read, and which [`Rewrite`]
//! strategy the resolver applies to its value. The registry of defaults is
//! built once per process and never mutated afterwards.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::core::ProxyError;

/// Separator used by `srcset`-style attributes.
pub const SRCSET_SEPARATOR: &str = ", ";

/// Element query: a tag name with an optional `[attr]` or `[attr=value]` filter.
///
/// Accepts `img`, `input[type=image]`, `meta[property="og:image"]` and the
/// XPath-flavoured `//meta[@name="twitter:image"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub tag: String,
    pub filter: Option<AttributeFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    pub name: String,
    pub value: Option<String>,
}

impl Locator {
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            filter: None,
        }
    }

    pub fn with_attribute(tag: &str, name: &str, value: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            filter: Some(AttributeFilter {
                name: name.to_lowercase(),
                value: Some(value.to_string()),
            }),
        }
    }

    /// Whether an element with `tag` and attribute lookup `attr` matches.
    pub fn matches<'a, F>(&self, tag: &str, attr: F) -> bool
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        if !tag.eq_ignore_ascii_case(&self.tag) {
            return false;
        }

        match &self.filter {
            None => true,
            Some(AttributeFilter { name, value: None }) => attr(name).is_some(),
            Some(AttributeFilter {
                name,
                value: Some(expected),
            }) => attr(name) == Some(expected.as_str()),
        }
    }
}

impl FromStr for Locator {
    type Err = ProxyError;

    fn from_str(locator: &str) -> Result<Self, Self::Err> {
        let invalid = || ProxyError::InvalidSelector(format!("unsupported locator '{locator}'"));

        let trimmed = locator.trim().trim_start_matches("//");
        let (tag, rest) = match trimmed.find('[') {
            Some(index) => (&trimmed[..index], Some(&trimmed[index..])),
            None => (trimmed, None),
        };

        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid());
        }

        let filter = match rest {
            None => None,
            Some(rest) => {
                let inner = rest
                    .strip_prefix('[')
                    .and_then(|r| r.strip_suffix(']'))
                    .ok_or_else(invalid)?;
                let inner = inner.trim().trim_start_matches('@');

                let (name, value) = match inner.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                        (name.trim(), Some(value.to_string()))
                    }
                    None => (inner, None),
                };

                if name.is_empty() || name.contains(['[', ']', ' ']) {
                    return Err(invalid());
                }

                Some(AttributeFilter {
                    name: name.to_lowercase(),
                    value,
                })
            }
        };

        Ok(Self {
            tag: tag.to_lowercase(),
            filter,
        })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        match &self.filter {
            Some(AttributeFilter { name, value: None }) => write!(f, "[{name}]"),
            Some(AttributeFilter {
                name,
                value: Some(value),
            }) => write!(f, "[{name}={value}]"),
            None => Ok(()),
        }
    }
}

/// How the value of a matched attribute is rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Prefix with the asset path.
    Plain,
    /// Several URLs joined by `separator`, each prefixed with the asset path.
    MultiValue { separator: String },
    /// Always emitted as a fully-qualified URL on the current request's origin.
    AbsoluteUri,
    /// Absolute URLs on this backend are turned into asset-path relative ones.
    ForceRelative,
    /// Links get the active language/site prefix instead of the asset path.
    SitePrefix,
}

impl Rewrite {
    pub fn separator(&self) -> Option<&str> {
        match self {
            Rewrite::MultiValue { separator } => Some(separator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub name: String,
    pub locator: Locator,
    pub attribute: String,
    pub rewrite: Rewrite,
}

impl Selector {
    pub fn new(name: &str, locator: Locator, attribute: &str, rewrite: Rewrite) -> Self {
        Self {
            name: name.to_string(),
            locator,
            attribute: attribute.to_string(),
            rewrite,
        }
    }

    pub fn plain(name: &str, locator: Locator, attribute: &str) -> Self {
        Self::new(name, locator, attribute, Rewrite::Plain)
    }

    pub fn multi_value(name: &str, locator: Locator, attribute: &str, separator: &str) -> Self {
        Self::new(
            name,
            locator,
            attribute,
            Rewrite::MultiValue {
                separator: separator.to_string(),
            },
        )
    }

    pub fn absolute_uri(name: &str, locator: Locator, attribute: &str) -> Self {
        Self::new(name, locator, attribute, Rewrite::AbsoluteUri)
    }

    pub fn site_prefix(name: &str, locator: Locator, attribute: &str) -> Self {
        Self::new(name, locator, attribute, Rewrite::SitePrefix)
    }
}

/// Flag-based selector description, as found in configuration files.
///
/// Converted into a [`Selector`] with [`SelectorSpec::build`], which rejects
/// flag combinations that have no single rewrite strategy.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelectorSpec {
    pub name: String,
    pub locator: String,
    pub attribute: String,
    pub always_absolute: bool,
    pub force_relative: bool,
    pub site_prefix: bool,
    pub multiple_values: bool,
    pub separator: Option<String>,
}

impl SelectorSpec {
    pub fn build(&self) -> Result<Selector, ProxyError> {
        let invalid = |reason: &str| {
            ProxyError::InvalidSelector(format!(
                "selector '{}' ({}/{}): {}",
                self.name, self.locator, self.attribute, reason
            ))
        };

        if self.attribute.trim().is_empty() {
            return Err(invalid("attribute is required"));
        }

        let locator: Locator = self.locator.parse()?;

        let rewrite = match (
            self.site_prefix,
            self.always_absolute,
            self.force_relative,
            self.multiple_values,
        ) {
            (true, false, false, false) => Rewrite::SitePrefix,
            (true, _, _, _) => {
                return Err(invalid("site prefix cannot be combined with asset path options"))
            }
            (false, true, true, _) => {
                return Err(invalid("always absolute and force relative are exclusive"))
            }
            (false, true, false, false) => Rewrite::AbsoluteUri,
            (false, false, true, false) => Rewrite::ForceRelative,
            (false, true, false, true) | (false, false, true, true) => {
                return Err(invalid("multiple values cannot be combined with absolute or relative conversion"))
            }
            (false, false, false, true) => Rewrite::MultiValue {
                separator: match &self.separator {
                    Some(separator) if !separator.is_empty() => separator.clone(),
                    Some(_) => return Err(invalid("separator cannot be empty")),
                    None => ",".to_string(),
                },
            },
            (false, false, false, false) => Rewrite::Plain,
        };

        let name = if self.name.is_empty() {
            format!("{}/{}", locator, self.attribute)
        } else {
            self.name.clone()
        };

        Ok(Selector {
            name,
            locator,
            attribute: self.attribute.trim().to_string(),
            rewrite,
        })
    }
}

/// Ordered, immutable set of selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorRegistry {
    selectors: Vec<Selector>,
}

impl SelectorRegistry {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self { selectors }
    }

    /// Builds a registry from flag-based specs, failing on the first invalid one.
    pub fn from_specs(specs: &[SelectorSpec]) -> Result<Self, ProxyError> {
        let selectors = specs
            .iter()
            .map(SelectorSpec::build)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { selectors })
    }

    /// Defaults followed by `specs`.
    pub fn with_extra(specs: &[SelectorSpec]) -> Result<Self, ProxyError> {
        let mut registry = default_registry().clone();
        for spec in specs {
            registry.selectors.push(spec.build()?);
        }
        Ok(registry)
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn get(&self, name: &str) -> Option<&Selector> {
        self.selectors.iter().find(|selector| selector.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.selectors.iter()
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

fn default_selectors() -> Vec<Selector> {
    vec![
        Selector::plain("input", Locator::with_attribute("input", "type", "image"), "src"),
        Selector::multi_value("source", Locator::tag("source"), "srcset", SRCSET_SEPARATOR),
        Selector::plain("img", Locator::tag("img"), "src"),
        Selector::plain("link", Locator::tag("link"), "href"),
        Selector::absolute_uri(
            "og:image",
            Locator::with_attribute("meta", "property", "og:image"),
            "content",
        ),
        Selector::absolute_uri(
            "og:image:url",
            Locator::with_attribute("meta", "property", "og:image:url"),
            "content",
        ),
        Selector::absolute_uri(
            "twitter:image",
            Locator::with_attribute("meta", "name", "twitter:image"),
            "content",
        ),
        Selector::plain("script", Locator::tag("script"), "src"),
        Selector::site_prefix("a", Locator::tag("a"), "href"),
        Selector::plain("use", Locator::tag("use"), "href"),
        Selector::plain("use-xhref", Locator::tag("use"), "xlink:href"),
    ]
}

/// The process-wide default registry.
pub fn default_registry() -> &'static SelectorRegistry {
    static REGISTRY: OnceLock<SelectorRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| SelectorRegistry::new(default_selectors()))
}
