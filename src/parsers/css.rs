//! Stylesheet `url()` rewriting.
//!
//! Aggregated stylesheets are served from the asset path, so relative
//! references inside them have to be resolved against the stylesheet's own
//! directory and re-rooted under `/{asset_path}/`. The stylesheet is
//! tokenized with cssparser and only the byte ranges of rewritten `url()`
//! references are replaced; everything else is kept verbatim.

use std::borrow::Cow;

use cssparser::{serialize_string, ParseError, Parser, ParserInput, Token};

use crate::resolver::AttributeResolver;
use crate::utils::url::{is_absolute, Url};

/// One `url()` reference: byte range of the whole token in the source and
/// the referenced value.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlReference {
    start: usize,
    end: usize,
    value: String,
}

/// Rewrites the relative `url()` references of `css`.
///
/// `base_path` is the directory of the stylesheet relative to the web root,
/// e.g. `core/themes/claro/css`. Without a configured asset path the
/// stylesheet comes back unchanged.
pub fn rewrite_css<'c>(css: &'c str, base_path: &str, resolver: &AttributeResolver) -> Cow<'c, str> {
    let Some(asset_path) = resolver.asset_path() else {
        return Cow::Borrowed(css);
    };

    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut references = Vec::new();
    collect_urls(&mut parser, &mut references);

    let mut output = String::with_capacity(css.len());
    let mut last = 0;
    let mut rewritten = 0;

    for reference in references {
        if !is_rewritable(&reference.value, resolver) {
            continue;
        }

        let path = collapse_parent_segments(&join_base_path(base_path, &reference.value));
        output.push_str(&css[last..reference.start]);
        output.push_str(&format_url(&format!("/{}/{}", asset_path, path)));
        last = reference.end;
        rewritten += 1;
    }

    if rewritten == 0 {
        return Cow::Borrowed(css);
    }

    output.push_str(&css[last..]);
    tracing::debug!(rewritten, base_path, "Rewrote stylesheet references");
    Cow::Owned(output)
}

fn collect_urls<'i, 't>(parser: &mut Parser<'i, 't>, references: &mut Vec<UrlReference>) {
    loop {
        let start = parser.position().byte_index();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::UnquotedUrl(ref value) => references.push(UrlReference {
                start,
                end: parser.position().byte_index(),
                value: value.to_string(),
            }),
            Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                let mut value: Option<String> = None;
                let _ = parser.parse_nested_block(|parser| -> Result<(), ParseError<'i, ()>> {
                    if let Ok(Token::QuotedString(quoted)) = parser.next() {
                        value = Some(quoted.to_string());
                    }
                    Ok(())
                });

                if let Some(value) = value {
                    references.push(UrlReference {
                        start,
                        end: parser.position().byte_index(),
                        value,
                    });
                }
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let _ = parser.parse_nested_block(|parser| -> Result<(), ParseError<'i, ()>> {
                    collect_urls(parser, references);
                    Ok(())
                });
            }
            _ => {}
        }
    }
}

/// Only plain relative references are rewritten; data URIs, fragments,
/// root-relative, absolute and CDN references are left alone.
fn is_rewritable(value: &str, resolver: &AttributeResolver) -> bool {
    let value = value.trim();

    !(value.is_empty()
        || value.starts_with('#')
        || value.starts_with('/')
        || is_absolute(value)
        || Url::parse(value).is_ok()
        || resolver.cdn().is_cdn_address(value))
}

fn join_base_path(base_path: &str, value: &str) -> String {
    let base_path = base_path.trim_matches('/');
    let value = value.trim();

    if base_path.is_empty() {
        value.to_string()
    } else {
        format!("{}/{}", base_path, value)
    }
}

/// Drops `./` segments and collapses `segment/../` pairs.
fn collapse_parent_segments(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "." => {}
            ".." if segments.last().is_some_and(|last| *last != "..") => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    segments.join("/")
}

fn format_url(url: &str) -> String {
    let needs_quotes = url
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\'' | '\\'));

    if needs_quotes {
        let mut quoted = String::new();
        // Writing into a String cannot fail.
        let _ = serialize_string(url, &mut quoted);
        format!("url({})", quoted)
    } else {
        format!("url({})", url)
    }
}
