//! Selector-driven attribute rewriting over a parsed DOM.
//!
//! Every selector is applied on its own: matching elements are visited in
//! document order, the selector's attribute is read, passed through the
//! [`AttributeResolver`] and written back when the value changed.

use std::borrow::Cow;

use markup5ever_rcdom::{Handle, RcDom};

use crate::resolver::AttributeResolver;
use crate::selector::Selector;
use crate::site_prefix::RequestContext;

use super::dom::{
    find_nodes, get_node_attr, is_full_document, parse_errors, parse_html_document,
    parse_html_fragment, set_node_attr,
};
use super::serializer::{serialize_document, serialize_fragment};

/// Rewrites every selector's attribute below `node`. Returns the number of
/// attributes that changed.
pub fn walk(
    node: &Handle,
    resolver: &AttributeResolver,
    ctx: &RequestContext,
    selectors: &[Selector],
) -> usize {
    let mut rewritten = 0;

    for selector in selectors {
        for element in find_nodes(node, &selector.locator) {
            let Some(value) = get_node_attr(&element, &selector.attribute) else {
                continue;
            };

            if let Cow::Owned(new_value) = resolver.resolve(selector, ctx, &value) {
                if new_value != value && set_node_attr(&element, &selector.attribute, &new_value) {
                    rewritten += 1;
                }
            }
        }
    }

    rewritten
}

/// Parses `html` as a document or a body fragment, rewrites it and
/// serializes it back. Markup without any rewritten attribute is returned
/// untouched, as is markup the serializer chokes on.
pub fn rewrite_markup<'h>(
    html: &'h str,
    resolver: &AttributeResolver,
    ctx: &RequestContext,
    selectors: &[Selector],
) -> Cow<'h, str> {
    if html.trim().is_empty() {
        return Cow::Borrowed(html);
    }

    let full_document = is_full_document(html);
    let dom: RcDom = if full_document {
        parse_html_document(html)
    } else {
        parse_html_fragment(html)
    };

    let errors = parse_errors(&dom);
    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "HTML parser reported errors");
        for error in &errors {
            tracing::trace!("{}", error);
        }
    }

    let rewritten = walk(&dom.document, resolver, ctx, selectors);
    tracing::debug!(rewritten, full_document, "Rewrote markup attributes");

    if rewritten == 0 {
        return Cow::Borrowed(html);
    }

    let serialized = if full_document {
        serialize_document(&dom)
    } else {
        serialize_fragment(&dom)
    };

    match serialized {
        Ok(output) => Cow::Owned(output),
        Err(e) => {
            tracing::warn!("Unable to serialize rewritten markup: {}", e);
            Cow::Borrowed(html)
        }
    }
}
