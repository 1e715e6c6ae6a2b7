use std::borrow::Cow;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, parse_document, parse_fragment, LocalName, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::selector::Locator;

/// Decodes `data` with the given encoding label (UTF-8 when unknown) and
/// parses it as a full document.
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> RcDom {
    let html = decode(data, document_encoding);
    parse_html_document(&html)
}

pub fn decode(data: &[u8], document_encoding: &str) -> String {
    match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.into_owned()
        }
        None => String::from_utf8_lossy(data).into_owned(),
    }
}

pub fn parse_html_document(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(StrTendril::from_slice(html))
}

/// Parses markup as the contents of a `<body>` element.
///
/// The fragment's nodes end up as children of a synthetic `html` element
/// directly under the document node, see [`fragment_root`].
pub fn parse_html_fragment(html: &str) -> RcDom {
    parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), LocalName::from("body")),
        Vec::new(),
    )
    .one(StrTendril::from_slice(html))
}

/// Parent of a parsed fragment's nodes.
pub fn fragment_root(dom: &RcDom) -> Option<Handle> {
    get_child_node_by_name(&dom.document, "html")
}

/// Whether `html` is a complete document rather than a fragment.
///
/// Only the leading token counts: a doctype or an `<html>` start tag after
/// an optional BOM, whitespace and comments.
pub fn is_full_document(html: &str) -> bool {
    let mut rest = html.trim_start_matches('\u{feff}').trim_start();

    while let Some(comment) = rest.strip_prefix("<!--") {
        match comment.find("-->") {
            Some(end) => rest = comment[end + 3..].trim_start(),
            None => return false,
        }
    }

    starts_with_ignore_case(rest, "<!doctype")
        || (starts_with_ignore_case(rest, "<html")
            && rest[5..]
                .chars()
                .next()
                .map_or(true, |c| c.is_ascii_whitespace() || c == '>' || c == '/'))
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Diagnostics collected while parsing. Parsing never fails.
pub fn parse_errors(dom: &RcDom) -> Vec<String> {
    dom.errors.borrow().iter().map(|e| e.to_string()).collect()
}

/// Elements matching `locator`, in document order.
pub fn find_nodes(node: &Handle, locator: &Locator) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    collect_nodes(node, locator, &mut found_nodes);
    found_nodes
}

fn collect_nodes(node: &Handle, locator: &Locator, found_nodes: &mut Vec<Handle>) {
    if let NodeData::Element {
        ref name,
        ref attrs,
        ..
    } = node.data
    {
        let attrs = attrs.borrow();
        if locator.matches(&name.local, |attr_name| {
            attrs
                .iter()
                .find(|attr| attr_qualified_name(attr) == attr_name)
                .map(|attr| &*attr.value)
        }) {
            found_nodes.push(node.clone());
        }
    }

    // Template contents live outside the regular child list.
    if let NodeData::Element {
        template_contents: ref contents,
        ..
    } = node.data
    {
        if let Some(contents) = contents.borrow().as_ref() {
            collect_nodes(contents, locator, found_nodes);
        }
    }

    for child_node in node.children.borrow().iter() {
        collect_nodes(child_node, locator, found_nodes);
    }
}

pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// `prefix:local` for namespaced attributes such as `xlink:href`, else `local`.
pub fn attr_qualified_name(attr: &Attribute) -> Cow<'_, str> {
    match &attr.name.prefix {
        Some(prefix) => Cow::Owned(format!("{}:{}", prefix, attr.name.local)),
        None => Cow::Borrowed(&*attr.name.local),
    }
}

pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| attr_qualified_name(attr) == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// Replaces the value of an existing attribute. Returns false when the
/// element has no such attribute; attributes are never added.
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: &str) -> bool {
    let NodeData::Element { attrs, .. } = &node.data else {
        return false;
    };

    let mut attrs = attrs.borrow_mut();
    match attrs
        .iter_mut()
        .find(|attr| attr_qualified_name(attr) == attr_name)
    {
        Some(attr) => {
            attr.value = StrTendril::from_slice(attr_value);
            true
        }
        None => false,
    }
}

/// Charset declared by a `<meta charset>` or `<meta http-equiv>` element.
pub fn get_charset(node: &Handle) -> Option<String> {
    let meta_locator = Locator::tag("meta");

    for meta_node in find_nodes(node, &meta_locator) {
        if let Some(charset) = get_node_attr(&meta_node, "charset") {
            return Some(charset.trim().to_string());
        }

        let is_content_type = get_node_attr(&meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type");

        if is_content_type {
            if let Some(content) = get_node_attr(&meta_node, "content") {
                if let Some(charset) = charset_from_content_type(&content) {
                    return Some(charset);
                }
            }
        }
    }

    None
}

/// `charset` parameter of a media type such as `text/html; charset=utf-8`.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|charset| !charset.is_empty())
    })
}
