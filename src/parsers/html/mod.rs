//! HTML parsing and attribute rewriting
//!
//! - `dom`: parsing documents and body fragments, node and attribute access
//! - `serializer`: serializing documents and fragments, output encoding
//! - `walker`: applying selectors and the resolver to a parsed tree

pub mod dom;
pub mod serializer;
pub mod walker;

pub use dom::{
    charset_from_content_type, find_nodes, get_charset, get_node_attr, get_node_name,
    html_to_dom, parse_errors, parse_html_document, parse_html_fragment, set_node_attr,
};
pub use serializer::{encode, serialize_document, serialize_fragment};
pub use walker::{rewrite_markup, walk};
