use std::io;

use encoding_rs::Encoding;
use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{Handle, RcDom, SerializableHandle};

use super::dom::fragment_root;

/// Serializes a whole document, doctype included.
pub fn serialize_document(dom: &RcDom) -> io::Result<String> {
    serialize_children(&dom.document)
}

/// Serializes the nodes of a document produced by
/// [`parse_html_fragment`](super::dom::parse_html_fragment), without the
/// synthetic wrapper.
pub fn serialize_fragment(dom: &RcDom) -> io::Result<String> {
    match fragment_root(dom) {
        Some(root) => serialize_children(&root),
        None => Ok(String::new()),
    }
}

fn serialize_children(node: &Handle) -> io::Result<String> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = node.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())?;

    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Encodes serialized markup back into the document's original encoding.
/// Unknown or empty labels produce UTF-8.
pub fn encode(html: &str, document_encoding: &str) -> Vec<u8> {
    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            let (data, _, _) = encoding.encode(html);
            return data.into_owned();
        }
    }

    html.as_bytes().to_vec()
}
