//! Document-to-HTML serialization.

use figdex_dom::Document;
use figdex_dom::NodeId;
use figdex_dom::NodeKind;

use crate::tokenizer::is_raw_text_tag;
use crate::tokenizer::is_void;

/// Writes the whole document back to HTML source.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    for child in doc.children(doc.root()) {
        write_node(doc, *child, false, &mut out);
    }
    out
}

/// Writes `node` and its subtree (outer HTML).
pub fn serialize_node(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    let raw_parent = doc
        .parent(node)
        .and_then(|parent| doc.tag_name(parent))
        .is_some_and(is_raw_text_tag);
    write_node(doc, node, raw_parent, &mut out);
    out
}

fn write_node(doc: &Document, node: NodeId, raw_text: bool, out: &mut String) {
    match doc.kind(node) {
        None | Some(NodeKind::Document) => {
            for child in doc.children(node) {
                write_node(doc, *child, false, out);
            }
        }
        Some(NodeKind::Doctype(name)) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        Some(NodeKind::Declaration(markup)) => out.push_str(markup),
        Some(NodeKind::Comment(text)) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Some(NodeKind::Text(text)) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_into(text, false, out);
            }
        }
        Some(NodeKind::Element(el)) => {
            out.push('<');
            out.push_str(&el.tag);
            for attr in &el.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_into(&attr.value, true, out);
                out.push('"');
            }
            out.push('>');

            if is_void(&el.tag) {
                return;
            }

            let raw_children = is_raw_text_tag(&el.tag);
            for child in doc.children(node) {
                write_node(doc, *child, raw_children, out);
            }

            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn escape_into(input: &str, attribute: bool, out: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}
