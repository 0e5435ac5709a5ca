//! HTML tokenization, tree construction and serialization boundaries.

mod serialize;
mod tokenizer;

use figdex_dom::DOCUMENT_NODE;
use figdex_dom::Document;
use figdex_dom::NodeId;
use tokenizer::Token;

pub use serialize::serialize;
pub use serialize::serialize_node;

/// Parses raw HTML into a DOM document.
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn parse(&self, input: &str) -> Document {
        let tokens = tokenizer::tokenize(input);
        let doc = build_tree(tokens);
        tracing::debug!(
            bytes = input.len(),
            nodes = doc.node_count(),
            "parsed html document"
        );
        doc
    }
}

fn build_tree(tokens: Vec<Token>) -> Document {
    let mut doc = Document::empty();
    let mut stack: Vec<NodeId> = vec![DOCUMENT_NODE];

    for token in tokens {
        let parent = stack.last().copied().unwrap_or(DOCUMENT_NODE);
        match token {
            Token::Doctype(name) => {
                let node = doc.create_doctype(name);
                doc.append_child(parent, node);
            }
            Token::Declaration(markup) => {
                let node = doc.create_declaration(markup);
                doc.append_child(parent, node);
            }
            Token::Comment(text) => {
                let node = doc.create_comment(text);
                doc.append_child(parent, node);
            }
            Token::Text(text) | Token::RawText(text) => {
                let node = doc.create_text(text);
                doc.append_child(parent, node);
            }
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                let el = doc.create_element_with_attrs(&name, attrs);
                doc.append_child(parent, el);
                if !self_closing && !tokenizer::is_void(&name) {
                    stack.push(el);
                }
            }
            Token::End { name } => {
                // Unmatched end tags are dropped; matched ones close everything above them.
                let open_at = stack.iter().rposition(|node| {
                    *node != DOCUMENT_NODE && doc.tag_name(*node) == Some(name.as_str())
                });
                if let Some(idx) = open_at {
                    stack.truncate(idx);
                }
            }
        }
    }

    doc
}
