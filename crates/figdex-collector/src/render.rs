use figdex_dom::Document;
use figdex_dom::NodeId;
use figdex_dom::collapse_whitespace;

use crate::CaptionItem;

/// Wrapper node produced by [`crate::ItemCollector::render`].
///
/// The collector contributes only the wrapper; `children` is whatever the
/// caller's template returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered<N> {
    pub tag: String,
    pub children: Vec<N>,
}

impl Rendered<NodeId> {
    /// Materializes the wrapper in `doc` under `parent` and returns the wrapper node.
    pub fn attach(self, doc: &mut Document, parent: NodeId) -> NodeId {
        let wrapper = doc.create_element(&self.tag);
        doc.append_child(parent, wrapper);
        for child in self.children {
            doc.append_child(wrapper, child);
        }
        wrapper
    }
}

/// Stock template: one `<ul>` of `<li><a href="#id">title</a></li>` entries.
///
/// Yields no nodes for an empty item list, so the wrapper renders empty.
pub fn anchor_list(doc: &mut Document, items: &[CaptionItem]) -> Vec<NodeId> {
    if items.is_empty() {
        return Vec::new();
    }

    let list = doc.create_element("ul");
    for item in items {
        let entry = doc.create_element("li");
        doc.append_child(list, entry);

        let anchor = doc.create_element("a");
        doc.set_attribute(anchor, "href", item.href.as_str());
        doc.append_child(entry, anchor);

        let label = doc.create_text(collapse_whitespace(&item.title));
        doc.append_child(anchor, label);
    }
    vec![list]
}
