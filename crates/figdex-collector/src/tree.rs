use figdex_dom::Document;
use figdex_dom::NodeId;
use std::collections::HashSet;

/// What the collector needs from a document tree.
pub trait CaptionTree {
    type Node: Copy;

    /// Container to scan. `None` means there is nothing to scan yet.
    fn scan_root(&self, scope_id: Option<&str>) -> Option<Self::Node>;

    /// Elements under `root` with tag `marker`, in document order.
    fn find_markers(&self, root: Self::Node, marker: &str) -> Vec<Self::Node>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str);

    fn attribute_pairs(&self, node: Self::Node) -> Vec<(&str, &str)>;

    fn text_content(&self, node: Self::Node) -> String;

    /// Every non-empty value of `id_attribute` anywhere in the tree.
    fn used_ids(&self, id_attribute: &str) -> HashSet<String>;
}

impl CaptionTree for Document {
    type Node = NodeId;

    fn scan_root(&self, scope_id: Option<&str>) -> Option<NodeId> {
        match scope_id {
            Some(id) => self.element_by_id(id),
            None if self.has_root() => Some(self.root()),
            None => None,
        }
    }

    fn find_markers(&self, root: NodeId, marker: &str) -> Vec<NodeId> {
        self.elements_by_tag_name(root, marker)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        Document::attribute(self, node, name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        Document::set_attribute(self, node, name, value);
    }

    fn attribute_pairs(&self, node: NodeId) -> Vec<(&str, &str)> {
        self.attributes(node)
            .iter()
            .map(|attr| (attr.name.as_str(), attr.value.as_str()))
            .collect()
    }

    fn text_content(&self, node: NodeId) -> String {
        Document::text_content(self, node)
    }

    fn used_ids(&self, id_attribute: &str) -> HashSet<String> {
        self.descendants(self.root())
            .filter_map(|node| Document::attribute(self, node, id_attribute))
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
