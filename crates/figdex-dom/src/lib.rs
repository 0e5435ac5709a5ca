//! DOM tree data structures.

/// ID used to address nodes in the DOM arena.
pub type NodeId = usize;

/// Arena slot of the document node. Always present.
pub const DOCUMENT_NODE: NodeId = 0;

/// Single `name="value"` pair on an element. Names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Doctype(String),
    /// Markup kept verbatim, such as `<?xml ...?>` or `<![CDATA[...]]>`.
    Declaration(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document tree.
///
/// Nodes are never freed; detaching a node only unlinks it from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    pub fn empty() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        DOCUMENT_NODE
    }

    /// First element child of the document node, if the tree has one.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(DOCUMENT_NODE)
            .iter()
            .copied()
            .find(|child| self.element(*child).is_some())
    }

    pub fn has_root(&self) -> bool {
        self.document_element().is_some()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: Vec<Attribute>) -> NodeId {
        let id = self.create_element(tag);
        for attr in attrs {
            self.set_attribute(id, &attr.name, attr.value);
        }
        id
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Doctype(name.into()))
    }

    pub fn create_declaration(&mut self, markup: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Declaration(markup.into()))
    }

    /// Appends `child` as the last child of `parent`, detaching it first if needed.
    ///
    /// Returns `false` when either id is out of range or `child` is the document node.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent >= self.nodes.len() || child >= self.nodes.len() || child == DOCUMENT_NODE {
            return false;
        }
        if parent == child || self.is_ancestor(child, parent) {
            return false;
        }

        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        true
    }

    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get(node).and_then(|n| n.parent) else {
            return;
        };
        self.nodes[parent].children.retain(|candidate| *candidate != node);
        self.nodes[node].parent = None;
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node).map(|n| &n.kind)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.kind(node)? {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(node).map(|n| &mut n.kind)? {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Pre-order walk of everything below `node`, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        let mut stack = self.children(node).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Elements below `scope` whose tag matches `tag` (ASCII case-insensitive), in document order.
    pub fn elements_by_tag_name(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|node| {
                self.tag_name(*node)
                    .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            })
            .collect()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attrs
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
            .map(|attr| attr.value.as_str())
    }

    pub fn attributes(&self, node: NodeId) -> &[Attribute] {
        self.element(node)
            .map(|el| el.attrs.as_slice())
            .unwrap_or(&[])
    }

    /// Sets `name` on an element, replacing an existing value in place.
    ///
    /// Returns `false` if `node` is not an element.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) -> bool {
        let Some(el) = self.element_mut(node) else {
            return false;
        };

        let value = value.into();
        if let Some(existing) = el
            .attrs
            .iter_mut()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
        {
            existing.value = value;
        } else {
            el.attrs.push(Attribute::new(name, value));
        }
        true
    }

    /// Concatenated text of every text node below `node`, like DOM `textContent`.
    pub fn text_content(&self, node: NodeId) -> String {
        match self.kind(node) {
            Some(NodeKind::Text(text)) | Some(NodeKind::Comment(text)) => text.clone(),
            Some(NodeKind::Doctype(_)) | Some(NodeKind::Declaration(_)) | None => String::new(),
            Some(NodeKind::Document) | Some(NodeKind::Element(_)) => {
                let mut out = String::new();
                for child in self.descendants(node) {
                    if let Some(NodeKind::Text(text)) = self.kind(child) {
                        out.push_str(text);
                    }
                }
                out
            }
        }
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(DOCUMENT_NODE)
            .find(|node| self.attribute(*node, "id") == Some(id))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }
}

/// Iterator returned by [`Document::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(node).iter().rev().copied());
        Some(node)
    }
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
