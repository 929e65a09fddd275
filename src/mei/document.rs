//! Owned, mutable XML tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Every node knows its
//! parent, so walking upwards never needs a separate reverse index. Detaching a
//! node only unlinks it: the node stays in the arena and can still be inspected,
//! which is what lets the pre-transform identifier index resolve elements that
//! were removed from the tree.

use crate::mei::kind::NodeKind;

/// Attribute holding element identifiers.
pub const XML_ID: &str = "xml:id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    prefix: Option<String>,
    prolog: Vec<String>,
}

impl Document {
    /// Creates a document whose root element is `name`.
    ///
    /// A namespace prefix on the root (`mei:mei`) is reused for every element
    /// created later through [`Document::create_element`].
    pub fn new(name: &str, attributes: Vec<(String, String)>) -> Self {
        let prefix = name.split_once(':').map(|(prefix, _)| prefix.to_string());
        let root = Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element {
                name: name.to_string(),
                attributes,
            },
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            prefix,
            prolog: Vec::new(),
        }
    }

    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Declaration and processing instruction lines preceding the root.
    pub fn prolog(&self) -> &[String] {
        &self.prolog
    }

    pub fn set_prolog(&mut self, prolog: Vec<String>) {
        self.prolog = prolog;
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Creates a detached element in the document's vocabulary.
    pub fn create_element(&mut self, local_name: &str) -> NodeId {
        let name = match &self.prefix {
            Some(prefix) => format!("{prefix}:{local_name}"),
            None => local_name.to_string(),
        };
        self.create_raw_element(name, Vec::new())
    }

    /// Creates a detached element with a verbatim qualified name.
    pub fn create_raw_element(&mut self, name: String, attributes: Vec<(String, String)>) -> NodeId {
        self.push(NodeData::Element { name, attributes })
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.push(NodeData::Text(text))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.push(NodeData::Comment(text))
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.data(node), NodeData::Element { .. })
    }

    /// Qualified element name, `None` for text and comments.
    pub fn name(&self, node: NodeId) -> Option<&str> {
        match self.data(node) {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Element name without namespace prefix, empty for text and comments.
    pub fn local_name(&self, node: NodeId) -> &str {
        match self.name(node) {
            Some(name) => name.split_once(':').map_or(name, |(_, local)| local),
            None => "",
        }
    }

    pub fn kind(&self, node: NodeId) -> NodeKind {
        if self.is_element(node) {
            NodeKind::from_local_name(self.local_name(node))
        } else {
            NodeKind::NonElement
        }
    }

    pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
        match self.data(node) {
            NodeData::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attr(&self, node: NodeId, key: &str) -> Option<&str> {
        self.attributes(node)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, keeping its position when it already exists.
    /// No-op on text and comments.
    pub fn set_attr(&mut self, node: NodeId, key: &str, value: impl Into<String>) {
        if let NodeData::Element { attributes, .. } = &mut self.nodes[node.0].data {
            let value = value.into();
            match attributes.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value,
                None => attributes.push((key.to_string(), value)),
            }
        }
    }

    pub fn clear_attributes(&mut self, node: NodeId) {
        if let NodeData::Element { attributes, .. } = &mut self.nodes[node.0].data {
            attributes.clear();
        }
    }

    pub fn id_of(&self, node: NodeId) -> Option<&str> {
        self.attr(node, XML_ID)
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.data(node) {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn element_children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
    }

    pub fn find_child(&self, node: NodeId, local_name: &str) -> Option<NodeId> {
        self.element_children(node)
            .find(|&child| self.local_name(child) == local_name)
    }

    /// Element descendants of `node` in document order, `node` excluded.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if !self.is_element(current) {
                continue;
            }
            found.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        found
    }

    pub fn find_descendant(&self, node: NodeId, local_name: &str) -> Option<NodeId> {
        self.descendants(node)
            .into_iter()
            .find(|&d| self.local_name(d) == local_name)
    }

    pub fn descendants_named(&self, node: NodeId, local_name: &str) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|&d| self.local_name(d) == local_name)
            .collect()
    }

    /// Nearest ancestor of `kind`, `node` excluded.
    pub fn ancestor_of_kind(&self, node: NodeId, kind: NodeKind) -> Option<NodeId> {
        let mut current = self.parent(node);
        while let Some(ancestor) = current {
            if self.kind(ancestor) == kind {
                return Some(ancestor);
            }
            current = self.parent(ancestor);
        }
        None
    }

    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    /// Unlinks `node` from its parent. The subtree stays intact.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `child` at `index` among the children of `parent`, clamped to the end.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Detaches every child of `node` and returns them in order.
    pub fn take_children(&mut self, node: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for &child in &children {
            self.nodes[child.0].parent = None;
        }
        children
    }

    /// Replaces `node` by its children, in place.
    pub fn unwrap(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        let Some(index) = self.index_in_parent(node) else {
            return;
        };
        let children = self.take_children(node);
        self.detach(node);
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child(parent, index + offset, child);
        }
    }

    /// Copies the subtree rooted at `node`. The copy is detached and carries
    /// the same attributes, identifiers included.
    pub fn deep_clone(&mut self, node: NodeId) -> NodeId {
        let copy = self.push(self.data(node).clone());
        let children = self.children(node).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Identifiers of all elements currently in the tree, in document order.
    pub fn ids(&self) -> Vec<&str> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter_map(|node| self.id_of(node))
            .collect()
    }
}
