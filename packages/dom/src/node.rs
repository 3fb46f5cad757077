//! Node identities and storage.

use std::fmt;

/// Identity of a node inside one `Document`.
///
/// Ids are arena indices. They stay valid for the lifetime of the document,
/// including after the node is detached from the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Build an id from a raw arena index.
    pub const fn from_index(index: usize) -> Self {
        NodeId(index)
    }

    /// The raw arena index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// The DOM `nodeType` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    Document = 9,
}

impl NodeType {
    /// The numeric `nodeType` value a browser reports.
    pub const fn code(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Document,
    Element {
        tag: String,
        /// Attribute list in insertion order; names are lower-case.
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Back-reference slot a rendering library sets on a node it treats as
    /// the parent of a mounted root.
    pub(crate) root_tag: Option<u64>,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            root_tag: None,
        }
    }

    pub(crate) fn node_type(&self) -> NodeType {
        match self.data {
            NodeData::Document => NodeType::Document,
            NodeData::Element { .. } => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
        }
    }

    pub(crate) fn tag(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        match &self.data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub(crate) fn can_have_children(&self) -> bool {
        !matches!(self.data, NodeData::Text(_))
    }
}
