//! Root fragments.
//!
//! A rendering library mounts into a single container node. A
//! [`RootFragment`] stands in for that container while its content actually
//! lives among the real parent's children, positioned where the spanned
//! nodes were. This is what lets `replace` mode put a widget exactly where
//! its host used to be, without wrapping it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use islet_dom::{Document, DomError, NodeId, NodeType};

static NEXT_ROOT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one root; also written into the real parent as its root tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(u64);

impl RootId {
    fn next() -> Self {
        RootId(NEXT_ROOT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root#{}", self.0)
    }
}

/// How a root relates to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// A fresh container appended inside the host.
    Append,
    /// The host itself, replaced by the rendered output.
    Replace,
}

/// A virtual container over a span of a real parent's children.
#[derive(Debug, Clone)]
pub struct RootFragment {
    id: RootId,
    kind: RootKind,
    parent: NodeId,
    span: Vec<NodeId>,
    anchor: Option<NodeId>,
}

impl RootFragment {
    /// Create a root over `span`, a run of `parent`'s children.
    ///
    /// The anchor is the node after the last spanned node, captured now.
    pub fn create(
        doc: &Document,
        parent: NodeId,
        span: Vec<NodeId>,
        kind: RootKind,
    ) -> Result<Self, DomError> {
        let anchor = span.last().and_then(|last| doc.next_sibling(*last));
        let id = RootId::next();
        doc.set_root_tag(parent, id.raw())?;
        tracing::trace!(root = %id, %parent, span = span.len(), "created root fragment");
        Ok(RootFragment {
            id,
            kind,
            parent,
            span,
            anchor,
        })
    }

    /// Append a fresh `div` to `host` and root there.
    pub fn append(doc: &Document, host: NodeId) -> Result<Self, DomError> {
        let container = doc.create_element("div");
        doc.append_child(host, container)?;
        Self::create(doc, host, vec![container], RootKind::Append)
    }

    /// Root in place of `host` itself.
    ///
    /// A detached host falls back to the document body as parent.
    pub fn replace(doc: &Document, host: NodeId) -> Result<Self, DomError> {
        let parent = doc.parent_element(host).unwrap_or_else(|| doc.body());
        Self::create(doc, parent, vec![host], RootKind::Replace)
    }

    pub fn id(&self) -> RootId {
        self.id
    }

    pub fn kind(&self) -> RootKind {
        self.kind
    }

    /// The nodes this root initially covered.
    pub fn span(&self) -> &[NodeId] {
        &self.span
    }

    pub fn anchor(&self) -> Option<NodeId> {
        self.anchor
    }

    /// Roots always present as elements.
    pub fn node_type(&self) -> NodeType {
        NodeType::Element
    }

    /// The real parent content is inserted into.
    pub fn parent_node(&self) -> NodeId {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.span.first().copied()
    }

    pub fn child_nodes(&self) -> &[NodeId] {
        &self.span
    }

    /// Insert `child` before the anchor. The reference is ignored.
    pub fn insert_before(
        &self,
        doc: &Document,
        child: NodeId,
        _reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let anchor = self
            .anchor
            .filter(|a| doc.parent(*a) == Some(self.parent) && *a != child);
        doc.insert_before(self.parent, child, anchor)
    }

    pub fn append_child(&self, doc: &Document, child: NodeId) -> Result<(), DomError> {
        self.insert_before(doc, child, None)
    }

    pub fn remove_child(&self, doc: &Document, child: NodeId) -> Result<(), DomError> {
        doc.remove_child(self.parent, child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn div(doc: &Document, parent: NodeId) -> NodeId {
        doc.build("div").append_to(parent).unwrap()
    }

    #[test]
    fn ids_are_unique() {
        let doc = Document::new();
        let host = div(&doc, doc.body());
        let a = RootFragment::append(&doc, host).unwrap();
        let b = RootFragment::append(&doc, host).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn append_creates_container() {
        let doc = Document::new();
        let host = div(&doc, doc.body());
        let existing = div(&doc, host);
        let root = RootFragment::append(&doc, host).unwrap();
        assert_eq!(root.kind(), RootKind::Append);
        assert_eq!(root.parent_node(), host);
        let children = doc.children(host);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], existing);
        assert_eq!(root.first_child(), Some(children[1]));
        assert_eq!(root.anchor(), None);
        assert_eq!(doc.root_tag(host), Some(root.id().raw()));
    }

    #[test]
    fn replace_spans_host() {
        let doc = Document::new();
        let before = div(&doc, doc.body());
        let host = div(&doc, doc.body());
        let after = div(&doc, doc.body());
        let root = RootFragment::replace(&doc, host).unwrap();
        assert_eq!(root.parent_node(), doc.body());
        assert_eq!(root.child_nodes(), &[host]);
        assert_eq!(root.anchor(), Some(after));
        assert_eq!(root.node_type(), NodeType::Element);

        let content = doc.create_element("p");
        root.remove_child(&doc, host).unwrap();
        root.append_child(&doc, content).unwrap();
        assert_eq!(doc.children(doc.body()), vec![before, content, after]);
    }

    #[test]
    fn detached_host_falls_back_to_body() {
        let doc = Document::new();
        let host = doc.create_element("div");
        let root = RootFragment::replace(&doc, host).unwrap();
        assert_eq!(root.parent_node(), doc.body());
        assert_eq!(root.anchor(), None);
    }

    #[test]
    fn reference_is_ignored() {
        let doc = Document::new();
        let first = div(&doc, doc.body());
        let host = div(&doc, doc.body());
        let after = div(&doc, doc.body());
        let root = RootFragment::replace(&doc, host).unwrap();
        let content = doc.create_element("p");
        root.insert_before(&doc, content, Some(first)).unwrap();
        assert_eq!(doc.children(doc.body()), vec![first, host, content, after]);
    }

    #[test]
    fn departed_anchor_appends_at_end() {
        let doc = Document::new();
        let host = div(&doc, doc.body());
        let after = div(&doc, doc.body());
        let root = RootFragment::replace(&doc, host).unwrap();
        doc.remove(after).unwrap();
        let content = doc.create_element("p");
        root.append_child(&doc, content).unwrap();
        assert_eq!(doc.children(doc.body()), vec![host, content]);
    }
}
