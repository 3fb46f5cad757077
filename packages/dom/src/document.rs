//! The shared document handle and its tree operations.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::DomError;
use crate::mutation::{
    MutationCallback, MutationKind, MutationRecord, ObserveOptions, ObserverId, ObserverRegistry,
};
use crate::node::{Node, NodeData, NodeId, NodeType};
use crate::ready::{ListenerId, ReadyEvent, ReadyRegistry, ReadyState};
use crate::selector::{ElementTree, Selector, SelectorError};

/// Upper bound on delivery rounds in one `flush_mutations` call.
///
/// Observers whose callbacks keep mutating what they observe would otherwise
/// never settle.
const MAX_FLUSH_ROUNDS: usize = 64;

/// A live page.
///
/// `Document` is a cheap, clonable handle (`Rc`) to the shared tree. All
/// methods take `&self`; borrows of the underlying state never outlive a
/// method call, so callbacks are free to call back into the document.
///
/// A fresh document has the skeleton `<html><head></head><body></body></html>`.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

pub(crate) struct DocumentInner {
    nodes: Vec<Node>,
    root: NodeId,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    current_script: Option<NodeId>,
    observers: ObserverRegistry,
    ready: ReadyRegistry,
}

impl DocumentInner {
    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))
    }

    /// `node` followed by all of its ancestors.
    fn ancestor_chain(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = vec![node];
        let mut cursor = self.nodes.get(node.index()).and_then(|n| n.parent);
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.nodes[parent.index()].parent;
        }
        chain
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestor_chain(node).contains(&ancestor)
    }

    fn queue(&mut self, target: NodeId, kind: MutationKind) {
        let chain = self.ancestor_chain(target);
        let record = MutationRecord { target, kind };
        self.observers.queue(&record, &chain);
    }

    fn element_data_mut(
        &mut self,
        id: NodeId,
    ) -> Result<&mut Vec<(String, String)>, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes),
            _ => Err(DomError::WrongNodeType {
                node: id,
                expected: "an element",
            }),
        }
    }

    /// Unlink `child` from its parent, if any, recording the removal.
    fn detach(&mut self, child: NodeId) -> Result<(), DomError> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };
        self.nodes[parent.index()].children.retain(|c| *c != child);
        self.nodes[child.index()].parent = None;
        self.queue(
            parent,
            MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![child],
            },
        );
        Ok(())
    }

    fn insert(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if !self.node(parent)?.can_have_children()
            || self.node(child)?.node_type() == NodeType::Document
            || self.is_inclusive_ancestor(child, parent)
        {
            return Err(DomError::Hierarchy { parent, child });
        }
        if let Some(reference) = reference {
            if self.node(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }
        // Inserting a node before itself leaves it where it is.
        let reference = if reference == Some(child) {
            self.next_sibling_of(child)
        } else {
            reference
        };

        self.detach(child)?;
        let siblings = &mut self.nodes[parent.index()].children;
        let index = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
        self.queue(
            parent,
            MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        );
        Ok(())
    }

    fn next_sibling_of(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(node.index())?.parent?;
        let siblings = &self.nodes[parent.index()].children;
        let index = siblings.iter().position(|c| *c == node)?;
        siblings.get(index + 1).copied()
    }

    /// Pre-order descendants of `scope`, excluding `scope` itself.
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(node) = self.nodes.get(scope.index()) else {
            return out;
        };
        let mut stack: Vec<NodeId> = node.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.index()].children.iter().rev().copied());
        }
        out
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.index()) else {
            return;
        };
        match &node.data {
            NodeData::Text(data) => out.push_str(data),
            _ => {
                for child in &node.children {
                    self.text_content(*child, out);
                }
            }
        }
    }
}

impl ElementTree for DocumentInner {
    fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.index())?.tag()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(node.index())?.attribute(name)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(node.index())?.parent?;
        match self.nodes[parent.index()].data {
            NodeData::Element { .. } => Some(parent),
            _ => None,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with an empty `html`/`head`/`body` skeleton.
    pub fn new() -> Self {
        let mut inner = DocumentInner {
            nodes: Vec::new(),
            root: NodeId::from_index(0),
            html: NodeId::from_index(0),
            head: NodeId::from_index(0),
            body: NodeId::from_index(0),
            current_script: None,
            observers: ObserverRegistry::default(),
            ready: ReadyRegistry::default(),
        };
        let root = inner.alloc(NodeData::Document);
        let html = inner.alloc(element_data("html"));
        let head = inner.alloc(element_data("head"));
        let body = inner.alloc(element_data("body"));
        for (parent, child) in [(root, html), (html, head), (html, body)] {
            inner.nodes[parent.index()].children.push(child);
            inner.nodes[child.index()].parent = Some(parent);
        }
        inner.root = root;
        inner.html = html;
        inner.head = head;
        inner.body = body;

        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Whether two handles refer to the same document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ---------------------------------------------------------------------
    // Skeleton
    // ---------------------------------------------------------------------

    /// The document node itself.
    pub fn document_node(&self) -> NodeId {
        self.inner.borrow().root
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> NodeId {
        self.inner.borrow().html
    }

    pub fn head(&self) -> NodeId {
        self.inner.borrow().head
    }

    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    // ---------------------------------------------------------------------
    // Node creation and inspection
    // ---------------------------------------------------------------------

    /// Create a detached element. The tag name is lower-cased.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.borrow_mut().alloc(element_data(tag))
    }

    /// Create a detached text node.
    pub fn create_text(&self, data: &str) -> NodeId {
        self.inner
            .borrow_mut()
            .alloc(NodeData::Text(data.to_string()))
    }

    pub fn node_type(&self, node: NodeId) -> Option<NodeType> {
        self.inner.borrow().node(node).ok().map(Node::node_type)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.node_type(node) == Some(NodeType::Element)
    }

    /// Lower-case tag name of an element.
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.inner.borrow().tag(node).map(str::to_string)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node).ok()?.parent
    }

    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        ElementTree::parent_element(&*self.inner.borrow(), node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node).ok()?.children.first().copied()
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().next_sibling_of(node)
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.borrow().is_inclusive_ancestor(ancestor, node)
    }

    /// Whether the node is attached to the document tree.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let inner = self.inner.borrow();
        inner.is_inclusive_ancestor(inner.root, node)
    }

    /// Pre-order descendants of `scope`, excluding `scope`.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        self.inner.borrow().descendants(scope)
    }

    /// Descendant elements of `scope` with the given tag, in document order.
    pub fn elements_by_tag_name(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        let inner = self.inner.borrow();
        inner
            .descendants(scope)
            .into_iter()
            .filter(|id| inner.tag(*id) == Some(tag.as_str()))
            .collect()
    }

    /// Concatenated text of the node and all its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.inner.borrow().text_content(node, &mut out);
        out
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        ElementTree::attribute(&*self.inner.borrow(), node, &name).map(str::to_string)
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// All attributes of an element, in insertion order.
    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        match self.inner.borrow().node(node).map(|n| &n.data) {
            Ok(NodeData::Element { attributes, .. }) => attributes.clone(),
            _ => Vec::new(),
        }
    }

    /// Set an attribute. Names are lower-cased, as for HTML elements.
    ///
    /// A record is queued even when the value does not change.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let mut inner = self.inner.borrow_mut();
        let attributes = inner.element_data_mut(node)?;
        let old_value = match attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => Some(std::mem::replace(v, value.to_string())),
            None => {
                attributes.push((name.clone(), value.to_string()));
                None
            }
        };
        inner.queue(node, MutationKind::Attributes { name, old_value });
        Ok(())
    }

    /// Remove an attribute, returning whether it was present.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<bool, DomError> {
        let name = name.to_ascii_lowercase();
        let mut inner = self.inner.borrow_mut();
        let attributes = inner.element_data_mut(node)?;
        let Some(index) = attributes.iter().position(|(n, _)| *n == name) else {
            return Ok(false);
        };
        let (_, old) = attributes.remove(index);
        inner.queue(
            node,
            MutationKind::Attributes {
                name,
                old_value: Some(old),
            },
        );
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // Tree mutation
    // ---------------------------------------------------------------------

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.inner.borrow_mut().insert(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`).
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.inner.borrow_mut().insert(parent, child, reference)
    }

    /// Remove `child` from `parent`.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        if inner.node(child)?.parent != Some(parent) {
            inner.node(parent)?;
            return Err(DomError::NotAChild { parent, child });
        }
        inner.detach(child)
    }

    /// Detach `node` from its parent; a no-op for detached nodes.
    pub fn remove(&self, node: NodeId) -> Result<(), DomError> {
        self.inner.borrow_mut().detach(node)
    }

    /// Replace all children of `parent` with `children`.
    ///
    /// Queues a single child-list record covering both sides.
    pub fn replace_children(&self, parent: NodeId, children: &[NodeId]) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        if !inner.node(parent)?.can_have_children() {
            return Err(DomError::WrongNodeType {
                node: parent,
                expected: "a container node",
            });
        }
        for child in children {
            if inner.is_inclusive_ancestor(*child, parent) {
                return Err(DomError::Hierarchy {
                    parent,
                    child: *child,
                });
            }
        }
        for child in children {
            if inner.node(*child)?.parent != Some(parent) {
                inner.detach(*child)?;
            }
        }

        let removed = std::mem::take(&mut inner.nodes[parent.index()].children);
        for old in &removed {
            inner.nodes[old.index()].parent = None;
        }
        for child in children {
            inner.nodes[child.index()].parent = Some(parent);
        }
        inner.nodes[parent.index()].children = children.to_vec();
        if !removed.is_empty() || !children.is_empty() {
            inner.queue(
                parent,
                MutationKind::ChildList {
                    added: children.to_vec(),
                    removed,
                },
            );
        }
        Ok(())
    }

    /// Set text content.
    ///
    /// For elements, replaces all children with a single text node (none
    /// when `text` is empty). For text nodes, updates the data.
    pub fn set_text_content(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        match self.node_type(node) {
            Some(NodeType::Text) => self.set_data(node, text),
            Some(_) => {
                let children = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![self.create_text(text)]
                };
                self.replace_children(node, &children)
            }
            None => Err(DomError::UnknownNode(node)),
        }
    }

    /// Update the data of a text node.
    pub fn set_data(&self, node: NodeId, data: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        let old_value = match &mut inner.node_mut(node)?.data {
            NodeData::Text(current) => std::mem::replace(current, data.to_string()),
            _ => {
                return Err(DomError::WrongNodeType {
                    node,
                    expected: "a text node",
                })
            }
        };
        inner.queue(node, MutationKind::CharacterData { old_value });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// All elements in the document matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &Selector) -> Vec<NodeId> {
        let root = self.document_node();
        self.query_selector_all_within(root, selector)
    }

    /// Descendant elements of `scope` matching `selector`, in document order.
    pub fn query_selector_all_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        inner
            .descendants(scope)
            .into_iter()
            .filter(|id| selector.matches(&*inner, *id))
            .collect()
    }

    /// First element in the document matching `selector`.
    pub fn query_selector(&self, selector: &Selector) -> Option<NodeId> {
        self.query_selector_all(selector).into_iter().next()
    }

    /// Parse and run a selector in one step.
    pub fn query_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        Ok(self.query_selector_all(&Selector::parse(selector)?))
    }

    /// Whether an element matches `selector`.
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(&*self.inner.borrow(), node)
    }

    // ---------------------------------------------------------------------
    // Script context and root tags
    // ---------------------------------------------------------------------

    /// The script element currently executing, if any (`document.currentScript`).
    pub fn current_script(&self) -> Option<NodeId> {
        self.inner.borrow().current_script
    }

    pub fn set_current_script(&self, script: Option<NodeId>) {
        self.inner.borrow_mut().current_script = script;
    }

    /// Tag `node` with a rendering back-reference.
    pub fn set_root_tag(&self, node: NodeId, tag: u64) -> Result<(), DomError> {
        self.inner.borrow_mut().node_mut(node)?.root_tag = Some(tag);
        Ok(())
    }

    /// The rendering back-reference on `node`, if one was set.
    pub fn root_tag(&self, node: NodeId) -> Option<u64> {
        self.inner.borrow().node(node).ok()?.root_tag
    }

    // ---------------------------------------------------------------------
    // Mutation observers
    // ---------------------------------------------------------------------

    /// Register an observer. It sees nothing until `observe` is called.
    pub fn create_observer<F>(&self, callback: F) -> ObserverId
    where
        F: FnMut(&Document, Vec<MutationRecord>) + 'static,
    {
        let callback: MutationCallback = Box::new(callback);
        self.inner.borrow_mut().observers.create(callback)
    }

    /// Start observing `node`.
    pub fn observe(
        &self,
        observer: ObserverId,
        node: NodeId,
        options: ObserveOptions,
    ) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node(node)?;
        let entry = inner
            .observers
            .entries
            .get_mut(&observer)
            .ok_or(DomError::UnknownObserver(observer))?;
        match entry.targets.iter_mut().find(|(n, _)| *n == node) {
            Some((_, existing)) => *existing = options,
            None => entry.targets.push((node, options)),
        }
        Ok(())
    }

    /// Stop and drop an observer, discarding undelivered records.
    ///
    /// Returns `false` when the observer was already gone.
    pub fn disconnect(&self, observer: ObserverId) -> bool {
        self.inner
            .borrow_mut()
            .observers
            .entries
            .remove(&observer)
            .is_some()
    }

    pub fn is_observing(&self, observer: ObserverId) -> bool {
        self.inner
            .borrow()
            .observers
            .entries
            .contains_key(&observer)
    }

    /// Nodes an observer is registered on.
    pub fn observed_nodes(&self, observer: ObserverId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .observers
            .entries
            .get(&observer)
            .map(|e| e.targets.iter().map(|(n, _)| *n).collect())
            .unwrap_or_default()
    }

    /// Take undelivered records of one observer without invoking it.
    pub fn take_records(&self, observer: ObserverId) -> Vec<MutationRecord> {
        self.inner
            .borrow_mut()
            .observers
            .entries
            .get_mut(&observer)
            .map(|e| std::mem::take(&mut e.pending))
            .unwrap_or_default()
    }

    /// Number of undelivered records across all observers.
    pub fn pending_mutations(&self) -> usize {
        self.inner.borrow().observers.pending_count()
    }

    /// Deliver queued records, one batch per observer.
    ///
    /// Records queued by callbacks are delivered in further rounds until
    /// nothing is pending. Returns the number of batches delivered.
    pub fn flush_mutations(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_FLUSH_ROUNDS {
            let batches = self.inner.borrow_mut().observers.drain_batches();
            if batches.is_empty() {
                return delivered;
            }
            for (id, callback, records) in batches {
                // An earlier callback in this round may have disconnected it.
                if !self.is_observing(id) {
                    continue;
                }
                let Ok(mut cb) = callback.try_borrow_mut() else {
                    tracing::warn!(observer = %id, "observer re-entered during delivery, batch dropped");
                    continue;
                };
                tracing::trace!(observer = %id, records = records.len(), "delivering mutation batch");
                (&mut **cb)(self, records);
                delivered += 1;
            }
        }
        tracing::warn!(
            rounds = MAX_FLUSH_ROUNDS,
            pending = self.pending_mutations(),
            "mutation delivery did not settle"
        );
        delivered
    }

    // ---------------------------------------------------------------------
    // Readiness
    // ---------------------------------------------------------------------

    pub fn ready_state(&self) -> ReadyState {
        self.inner.borrow().ready.state
    }

    /// Subscribe to a readiness event.
    pub fn add_ready_listener<F>(&self, event: ReadyEvent, listener: F) -> ListenerId
    where
        F: Fn(&Document, ReadyEvent) + 'static,
    {
        self.inner
            .borrow_mut()
            .ready
            .add(event, Rc::new(listener))
    }

    pub fn remove_ready_listener(&self, id: ListenerId) -> bool {
        self.inner.borrow_mut().ready.remove(id)
    }

    /// Fire a readiness event. Returns the number of listeners invoked.
    pub fn dispatch_ready(&self, event: ReadyEvent) -> usize {
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            inner.ready.advance(event);
            inner.ready.listeners_for(event)
        };
        tracing::debug!(%event, listeners = listeners.len(), "dispatching readiness event");
        for listener in &listeners {
            listener(self, event);
        }
        listeners.len()
    }

    pub(crate) fn with_inner<T>(&self, f: impl FnOnce(&DocumentInner) -> T) -> T {
        f(&self.inner.borrow())
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Document")
            .field("nodes", &inner.nodes.len())
            .field("ready_state", &inner.ready.state)
            .field("current_script", &inner.current_script)
            .finish()
    }
}

fn element_data(tag: &str) -> NodeData {
    NodeData::Element {
        tag: tag.to_ascii_lowercase(),
        attributes: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn div_in_body(doc: &Document) -> NodeId {
        let div = doc.create_element("div");
        doc.append_child(doc.body(), div).unwrap();
        div
    }

    #[test]
    fn skeleton_is_connected() {
        let doc = Document::new();
        assert_eq!(doc.tag_name(doc.body()).as_deref(), Some("body"));
        assert_eq!(doc.parent(doc.body()), Some(doc.document_element()));
        assert!(doc.is_connected(doc.head()));
        assert_eq!(doc.node_type(doc.document_node()), Some(NodeType::Document));
    }

    #[test]
    fn append_and_insert_before_order() {
        let doc = Document::new();
        let a = div_in_body(&doc);
        let c = div_in_body(&doc);
        let b = doc.create_element("div");
        doc.insert_before(doc.body(), b, Some(c)).unwrap();
        assert_eq!(doc.children(doc.body()), vec![a, b, c]);
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.next_sibling(c), None);
    }

    #[test]
    fn appending_moves_node() {
        let doc = Document::new();
        let a = div_in_body(&doc);
        let b = div_in_body(&doc);
        doc.append_child(a, b).unwrap();
        assert_eq!(doc.children(doc.body()), vec![a]);
        assert_eq!(doc.parent(b), Some(a));
    }

    #[test]
    fn insert_before_self_is_noop() {
        let doc = Document::new();
        let a = div_in_body(&doc);
        let b = div_in_body(&doc);
        doc.insert_before(doc.body(), a, Some(a)).unwrap();
        assert_eq!(doc.children(doc.body()), vec![a, b]);
    }

    #[test]
    fn hierarchy_errors() {
        let doc = Document::new();
        let outer = div_in_body(&doc);
        let inner = doc.create_element("span");
        doc.append_child(outer, inner).unwrap();

        assert_eq!(
            doc.append_child(inner, outer),
            Err(DomError::Hierarchy {
                parent: inner,
                child: outer
            })
        );
        let text = doc.create_text("x");
        assert!(matches!(
            doc.append_child(text, inner),
            Err(DomError::Hierarchy { .. })
        ));
        assert!(matches!(
            doc.append_child(outer, NodeId::from_index(999)),
            Err(DomError::UnknownNode(_))
        ));
    }

    #[test]
    fn remove_child_requires_parent() {
        let doc = Document::new();
        let a = div_in_body(&doc);
        let stray = doc.create_element("p");
        assert_eq!(
            doc.remove_child(a, stray),
            Err(DomError::NotAChild {
                parent: a,
                child: stray
            })
        );
        doc.remove_child(doc.body(), a).unwrap();
        assert!(!doc.is_connected(a));
        // Detached nodes can be removed again without error.
        doc.remove(a).unwrap();
    }

    #[test]
    fn insert_before_foreign_reference_rejected() {
        let doc = Document::new();
        let a = div_in_body(&doc);
        let other = doc.create_element("div");
        let child = doc.create_element("span");
        assert!(matches!(
            doc.insert_before(a, child, Some(other)),
            Err(DomError::NotAChild { .. })
        ));
    }

    #[test]
    fn attributes_are_lowercased_and_ordered() {
        let doc = Document::new();
        let a = div_in_body(&doc);
        doc.set_attribute(a, "Data-B", "2").unwrap();
        doc.set_attribute(a, "data-a", "1").unwrap();
        doc.set_attribute(a, "data-b", "3").unwrap();
        assert_eq!(
            doc.attributes(a),
            vec![
                ("data-b".to_string(), "3".to_string()),
                ("data-a".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(doc.attribute(a, "DATA-A").as_deref(), Some("1"));
        assert!(doc.remove_attribute(a, "data-a").unwrap());
        assert!(!doc.remove_attribute(a, "data-a").unwrap());
    }

    #[test]
    fn attributes_on_text_rejected() {
        let doc = Document::new();
        let text = doc.create_text("x");
        assert!(matches!(
            doc.set_attribute(text, "id", "1"),
            Err(DomError::WrongNodeType { .. })
        ));
    }

    #[test]
    fn text_content_and_replacement() {
        let doc = Document::new();
        let script = doc.create_element("script");
        doc.append_child(doc.body(), script).unwrap();
        doc.set_text_content(script, r#"{"a": 1}"#).unwrap();
        assert_eq!(doc.text_content(script), r#"{"a": 1}"#);

        doc.set_text_content(script, "").unwrap();
        assert!(doc.children(script).is_empty());
    }

    #[test]
    fn replace_children_clears() {
        let doc = Document::new();
        let host = div_in_body(&doc);
        let a = doc.create_element("a");
        doc.append_child(host, a).unwrap();
        doc.replace_children(host, &[]).unwrap();
        assert!(doc.children(host).is_empty());
        assert_eq!(doc.parent(a), None);
    }

    #[test]
    fn query_in_document_order() {
        let doc = Document::new();
        let a = div_in_body(&doc);
        let nested = doc.create_element("div");
        doc.append_child(a, nested).unwrap();
        let b = div_in_body(&doc);
        assert_eq!(doc.query_all("div").unwrap(), vec![a, nested, b]);
        assert_eq!(
            doc.query_selector_all_within(a, &Selector::parse("div").unwrap()),
            vec![nested]
        );
        assert!(doc.query_all("div >").is_err());
    }

    #[test]
    fn elements_by_tag_name_scoped() {
        let doc = Document::new();
        let host = div_in_body(&doc);
        let script = doc.create_element("SCRIPT");
        doc.append_child(host, script).unwrap();
        let outside = doc.create_element("script");
        doc.append_child(doc.body(), outside).unwrap();
        assert_eq!(doc.elements_by_tag_name(host, "script"), vec![script]);
    }

    #[test]
    fn observer_batches_attribute_changes() {
        let doc = Document::new();
        let host = div_in_body(&doc);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::new(Cell::new(0));

        let (c, s) = (calls.clone(), seen.clone());
        let observer = doc.create_observer(move |_, records| {
            c.set(c.get() + 1);
            s.set(s.get() + records.len());
        });
        doc.observe(observer, host, ObserveOptions::direct()).unwrap();

        doc.set_attribute(host, "data-x", "1").unwrap();
        doc.set_attribute(host, "data-x", "2").unwrap();
        assert_eq!(doc.pending_mutations(), 2);

        assert_eq!(doc.flush_mutations(), 1);
        assert_eq!(calls.get(), 1);
        assert_eq!(seen.get(), 2);
        assert_eq!(doc.flush_mutations(), 0);
    }

    #[test]
    fn observer_records_old_values() {
        let doc = Document::new();
        let host = div_in_body(&doc);
        doc.set_attribute(host, "data-x", "1").unwrap();
        let observer = doc.create_observer(|_, _| {});
        doc.observe(observer, host, ObserveOptions::direct()).unwrap();

        doc.set_attribute(host, "data-x", "2").unwrap();
        let records = doc.take_records(observer);
        assert_eq!(
            records,
            vec![MutationRecord {
                target: host,
                kind: MutationKind::Attributes {
                    name: "data-x".to_string(),
                    old_value: Some("1".to_string()),
                },
            }]
        );
    }

    #[test]
    fn direct_observer_ignores_grandchildren() {
        let doc = Document::new();
        let host = div_in_body(&doc);
        let child = doc.create_element("div");
        doc.append_child(host, child).unwrap();

        let observer = doc.create_observer(|_, _| {});
        doc.observe(observer, host, ObserveOptions::direct()).unwrap();

        let grandchild = doc.create_element("span");
        doc.append_child(child, grandchild).unwrap();
        doc.set_attribute(child, "class", "x").unwrap();
        assert_eq!(doc.pending_mutations(), 0);

        doc.append_child(host, doc.create_element("p")).unwrap();
        assert_eq!(doc.pending_mutations(), 1);
    }

    #[test]
    fn disconnect_drops_pending() {
        let doc = Document::new();
        let host = div_in_body(&doc);
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let observer = doc.create_observer(move |_, _| c.set(c.get() + 1));
        doc.observe(observer, host, ObserveOptions::direct()).unwrap();

        doc.set_attribute(host, "data-x", "1").unwrap();
        assert!(doc.disconnect(observer));
        assert!(!doc.disconnect(observer));
        assert_eq!(doc.flush_mutations(), 0);
        assert_eq!(calls.get(), 0);
        assert_eq!(
            doc.observe(observer, host, ObserveOptions::direct()),
            Err(DomError::UnknownObserver(observer))
        );
    }

    #[test]
    fn callback_disconnecting_later_observer_suppresses_it() {
        let doc = Document::new();
        let host = div_in_body(&doc);
        let second_calls = Rc::new(Cell::new(0));
        let target = Rc::new(Cell::new(None));

        let t = target.clone();
        let first = doc.create_observer(move |doc, _| {
            if let Some(id) = t.get() {
                doc.disconnect(id);
            }
        });
        let c = second_calls.clone();
        let second = doc.create_observer(move |_, _| c.set(c.get() + 1));
        target.set(Some(second));

        doc.observe(first, host, ObserveOptions::direct()).unwrap();
        doc.observe(second, host, ObserveOptions::direct()).unwrap();
        doc.set_attribute(host, "data-x", "1").unwrap();

        assert_eq!(doc.flush_mutations(), 1);
        assert_eq!(second_calls.get(), 0);
    }

    #[test]
    fn flush_runs_follow_up_rounds() {
        let doc = Document::new();
        let host = div_in_body(&doc);
        let other = div_in_body(&doc);
        let calls = Rc::new(Cell::new(0));

        let first = doc.create_observer(move |doc, _| {
            doc.set_attribute(other, "data-y", "1").unwrap();
        });
        let c = calls.clone();
        let second = doc.create_observer(move |_, _| c.set(c.get() + 1));
        doc.observe(first, host, ObserveOptions::direct()).unwrap();
        doc.observe(second, other, ObserveOptions::direct()).unwrap();

        doc.set_attribute(host, "data-x", "1").unwrap();
        assert_eq!(doc.flush_mutations(), 2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn runaway_observer_is_bounded() {
        let doc = Document::new();
        let host = div_in_body(&doc);
        let observer = doc.create_observer(move |doc, _| {
            doc.set_attribute(host, "data-x", "again").unwrap();
        });
        doc.observe(observer, host, ObserveOptions::direct()).unwrap();
        doc.set_attribute(host, "data-x", "start").unwrap();
        assert_eq!(doc.flush_mutations(), MAX_FLUSH_ROUNDS);
    }

    #[test]
    fn character_data_records() {
        let doc = Document::new();
        let script = div_in_body(&doc);
        let text = doc.create_text("old");
        doc.append_child(script, text).unwrap();
        let observer = doc.create_observer(|_, _| {});
        doc.observe(observer, text, ObserveOptions::direct()).unwrap();
        doc.set_data(text, "new").unwrap();
        assert_eq!(
            doc.take_records(observer)[0].kind,
            MutationKind::CharacterData {
                old_value: "old".to_string()
            }
        );
    }

    #[test]
    fn ready_listeners_fire_per_event() {
        let doc = Document::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let id = doc.add_ready_listener(ReadyEvent::Load, move |_, _| c.set(c.get() + 1));

        assert_eq!(doc.dispatch_ready(ReadyEvent::DomContentLoaded), 0);
        assert_eq!(doc.ready_state(), ReadyState::Interactive);
        assert_eq!(doc.dispatch_ready(ReadyEvent::Load), 1);
        assert_eq!(doc.ready_state(), ReadyState::Complete);
        assert_eq!(count.get(), 1);

        assert!(doc.remove_ready_listener(id));
        assert_eq!(doc.dispatch_ready(ReadyEvent::Load), 0);
    }

    #[test]
    fn root_tags_and_current_script() {
        let doc = Document::new();
        let host = div_in_body(&doc);
        assert_eq!(doc.root_tag(host), None);
        doc.set_root_tag(host, 42).unwrap();
        assert_eq!(doc.root_tag(host), Some(42));

        assert_eq!(doc.current_script(), None);
        doc.set_current_script(Some(host));
        assert_eq!(doc.current_script(), Some(host));
    }

    #[test]
    fn first_match_and_attribute_presence() {
        let doc = Document::new();
        let first = div_in_body(&doc);
        let second = div_in_body(&doc);
        doc.set_attribute(first, "data-widget-host", "").unwrap();
        doc.set_attribute(second, "data-widget-host", "island").unwrap();

        assert!(doc.has_attribute(first, "data-widget-host"));
        assert!(!doc.has_attribute(first, "data-other"));
        let selector = Selector::parse("[data-widget-host]").unwrap();
        assert_eq!(doc.query_selector(&selector), Some(first));
        let missing = Selector::parse("section").unwrap();
        assert_eq!(doc.query_selector(&missing), None);
    }

    #[test]
    fn element_checks() {
        let doc = Document::new();
        let div = div_in_body(&doc);
        let text = doc.create_text("x");
        assert!(doc.is_element(div));
        assert!(!doc.is_element(text));
        assert!(!doc.is_element(doc.document_node()));
    }

    #[test]
    fn observed_nodes_track_registrations() {
        let doc = Document::new();
        let a = div_in_body(&doc);
        let b = div_in_body(&doc);
        let observer = doc.create_observer(|_, _| {});
        assert!(doc.observed_nodes(observer).is_empty());
        doc.observe(observer, a, ObserveOptions::direct()).unwrap();
        doc.observe(observer, b, ObserveOptions::deep()).unwrap();
        doc.observe(observer, a, ObserveOptions::deep()).unwrap();
        assert_eq!(doc.observed_nodes(observer), vec![a, b]);
        doc.disconnect(observer);
        assert!(doc.observed_nodes(observer).is_empty());
    }

    #[test]
    fn handles_share_state() {
        let doc = Document::new();
        let clone = doc.clone();
        assert!(doc.ptr_eq(&clone));
        assert!(!doc.ptr_eq(&Document::new()));
        let div = div_in_body(&clone);
        assert!(doc.is_connected(div));
    }
}
