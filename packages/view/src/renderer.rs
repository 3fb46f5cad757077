//! A retained renderer that patches the page in place.
//!
//! Each root keeps its last view and local state. Re-rendering diffs the new
//! view against the old one and touches only what changed, so nodes (and
//! whatever page scripts hung on them) survive prop updates.

use std::collections::HashMap;
use std::rc::Rc;

use islet_core::{Props, Renderer, RootFragment, RootId, Tree};
use islet_dom::{Document, DomError, NodeId};

use crate::view::{Component, LocalState, View};

struct Instance {
    widget: Rc<dyn Component>,
    node: NodeId,
    view: View,
    props: Props,
    state: LocalState,
    renders: usize,
}

/// Renders [`Component`]s into roots.
#[derive(Default)]
pub struct ViewRenderer {
    instances: HashMap<RootId, Instance>,
}

impl ViewRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local state of the component mounted at `root`.
    pub fn state(&self, root: RootId) -> Option<&LocalState> {
        self.instances.get(&root).map(|i| &i.state)
    }

    /// The top-level node rendered for `root`.
    pub fn node(&self, root: RootId) -> Option<NodeId> {
        self.instances.get(&root).map(|i| i.node)
    }

    /// Number of renders `root` has seen since it was mounted.
    pub fn render_count(&self, root: RootId) -> usize {
        self.instances.get(&root).map_or(0, |i| i.renders)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// The root most recently created over `parent`, if it is still mounted.
    pub fn mounted_root(&self, doc: &Document, parent: NodeId) -> Option<RootId> {
        let tag = doc.root_tag(parent)?;
        self.instances.keys().find(|id| id.raw() == tag).copied()
    }

    /// Mutate a root's local state and re-render it with its last props.
    pub fn update_state<F>(
        &mut self,
        doc: &Document,
        root: &RootFragment,
        update: F,
    ) -> Result<bool, DomError>
    where
        F: FnOnce(&mut LocalState),
    {
        let Some(instance) = self.instances.get_mut(&root.id()) else {
            return Ok(false);
        };
        update(&mut instance.state);
        let props = instance.props.clone();
        let widget = instance.widget.clone();
        self.update(doc, root, widget, props)?;
        Ok(true)
    }

    fn mount(
        &mut self,
        doc: &Document,
        root: &RootFragment,
        widget: Rc<dyn Component>,
        props: Props,
    ) -> Result<(), DomError> {
        for node in root.child_nodes() {
            if doc.parent(*node) == Some(root.parent_node()) {
                root.remove_child(doc, *node)?;
            }
        }
        let mut state = LocalState::new();
        let view = widget.view(&props, &mut state);
        let node = create(doc, &view)?;
        root.append_child(doc, node)?;
        tracing::debug!(root = %root.id(), %node, "mounted view");
        self.instances.insert(
            root.id(),
            Instance {
                widget,
                node,
                view,
                props,
                state,
                renders: 1,
            },
        );
        Ok(())
    }

    fn update(
        &mut self,
        doc: &Document,
        root: &RootFragment,
        widget: Rc<dyn Component>,
        props: Props,
    ) -> Result<(), DomError> {
        let Some(instance) = self.instances.get_mut(&root.id()) else {
            return self.mount(doc, root, widget, props);
        };
        let view = widget.view(&props, &mut instance.state);
        if let Some(replacement) = patch(doc, instance.node, &instance.view, &view)? {
            let parent = root.parent_node();
            if doc.parent(instance.node) == Some(parent) {
                doc.insert_before(parent, replacement, Some(instance.node))?;
                root.remove_child(doc, instance.node)?;
            } else {
                root.append_child(doc, replacement)?;
            }
            instance.node = replacement;
        }
        instance.widget = widget;
        instance.view = view;
        instance.props = props;
        instance.renders += 1;
        tracing::trace!(root = %root.id(), renders = instance.renders, "patched view");
        Ok(())
    }

    fn unmount_root(&mut self, doc: &Document, root: &RootFragment) -> Result<(), DomError> {
        let Some(instance) = self.instances.remove(&root.id()) else {
            return Ok(());
        };
        if doc.parent(instance.node).is_some() {
            doc.remove(instance.node)?;
        }
        tracing::debug!(root = %root.id(), "unmounted view");
        Ok(())
    }
}

impl Renderer for ViewRenderer {
    type Widget = Rc<dyn Component>;

    fn render(
        &mut self,
        doc: &Document,
        tree: Option<Tree<Self::Widget>>,
        root: &RootFragment,
    ) -> Result<(), DomError> {
        match tree {
            Some(tree) => self.update(doc, root, tree.widget, tree.props),
            None => self.unmount_root(doc, root),
        }
    }
}

/// Build page nodes for `view`.
fn create(doc: &Document, view: &View) -> Result<NodeId, DomError> {
    match view {
        View::Text(data) => Ok(doc.create_text(data)),
        View::Element {
            tag,
            attributes,
            children,
        } => {
            let node = doc.create_element(tag);
            for (name, value) in attributes {
                doc.set_attribute(node, name, value)?;
            }
            for child in children {
                let child = create(doc, child)?;
                doc.append_child(node, child)?;
            }
            Ok(node)
        }
    }
}

/// Bring `node`, last rendered from `old`, in line with `new`.
///
/// Returns a detached replacement when the node cannot be patched; the
/// caller puts it in place.
fn patch(doc: &Document, node: NodeId, old: &View, new: &View) -> Result<Option<NodeId>, DomError> {
    match (old, new) {
        (View::Text(old), View::Text(new)) => {
            if old != new {
                doc.set_data(node, new)?;
            }
            Ok(None)
        }
        (
            View::Element {
                tag: old_tag,
                attributes: old_attributes,
                children: old_children,
            },
            View::Element {
                tag: new_tag,
                attributes: new_attributes,
                children: new_children,
            },
        ) if old_tag == new_tag => {
            patch_attributes(doc, node, old_attributes, new_attributes)?;
            patch_children(doc, node, old_children, new_children)?;
            Ok(None)
        }
        _ => create(doc, new).map(Some),
    }
}

fn patch_attributes(
    doc: &Document,
    node: NodeId,
    old: &[(String, String)],
    new: &[(String, String)],
) -> Result<(), DomError> {
    for (name, _) in old {
        if !new.iter().any(|(n, _)| n == name) {
            doc.remove_attribute(node, name)?;
        }
    }
    for (name, value) in new {
        let unchanged = old.iter().any(|(n, v)| n == name && v == value);
        if !unchanged {
            doc.set_attribute(node, name, value)?;
        }
    }
    Ok(())
}

fn patch_children(
    doc: &Document,
    node: NodeId,
    old: &[View],
    new: &[View],
) -> Result<(), DomError> {
    let existing = doc.children(node);
    for (index, view) in new.iter().enumerate() {
        let current = existing.get(index).copied();
        match (current, old.get(index)) {
            (Some(child), Some(old_view)) => {
                if let Some(replacement) = patch(doc, child, old_view, view)? {
                    doc.insert_before(node, replacement, Some(child))?;
                    doc.remove_child(node, child)?;
                }
            }
            _ => {
                let child = create(doc, view)?;
                doc.append_child(node, child)?;
            }
        }
    }
    for child in existing.iter().skip(new.len()) {
        doc.remove_child(node, *child)?;
    }
    Ok(())
}
