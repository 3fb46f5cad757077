//! Fluent element construction.

use crate::document::Document;
use crate::error::DomError;
use crate::node::NodeId;

/// Builds an element with attributes and children.
///
/// The first failing step is remembered and reported by `finish`/`append_to`.
///
/// ```rust
/// use islet_dom::Document;
///
/// let doc = Document::new();
/// let script = doc
///     .build("script")
///     .attr("type", "application/json")
///     .text(r#"{"test": "bananas"}"#)
///     .finish()
///     .unwrap();
/// let host = doc
///     .build("div")
///     .attr("data-widget-host", "island")
///     .child(script)
///     .append_to(doc.body())
///     .unwrap();
/// assert_eq!(doc.children(host), vec![script]);
/// ```
#[must_use]
pub struct ElementBuilder<'a> {
    doc: &'a Document,
    node: NodeId,
    error: Option<DomError>,
}

impl Document {
    /// Start building a detached element.
    pub fn build(&self, tag: &str) -> ElementBuilder<'_> {
        ElementBuilder {
            doc: self,
            node: self.create_element(tag),
            error: None,
        }
    }
}

impl<'a> ElementBuilder<'a> {
    fn step(mut self, op: impl FnOnce(&Document, NodeId) -> Result<(), DomError>) -> Self {
        if self.error.is_none() {
            if let Err(e) = op(self.doc, self.node) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn attr(self, name: &str, value: &str) -> Self {
        self.step(|doc, node| doc.set_attribute(node, name, value))
    }

    /// Append a text node.
    pub fn text(self, data: &str) -> Self {
        self.step(|doc, node| doc.append_child(node, doc.create_text(data)))
    }

    /// Append an existing node.
    pub fn child(self, child: NodeId) -> Self {
        self.step(|doc, node| doc.append_child(node, child))
    }

    /// Finish, leaving the element detached.
    pub fn finish(self) -> Result<NodeId, DomError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.node),
        }
    }

    /// Finish and append the element to `parent`.
    pub fn append_to(self, parent: NodeId) -> Result<NodeId, DomError> {
        let doc = self.doc;
        let node = self.finish()?;
        doc.append_child(parent, node)?;
        Ok(node)
    }
}
