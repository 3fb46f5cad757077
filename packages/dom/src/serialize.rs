//! Markup serialization (`outerHTML` / `innerHTML`).

use crate::document::{Document, DocumentInner};
use crate::node::{NodeData, NodeId};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text children are emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Document {
    /// Serialize a node and its descendants.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.with_inner(|inner| write_node(inner, node, false, &mut out));
        out
    }

    /// Serialize the descendants of a node.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.with_inner(|inner| write_children(inner, node, &mut out));
        out
    }
}

fn write_children(inner: &DocumentInner, node: NodeId, out: &mut String) {
    let Ok(n) = inner.node(node) else {
        return;
    };
    let raw = n.tag().is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
    for child in &n.children {
        write_node(inner, *child, raw, out);
    }
}

fn write_node(inner: &DocumentInner, node: NodeId, raw_text: bool, out: &mut String) {
    let Ok(n) = inner.node(node) else {
        return;
    };
    match &n.data {
        NodeData::Document => write_children(inner, node, out),
        NodeData::Text(data) if raw_text => out.push_str(data),
        NodeData::Text(data) => escape_into(data, false, out),
        NodeData::Element { tag, attributes } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            write_children(inner, node, out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}
