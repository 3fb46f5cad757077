//! Host element discovery.
//!
//! Where a widget mounts is decided by the first rule that applies:
//!
//! 1. `inline`: the parent element of the executing script
//! 2. a `data-mount-in` attribute on the executing script
//! 3. the caller's `selector` option
//!
//! Otherwise there are no hosts.

use islet_dom::{Document, NodeId, Selector};

/// Script attribute naming the selector to mount into.
pub const MOUNT_IN_ATTRIBUTE: &str = "data-mount-in";

/// Find the elements a widget should mount into, in document order.
///
/// A malformed `data-mount-in` selector is logged and yields no hosts; the
/// page is not trusted to be well formed.
pub fn host_elements(
    doc: &Document,
    selector: Option<&Selector>,
    inline: bool,
    executed_script: Option<NodeId>,
) -> Vec<NodeId> {
    if inline {
        if let Some(parent) = executed_script.and_then(|s| doc.parent_element(s)) {
            return vec![parent];
        }
    }

    if let Some(mount_in) = executed_script.and_then(|s| doc.attribute(s, MOUNT_IN_ATTRIBUTE)) {
        return match Selector::parse(&mount_in) {
            Ok(selector) => doc.query_selector_all(&selector),
            Err(e) => {
                tracing::warn!(selector = %mount_in, error = %e, "invalid data-mount-in selector");
                Vec::new()
            }
        };
    }

    match selector {
        Some(selector) => doc.query_selector_all(selector),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(doc: &Document, value: &str) -> NodeId {
        doc.build("div")
            .attr("data-widget-host", value)
            .append_to(doc.body())
            .unwrap()
    }

    fn selector(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    #[test]
    fn selector_finds_all_hosts() {
        let doc = Document::new();
        let a = host(&doc, "island");
        host(&doc, "other");
        let b = host(&doc, "island");
        let found = host_elements(&doc, Some(&selector(r#"[data-widget-host="island"]"#)), false, None);
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn inline_uses_script_parent() {
        let doc = Document::new();
        let container = host(&doc, "inline");
        let script = doc.build("script").append_to(container).unwrap();
        host(&doc, "island");
        let found = host_elements(
            &doc,
            Some(&selector(r#"[data-widget-host="island"]"#)),
            true,
            Some(script),
        );
        assert_eq!(found, vec![container]);
    }

    #[test]
    fn inline_without_script_falls_through() {
        let doc = Document::new();
        let a = host(&doc, "island");
        let found = host_elements(&doc, Some(&selector("[data-widget-host]")), true, None);
        assert_eq!(found, vec![a]);
    }

    #[test]
    fn mount_in_beats_selector() {
        let doc = Document::new();
        host(&doc, "island");
        let target = doc
            .build("section")
            .attr("class", "target")
            .append_to(doc.body())
            .unwrap();
        let script = doc
            .build("script")
            .attr(MOUNT_IN_ATTRIBUTE, ".target")
            .append_to(doc.body())
            .unwrap();
        let found = host_elements(&doc, Some(&selector("[data-widget-host]")), false, Some(script));
        assert_eq!(found, vec![target]);
    }

    #[test]
    fn malformed_mount_in_yields_nothing() {
        let doc = Document::new();
        host(&doc, "island");
        let script = doc
            .build("script")
            .attr(MOUNT_IN_ATTRIBUTE, "div >")
            .append_to(doc.body())
            .unwrap();
        let found = host_elements(&doc, Some(&selector("[data-widget-host]")), false, Some(script));
        assert!(found.is_empty());
    }

    #[test]
    fn no_rule_no_hosts() {
        let doc = Document::new();
        host(&doc, "island");
        assert!(host_elements(&doc, None, false, None).is_empty());
    }
}
