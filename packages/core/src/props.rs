//! Prop resolution.
//!
//! A widget's props are merged from five sources, lowest priority first:
//!
//! 1. initial props passed to `render`
//! 2. `data-*` attributes on the host element
//! 3. `data-*` attributes on the script that created the island
//! 4. JSON props scripts matched by the `propsSelector` option
//! 5. JSON props scripts nested inside the host element
//!
//! Later sources override earlier keys. An overridden key keeps the position
//! of its first insertion, so the snapshot's key order is stable across
//! updates.

use islet_dom::{Document, NodeId, Selector};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// A merged props snapshot. Keys keep insertion order.
pub type Props = serde_json::Map<String, Value>;

/// `type` values that mark a `<script>` as carrying JSON props.
pub const PROPS_SCRIPT_TYPES: [&str; 2] = ["text/props", "application/json"];

const DATA_PREFIX: &str = "data-";

lazy_static! {
    static ref PROP_SEGMENT: Regex = Regex::new("props?").unwrap();
}

/// Merge `source` over `target`; keys from `source` win.
pub fn merge(target: &mut Props, source: Props) {
    for (key, value) in source {
        target.insert(key, value);
    }
}

/// Convert an attribute name to its `dataset` key.
///
/// `data-widget-host` becomes `widgetHost`. Returns `None` for attributes
/// outside the `data-` namespace.
pub fn dataset_key(attribute: &str) -> Option<String> {
    let rest = attribute.strip_prefix(DATA_PREFIX)?;
    let mut key = String::with_capacity(rest.len());
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(next) if c == '-' && next.is_ascii_lowercase() => {
                key.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => key.push(c),
        }
    }
    Some(key)
}

/// Map a `dataset` key to a prop name.
///
/// Everything up to and including the last `prop`/`props` segment is
/// dropped, then the first remaining character is lower-cased:
/// `propTest` → `test`, `propsHelloWorld` → `helloWorld`, `widgetHost` →
/// `widgetHost`. Returns `None` when nothing remains.
pub fn prop_name(dataset_key: &str) -> Option<String> {
    let tail = match PROP_SEGMENT.find_iter(dataset_key).last() {
        Some(segment) => &dataset_key[segment.end()..],
        None => dataset_key,
    };
    let mut chars = tail.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}

/// Props carried by an element's `data-*` attributes, as strings.
pub fn props_from_element(doc: &Document, element: NodeId) -> Props {
    let mut props = Props::new();
    for (name, value) in doc.attributes(element) {
        if let Some(key) = dataset_key(&name).and_then(|k| prop_name(&k)) {
            props.insert(key, Value::String(value));
        }
    }
    props
}

/// Whether `node` is a `<script>` with one of the props content types.
pub fn is_props_script(doc: &Document, node: NodeId) -> bool {
    doc.tag_name(node).as_deref() == Some("script")
        && doc
            .attribute(node, "type")
            .is_some_and(|t| PROPS_SCRIPT_TYPES.contains(&t.as_str()))
}

/// Props scripts nested anywhere inside `host`, in document order.
pub fn interior_props_scripts(doc: &Document, host: NodeId) -> Vec<NodeId> {
    doc.elements_by_tag_name(host, "script")
        .into_iter()
        .filter(|s| is_props_script(doc, *s))
        .collect()
}

/// Props scripts in the document matching `selector`, in document order.
pub fn selected_props_scripts(doc: &Document, selector: &Selector) -> Vec<NodeId> {
    doc.query_selector_all(selector)
        .into_iter()
        .filter(|s| is_props_script(doc, *s))
        .collect()
}

/// Merge the JSON object bodies of `scripts`, later scripts winning.
///
/// A body that is not a JSON object is skipped; the remaining scripts still
/// contribute.
pub fn props_from_scripts(doc: &Document, scripts: &[NodeId]) -> Props {
    let mut props = Props::new();
    for script in scripts {
        let body = doc.text_content(*script);
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(map)) => merge(&mut props, map),
            Ok(other) => {
                tracing::debug!(%script, kind = json_kind(&other), "props script is not an object, skipped");
            }
            Err(e) => {
                tracing::debug!(%script, error = %e, "malformed props script, skipped");
            }
        }
    }
    props
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The page-side inputs shared by every host of one `render` call.
#[derive(Debug, Clone, Default)]
pub struct PropSources {
    /// The script element that created the island, if known.
    pub executed_script: Option<NodeId>,
    /// Selector for external props scripts.
    pub props_selector: Option<Selector>,
}

impl PropSources {
    pub fn new(executed_script: Option<NodeId>, props_selector: Option<Selector>) -> Self {
        Self {
            executed_script,
            props_selector,
        }
    }

    /// Compute the full props snapshot for `host`.
    pub fn resolve(&self, doc: &Document, host: NodeId, initial_props: &Props) -> Props {
        let mut props = initial_props.clone();
        merge(&mut props, props_from_element(doc, host));
        if let Some(script) = self.executed_script {
            merge(&mut props, props_from_element(doc, script));
        }
        merge(&mut props, self.selected_script_props(doc));
        merge(
            &mut props,
            props_from_scripts(doc, &interior_props_scripts(doc, host)),
        );
        props
    }

    /// Props scripts matched by the props selector (none without one).
    pub fn selected_scripts(&self, doc: &Document) -> Vec<NodeId> {
        self.props_selector
            .as_ref()
            .map(|s| selected_props_scripts(doc, s))
            .unwrap_or_default()
    }

    fn selected_script_props(&self, doc: &Document) -> Props {
        props_from_scripts(doc, &self.selected_scripts(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Props {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn script(doc: &Document, kind: &str, body: &str) -> NodeId {
        doc.build("script").attr("type", kind).text(body).finish().unwrap()
    }

    // ==================== Attribute name mapping ====================

    #[test]
    fn dataset_keys() {
        assert_eq!(dataset_key("data-widget-host").as_deref(), Some("widgetHost"));
        assert_eq!(dataset_key("data-testid").as_deref(), Some("testid"));
        assert_eq!(dataset_key("data-prop-test").as_deref(), Some("propTest"));
        assert_eq!(dataset_key("data-a-1").as_deref(), Some("a-1"));
        assert_eq!(dataset_key("id"), None);
    }

    #[test]
    fn prop_names() {
        assert_eq!(prop_name("propTest").as_deref(), Some("test"));
        assert_eq!(prop_name("propsHelloWorld").as_deref(), Some("helloWorld"));
        assert_eq!(prop_name("widgetHost").as_deref(), Some("widgetHost"));
        assert_eq!(prop_name("x").as_deref(), Some("x"));
    }

    #[test]
    fn empty_prop_names_dropped() {
        assert_eq!(prop_name("prop"), None);
        assert_eq!(prop_name("props"), None);
        assert_eq!(prop_name("testprop"), None);
        assert_eq!(prop_name(""), None);
    }

    #[test]
    fn element_attributes_become_props() {
        let doc = Document::new();
        let host = doc
            .build("div")
            .attr("id", "ignored")
            .attr("data-widget-host", "island")
            .attr("data-prop-test", "bananas")
            .attr("data-prop", "dropped")
            .finish()
            .unwrap();
        assert_eq!(
            Value::Object(props_from_element(&doc, host)),
            json!({"widgetHost": "island", "test": "bananas"})
        );
    }

    // ==================== Props scripts ====================

    #[test]
    fn recognizes_props_scripts() {
        let doc = Document::new();
        assert!(is_props_script(&doc, script(&doc, "text/props", "{}")));
        assert!(is_props_script(&doc, script(&doc, "application/json", "{}")));
        assert!(!is_props_script(&doc, script(&doc, "text/javascript", "{}")));
        let div = doc.build("div").attr("type", "text/props").finish().unwrap();
        assert!(!is_props_script(&doc, div));
    }

    #[test]
    fn scripts_merge_in_order() {
        let doc = Document::new();
        let a = script(&doc, "text/props", r#"{"a": 1, "shared": "first"}"#);
        let b = script(&doc, "application/json", r#"{"b": 2, "shared": "second"}"#);
        assert_eq!(
            Value::Object(props_from_scripts(&doc, &[a, b])),
            json!({"a": 1, "shared": "second", "b": 2})
        );
    }

    #[test]
    fn malformed_and_non_object_scripts_skipped() {
        let doc = Document::new();
        let good = script(&doc, "text/props", r#"{"a": 1}"#);
        let broken = script(&doc, "text/props", r#"{"a": "#);
        let array = script(&doc, "text/props", "[1, 2]");
        assert_eq!(
            Value::Object(props_from_scripts(&doc, &[good, broken, array])),
            json!({"a": 1})
        );
    }

    #[test]
    fn interior_scripts_filter_types() {
        let doc = Document::new();
        let props_script = script(&doc, "text/props", "{}");
        let code = script(&doc, "text/javascript", "{}");
        let host = doc
            .build("div")
            .child(props_script)
            .child(code)
            .append_to(doc.body())
            .unwrap();
        assert_eq!(interior_props_scripts(&doc, host), vec![props_script]);
    }

    // ==================== Resolution ====================

    #[test]
    fn precedence_across_all_sources() {
        let doc = Document::new();
        let interior = script(
            &doc,
            "text/props",
            r#"{"interior": "interior", "selected": "interior"}"#,
        );
        let host = doc
            .build("div")
            .attr("data-prop-host", "host")
            .attr("data-prop-initial", "host")
            .attr("data-prop-script", "host")
            .attr("data-prop-selected", "host")
            .attr("data-prop-interior", "host")
            .child(interior)
            .append_to(doc.body())
            .unwrap();
        let executed = doc
            .build("script")
            .attr("data-prop-script", "script")
            .attr("data-prop-selected", "script")
            .attr("data-prop-interior", "script")
            .append_to(doc.body())
            .unwrap();
        doc.build("script")
            .attr("id", "external")
            .attr("type", "application/json")
            .text(r#"{"selected": "selected", "interior": "selected"}"#)
            .append_to(doc.body())
            .unwrap();

        let sources = PropSources::new(Some(executed), Some(Selector::parse("#external").unwrap()));
        let initial = props(json!({"initial": "initial", "host": "initial", "script": "initial"}));
        let resolved = sources.resolve(&doc, host, &initial);

        assert_eq!(resolved["initial"], json!("host"));
        assert_eq!(resolved["host"], json!("host"));
        assert_eq!(resolved["script"], json!("script"));
        assert_eq!(resolved["selected"], json!("interior"));
        assert_eq!(resolved["interior"], json!("interior"));
    }

    #[test]
    fn initial_props_keep_their_position() {
        let doc = Document::new();
        let host = doc
            .build("div")
            .attr("data-widget-host", "island")
            .append_to(doc.body())
            .unwrap();
        let initial = props(json!({"apples": "yes", "bananas": 1, "kiwis": true}));
        let resolved = PropSources::default().resolve(&doc, host, &initial);
        assert_eq!(
            serde_json::to_string(&resolved).unwrap(),
            r#"{"apples":"yes","bananas":1,"kiwis":true,"widgetHost":"island"}"#
        );
    }

    #[test]
    fn selector_matches_only_props_scripts() {
        let doc = Document::new();
        doc.build("script")
            .attr("class", "cfg")
            .attr("type", "text/javascript")
            .text(r#"{"a": 1}"#)
            .append_to(doc.body())
            .unwrap();
        let host = doc.build("div").append_to(doc.body()).unwrap();
        let sources = PropSources::new(None, Some(Selector::parse(".cfg").unwrap()));
        assert!(sources.resolve(&doc, host, &Props::new()).is_empty());
    }

    #[test]
    fn malformed_interior_script_is_ignored() {
        let doc = Document::new();
        let broken = script(&doc, "text/props", "{not json");
        let host = doc
            .build("div")
            .attr("data-x", "1")
            .child(broken)
            .append_to(doc.body())
            .unwrap();
        let resolved = PropSources::default().resolve(&doc, host, &props(json!({"y": 2})));
        assert_eq!(Value::Object(resolved), json!({"y": 2, "x": "1"}));
    }
}
