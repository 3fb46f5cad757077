//! View descriptions and components.

use islet_core::Props;
use serde_json::Value;

/// Widget-local state, kept by the renderer across re-renders of one root.
pub type LocalState = serde_json::Map<String, Value>;

/// A description of the markup a component wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<View>,
    },
    Text(String),
}

impl View {
    pub fn element(tag: impl Into<String>) -> Self {
        View::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(data: impl Into<String>) -> Self {
        View::Text(data.into())
    }

    /// Set an attribute. No effect on text views.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let View::Element { attributes, .. } = &mut self {
            let name = name.into();
            let value = value.into();
            match attributes.iter_mut().find(|(n, _)| *n == name) {
                Some((_, existing)) => *existing = value,
                None => attributes.push((name, value)),
            }
        }
        self
    }

    /// Append a child. No effect on text views.
    pub fn child(mut self, child: View) -> Self {
        if let View::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn children(self, children: impl IntoIterator<Item = View>) -> Self {
        children.into_iter().fold(self, View::child)
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            View::Element { tag, .. } => Some(tag),
            View::Text(_) => None,
        }
    }
}

/// Something that turns props into a view.
///
/// `state` belongs to one mounted root and persists between calls.
pub trait Component {
    fn view(&self, props: &Props, state: &mut LocalState) -> View;
}

impl<F> Component for F
where
    F: Fn(&Props, &mut LocalState) -> View,
{
    fn view(&self, props: &Props, state: &mut LocalState) -> View {
        self(props, state)
    }
}

/// Render a prop value as text: strings bare, everything else as JSON.
pub fn prop_text(props: &Props, key: &str) -> String {
    match props.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_shapes_tree() {
        let view = View::element("ul")
            .attr("class", "list")
            .children(["a", "b"].map(|s| View::element("li").child(View::text(s))));
        let View::Element {
            tag,
            attributes,
            children,
        } = view
        else {
            panic!("expected element");
        };
        assert_eq!(tag, "ul");
        assert_eq!(attributes, vec![("class".to_string(), "list".to_string())]);
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn attr_overwrites() {
        let view = View::element("div").attr("id", "a").attr("id", "b");
        assert_eq!(view, View::element("div").attr("id", "b"));
    }

    #[test]
    fn text_ignores_element_builders() {
        let view = View::text("x").attr("id", "a").child(View::text("y"));
        assert_eq!(view, View::text("x"));
        assert_eq!(view.tag(), None);
    }

    #[test]
    fn closures_are_components() {
        let greet = |props: &Props, _: &mut LocalState| View::text(prop_text(props, "name"));
        let mut props = Props::new();
        props.insert("name".into(), json!("island"));
        assert_eq!(greet.view(&props, &mut LocalState::new()), View::text("island"));
    }

    #[test]
    fn prop_text_formats() {
        let mut props = Props::new();
        props.insert("s".into(), json!("text"));
        props.insert("n".into(), json!(2));
        props.insert("b".into(), json!(true));
        assert_eq!(prop_text(&props, "s"), "text");
        assert_eq!(prop_text(&props, "n"), "2");
        assert_eq!(prop_text(&props, "b"), "true");
        assert_eq!(prop_text(&props, "missing"), "");
    }
}
