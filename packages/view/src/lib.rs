//! islet-view: a small retained renderer for islands
//!
//! Components describe markup as a [`View`] tree; [`ViewRenderer`] mounts it
//! into a root and, on later renders, patches the existing nodes instead of
//! rebuilding them. Each mounted root keeps its own [`LocalState`], which is
//! what makes prop-driven re-renders preserve widget state.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use islet_core::{create_island, Props, RenderOptions};
//! use islet_dom::Document;
//! use islet_view::{prop_text, Component, LocalState, View, ViewRenderer};
//!
//! let doc = Document::new();
//! doc.build("div")
//!     .attr("data-widget-host", "island")
//!     .attr("data-prop-name", "world")
//!     .append_to(doc.body())
//!     .unwrap();
//!
//! let hello: Rc<dyn Component> = Rc::new(|props: &Props, _: &mut LocalState| {
//!     View::element("p").child(View::text(format!("hello {}", prop_text(props, "name"))))
//! });
//! let island = create_island(&doc, hello, Rc::new(RefCell::new(ViewRenderer::new())));
//! island
//!     .render(RenderOptions::new().with_selector(r#"[data-widget-host="island"]"#))
//!     .unwrap();
//!
//! assert_eq!(doc.text_content(doc.body()), "hello world");
//! ```

mod renderer;
mod view;

pub use renderer::ViewRenderer;
pub use view::{prop_text, Component, LocalState, View};
