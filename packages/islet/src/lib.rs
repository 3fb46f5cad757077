//! islet: widget islands for pages you do not own.
//!
//! An island is a widget mounted into one or more host elements of an
//! existing page. Its props come from the page itself: host and script
//! `data-*` attributes plus JSON props scripts. When those change, the widget
//! re-renders in place and keeps its local state.
//!
//! This crate bundles the layers:
//! - [`dom`]: the page model (`islet-dom`)
//! - the island engine (`islet-core`), re-exported at the top level
//! - [`view`]: a reference renderer (`islet-view`)
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use islet::dom::Document;
//! use islet::view::{prop_text, Component, LocalState, View, ViewRenderer};
//! use islet::{create_island, Props, RenderOptions};
//!
//! let doc = Document::new();
//! let host = doc
//!     .build("div")
//!     .attr("data-widget-host", "island")
//!     .append_to(doc.body())
//!     .unwrap();
//!
//! let badge: Rc<dyn Component> = Rc::new(|props: &Props, _: &mut LocalState| {
//!     View::element("span").child(View::text(prop_text(props, "x")))
//! });
//! let island = create_island(&doc, badge, Rc::new(RefCell::new(ViewRenderer::new())));
//! island
//!     .render(RenderOptions::new().with_selector(r#"[data-widget-host="island"]"#))
//!     .unwrap();
//!
//! doc.set_attribute(host, "data-x", "1").unwrap();
//! doc.flush_mutations();
//! assert_eq!(doc.inner_html(host), "<span>1</span>");
//! ```

pub use islet_core::*;
pub use islet_dom as dom;
pub use islet_view as view;
