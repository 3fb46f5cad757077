//! islet-dom: the live page model
//!
//! An in-process model of the parts of a web page that islands interact with:
//! - `Document`: shared handle to an arena of element and text nodes
//! - `Selector`: compiled CSS selector subset used for host and script lookup
//! - `MutationRecord` / `ObserveOptions`: mutation observers with batched delivery
//! - `ReadyEvent`: page-readiness signals (`DOMContentLoaded`, `load`)
//!
//! Everything is single-threaded. Callbacks (mutation observers, readiness
//! listeners) only run from `Document::flush_mutations` and
//! `Document::dispatch_ready`, never from inside a structural operation.
//!
//! # Example
//!
//! ```rust
//! use islet_dom::{Document, Selector};
//!
//! let doc = Document::new();
//! let host = doc
//!     .build("div")
//!     .attr("data-widget-host", "island")
//!     .append_to(doc.body())
//!     .unwrap();
//!
//! let selector = Selector::parse(r#"[data-widget-host="island"]"#).unwrap();
//! assert_eq!(doc.query_selector_all(&selector), vec![host]);
//! ```

mod builder;
mod document;
mod error;
pub mod mutation;
mod node;
pub mod ready;
pub mod selector;
mod serialize;

pub use builder::ElementBuilder;
pub use document::Document;
pub use error::DomError;
pub use mutation::{MutationKind, MutationRecord, ObserveOptions, ObserverId};
pub use node::{NodeId, NodeType};
pub use ready::{ListenerId, ReadyEvent, ReadyState};
pub use selector::{Selector, SelectorError};
