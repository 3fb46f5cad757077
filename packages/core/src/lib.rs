//! islet-core: island mounting and reactive prop synchronization
//!
//! Mounts widgets ("islands") into pages the caller does not own and keeps
//! each mounted widget's props in sync with markup around it, re-rendering
//! in place instead of remounting.
//!
//! - `discovery`: which elements host a widget
//! - `props`: merging the five prop sources into one snapshot
//! - `root`: virtual attachment points spanning real nodes
//! - `observe`: mutation watching that recomputes props on change
//! - `island`: the per-widget lifecycle manager
//!
//! The rendering library is abstracted by [`Renderer`]; see `islet-view` for
//! a concrete one.
//!
//! # Example
//!
//! ```rust,ignore
//! use islet_core::{create_island, RenderOptions};
//!
//! let island = create_island(&doc, widget, renderer);
//! island.render(RenderOptions::new().with_selector(r#"[data-widget-host="island"]"#))?;
//!
//! // Later, page scripts change the host's data attributes...
//! doc.flush_mutations(); // ...and the widget re-renders with the new props.
//! ```

pub mod discovery;
mod error;
pub mod island;
pub mod latch;
pub mod observe;
mod options;
pub mod props;
mod render;
pub mod root;

pub use error::{IslandError, Result};
pub use island::{create_island, Island, Phase};
pub use latch::{DiscoveryLatch, LatchState, Trigger};
pub use options::{CompiledOptions, MountMode, RenderOptions};
pub use props::{PropSources, Props};
pub use render::{Renderer, Tree};
pub use root::{RootFragment, RootId, RootKind};

// Re-export the page model so callers need a single dependency.
pub use islet_dom as dom;
