//! The seam to a rendering library.

use islet_dom::{Document, DomError};

use crate::props::Props;
use crate::root::RootFragment;

/// A widget paired with the props to render it with.
#[derive(Debug, Clone)]
pub struct Tree<W> {
    pub widget: W,
    pub props: Props,
}

impl<W> Tree<W> {
    pub fn new(widget: W, props: Props) -> Self {
        Tree { widget, props }
    }
}

/// A rendering library able to draw into a [`RootFragment`].
///
/// Rendering the same root again must update in place so that widget-local
/// state survives; rendering `None` unmounts whatever the root holds.
pub trait Renderer {
    type Widget: Clone + 'static;

    fn render(
        &mut self,
        doc: &Document,
        tree: Option<Tree<Self::Widget>>,
        root: &RootFragment,
    ) -> Result<(), DomError>;

    fn unmount(&mut self, doc: &Document, root: &RootFragment) -> Result<(), DomError> {
        self.render(doc, None, root)
    }
}
