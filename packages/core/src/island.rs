//! The island lifecycle manager.
//!
//! An [`Island`] owns one widget and every root it has been mounted into.
//! Observer and readiness callbacks reach the island through a `Weak`
//! handle. Dropping the island disconnects its observers and removes its
//! pending readiness listeners, but leaves mounted output in the page.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use islet_dom::{Document, DomError, ListenerId, NodeId, ObserverId, ReadyEvent};

use crate::discovery;
use crate::error::{IslandError, Result};
use crate::latch::{DiscoveryLatch, Trigger};
use crate::observe;
use crate::options::{CompiledOptions, MountMode, RenderOptions};
use crate::props::{self, PropSources, Props};
use crate::render::{Renderer, Tree};
use crate::root::{RootFragment, RootId};

/// Where an island is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No `render` yet.
    Created,
    /// `render` was called; discovery has not found a host yet.
    Mounting,
    /// Mounted into at least one root.
    Mounted,
    /// `rerender` was applied.
    Rerendered,
    /// Torn down; terminal.
    Destroyed,
}

/// Create an island for `widget`.
///
/// The page's currently executing script is captured here, once; it feeds
/// inline discovery, `data-mount-in` and script data attributes.
pub fn create_island<R: Renderer + 'static>(
    doc: &Document,
    widget: R::Widget,
    renderer: Rc<RefCell<R>>,
) -> Island<R> {
    Island::with_script(doc, widget, renderer, doc.current_script())
}

struct IslandState<W> {
    widget: W,
    executed_script: Option<NodeId>,
    roots: Vec<RootFragment>,
    observers: BTreeMap<RootId, ObserverId>,
    props: Props,
    phase: Phase,
    attempts: Vec<Weak<MountAttempt>>,
}

struct Inner<R: Renderer> {
    renderer: Rc<RefCell<R>>,
    state: RefCell<IslandState<R::Widget>>,
}

/// One `render` call's discovery attempts.
struct MountAttempt {
    options: CompiledOptions,
    latch: RefCell<DiscoveryLatch>,
    listeners: RefCell<Vec<ListenerId>>,
}

impl MountAttempt {
    fn settle(&self, doc: &Document) {
        for id in self.listeners.borrow_mut().drain(..) {
            doc.remove_ready_listener(id);
        }
    }
}

/// A widget mounted (or waiting to mount) into a page.
pub struct Island<R: Renderer> {
    doc: Document,
    inner: Rc<Inner<R>>,
}

impl<R: Renderer + 'static> Island<R> {
    /// Create an island with an explicit executing script.
    pub fn with_script(
        doc: &Document,
        widget: R::Widget,
        renderer: Rc<RefCell<R>>,
        executed_script: Option<NodeId>,
    ) -> Self {
        Island {
            doc: doc.clone(),
            inner: Rc::new(Inner {
                renderer,
                state: RefCell::new(IslandState {
                    widget,
                    executed_script,
                    roots: Vec::new(),
                    observers: BTreeMap::new(),
                    props: Props::new(),
                    phase: Phase::Created,
                    attempts: Vec::new(),
                }),
            }),
        }
    }

    /// Discover hosts and mount the widget into each of them.
    ///
    /// Discovery runs now and, until it finds a host, again on each
    /// readiness event. Calling `render` again mounts additional roots.
    pub fn render(&self, options: RenderOptions) -> Result<()> {
        if self.phase() == Phase::Destroyed {
            return Err(IslandError::Destroyed);
        }
        let attempt = Rc::new(MountAttempt {
            options: options.compile()?,
            latch: RefCell::new(DiscoveryLatch::new()),
            listeners: RefCell::new(Vec::new()),
        });
        {
            let mut state = self.inner.state.borrow_mut();
            if state.phase == Phase::Created {
                state.phase = Phase::Mounting;
            }
        }

        self.inner.try_mount(&self.doc, &attempt, Trigger::Immediate);
        if attempt.latch.borrow().is_settled() {
            return Ok(());
        }

        for event in ReadyEvent::ALL {
            let weak = Rc::downgrade(&self.inner);
            let pending = attempt.clone();
            let id = self.doc.add_ready_listener(event, move |doc, event| match weak.upgrade() {
                Some(inner) => inner.try_mount(doc, &pending, Trigger::Ready(event)),
                None => pending.settle(doc),
            });
            attempt.listeners.borrow_mut().push(id);
        }
        {
            let mut state = self.inner.state.borrow_mut();
            state.attempts.retain(|a| a.strong_count() > 0);
            state.attempts.push(Rc::downgrade(&attempt));
        }
        tracing::debug!("no hosts yet, waiting for readiness events");
        Ok(())
    }

    /// Merge `partial` over the last applied props and render every root.
    pub fn rerender(&self, partial: Props) {
        let (roots, props) = {
            let mut state = self.inner.state.borrow_mut();
            if state.phase == Phase::Destroyed || state.roots.is_empty() {
                return;
            }
            props::merge(&mut state.props, partial);
            state.phase = Phase::Rerendered;
            (state.roots.clone(), state.props.clone())
        };
        for root in &roots {
            self.inner.render_root(&self.doc, root, props.clone());
        }
    }

    /// Disconnect observers and unmount every root.
    ///
    /// Host elements are left as the renderer leaves them.
    pub fn destroy(&self) {
        let roots = {
            let mut state = self.inner.state.borrow_mut();
            if state.phase == Phase::Destroyed {
                return;
            }
            state.phase = Phase::Destroyed;
            std::mem::take(&mut state.roots)
        };
        self.inner.release(&self.doc);
        for root in &roots {
            if let Err(e) = self.inner.unmount_root(&self.doc, root) {
                tracing::warn!(root = %root.id(), error = %e, "unmount failed");
            }
        }
        tracing::info!(roots = roots.len(), "island destroyed");
    }

    /// The last applied props.
    pub fn props(&self) -> Props {
        self.inner.state.borrow().props.clone()
    }

    pub fn roots(&self) -> Vec<RootFragment> {
        self.inner.state.borrow().roots.clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.borrow().phase
    }

    pub fn executed_script(&self) -> Option<NodeId> {
        self.inner.state.borrow().executed_script
    }

    /// The observer keeping `root` in sync.
    pub fn observer_for(&self, root: RootId) -> Option<ObserverId> {
        self.inner.state.borrow().observers.get(&root).copied()
    }

    pub fn widget(&self) -> R::Widget {
        self.inner.state.borrow().widget.clone()
    }

    pub fn renderer(&self) -> Rc<RefCell<R>> {
        self.inner.renderer.clone()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

impl<R: Renderer> Drop for Island<R> {
    fn drop(&mut self) {
        self.inner.release(&self.doc);
    }
}

impl<R: Renderer> Inner<R> {
    /// Disconnect observers and drop pending readiness listeners.
    fn release(&self, doc: &Document) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            tracing::warn!("island state busy, observers left connected");
            return;
        };
        let observers = std::mem::take(&mut state.observers);
        let attempts = std::mem::take(&mut state.attempts);
        drop(state);
        for observer in observers.values() {
            doc.disconnect(*observer);
        }
        for attempt in attempts.iter().filter_map(Weak::upgrade) {
            attempt.settle(doc);
        }
    }
}

impl<R: Renderer + 'static> Inner<R> {
    fn is_destroyed(&self) -> bool {
        self.state.borrow().phase == Phase::Destroyed
    }

    fn try_mount(self: &Rc<Self>, doc: &Document, attempt: &MountAttempt, trigger: Trigger) {
        if self.is_destroyed() {
            attempt.settle(doc);
            return;
        }
        if !attempt.latch.borrow_mut().begin(trigger) {
            return;
        }

        let executed_script = self.state.borrow().executed_script;
        let options = &attempt.options;
        let hosts =
            discovery::host_elements(doc, options.selector.as_ref(), options.inline, executed_script);
        tracing::debug!(?trigger, hosts = hosts.len(), "discovery attempt");
        if hosts.is_empty() {
            let mut latch = attempt.latch.borrow_mut();
            latch.finish(false);
            if latch.is_settled() {
                tracing::debug!("no hosts found, giving up");
                attempt.settle(doc);
            }
            return;
        }

        let sources = PropSources::new(executed_script, options.props_selector.clone());
        let mut mounted = 0;
        for host in hosts {
            match self.mount_host(doc, &sources, options, host) {
                Ok(()) => mounted += 1,
                Err(e) => tracing::warn!(%host, error = %e, "could not mount into host"),
            }
        }
        attempt.latch.borrow_mut().finish(true);
        attempt.settle(doc);
        self.state.borrow_mut().phase = Phase::Mounted;
        tracing::info!(roots = mounted, "island mounted");
    }

    fn mount_host(
        self: &Rc<Self>,
        doc: &Document,
        sources: &PropSources,
        options: &CompiledOptions,
        host: NodeId,
    ) -> std::result::Result<(), DomError> {
        let props = sources.resolve(doc, host, &options.initial_props);
        let root = match options.mode {
            MountMode::Append => RootFragment::append(doc, host)?,
            MountMode::Clean => {
                doc.replace_children(host, &[])?;
                RootFragment::append(doc, host)?
            }
            MountMode::Replace => RootFragment::replace(doc, host)?,
        };
        self.render_root(doc, &root, props.clone());
        self.state.borrow_mut().props = props;

        let weak = Rc::downgrade(self);
        let root_id = root.id();
        let observer = observe::watch(
            doc,
            sources.clone(),
            host,
            options.initial_props.clone(),
            move |doc, props| {
                if let Some(inner) = weak.upgrade() {
                    inner.props_changed(doc, root_id, props);
                }
            },
        );

        let mut state = self.state.borrow_mut();
        state.observers.insert(root_id, observer);
        state.roots.push(root);
        Ok(())
    }

    fn props_changed(&self, doc: &Document, root_id: RootId, props: Props) {
        let root = {
            let state = self.state.borrow();
            if state.phase == Phase::Destroyed {
                return;
            }
            match state.roots.iter().find(|r| r.id() == root_id) {
                Some(root) => root.clone(),
                None => return,
            }
        };
        self.render_root(doc, &root, props.clone());
        self.state.borrow_mut().props = props;
    }

    fn render_root(&self, doc: &Document, root: &RootFragment, props: Props) {
        let widget = self.state.borrow().widget.clone();
        let Ok(mut renderer) = self.renderer.try_borrow_mut() else {
            tracing::warn!(root = %root.id(), "renderer busy, render skipped");
            return;
        };
        if let Err(e) = renderer.render(doc, Some(Tree::new(widget, props)), root) {
            tracing::warn!(root = %root.id(), error = %e, "render failed");
        }
    }

    fn unmount_root(&self, doc: &Document, root: &RootFragment) -> std::result::Result<(), DomError> {
        let Ok(mut renderer) = self.renderer.try_borrow_mut() else {
            tracing::warn!(root = %root.id(), "renderer busy, unmount skipped");
            return Ok(());
        };
        renderer.unmount(doc, root)
    }
}
