//! Page-readiness events.
//!
//! A page signals readiness twice: `DOMContentLoaded` once markup is parsed,
//! then `load` once subresources finish. Listeners subscribe per event and
//! are invoked from `Document::dispatch_ready`.

use std::fmt;
use std::rc::Rc;

use crate::document::Document;

/// A readiness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadyEvent {
    DomContentLoaded,
    Load,
}

impl ReadyEvent {
    /// Both signals, in the order a browser normally fires them.
    pub const ALL: [ReadyEvent; 2] = [ReadyEvent::DomContentLoaded, ReadyEvent::Load];

    /// The DOM event name.
    pub const fn name(self) -> &'static str {
        match self {
            ReadyEvent::DomContentLoaded => "DOMContentLoaded",
            ReadyEvent::Load => "load",
        }
    }
}

impl fmt::Display for ReadyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

/// Handle to a registered readiness listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

pub(crate) type ReadyListener = Rc<dyn Fn(&Document, ReadyEvent)>;

#[derive(Default)]
pub(crate) struct ReadyRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, ReadyEvent, ReadyListener)>,
    pub(crate) state: ReadyState,
}

impl ReadyRegistry {
    pub(crate) fn add(&mut self, event: ReadyEvent, listener: ReadyListener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, event, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _, _)| *l != id);
        self.listeners.len() != before
    }

    pub(crate) fn listeners_for(&self, event: ReadyEvent) -> Vec<ReadyListener> {
        self.listeners
            .iter()
            .filter(|(_, e, _)| *e == event)
            .map(|(_, _, l)| l.clone())
            .collect()
    }

    pub(crate) fn advance(&mut self, event: ReadyEvent) {
        self.state = match event {
            ReadyEvent::DomContentLoaded if self.state == ReadyState::Loading => {
                ReadyState::Interactive
            }
            ReadyEvent::DomContentLoaded => self.state,
            ReadyEvent::Load => ReadyState::Complete,
        };
    }
}
