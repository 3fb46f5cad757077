//! Mutation observers.
//!
//! Structural and attribute changes queue a `MutationRecord` for every
//! observer registered on the changed node (or on an ancestor, with
//! `subtree`). Records accumulate until `Document::flush_mutations`, which
//! hands each observer its whole batch in a single callback invocation, the
//! way a browser delivers records at a microtask checkpoint.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::document::Document;
use crate::node::NodeId;

/// Which changes an observer registration is interested in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub attributes: bool,
    pub child_list: bool,
    pub character_data: bool,
    pub subtree: bool,
}

impl ObserveOptions {
    /// Attributes, child list and character data on the target node only.
    pub const fn direct() -> Self {
        Self {
            attributes: true,
            child_list: true,
            character_data: true,
            subtree: false,
        }
    }

    /// Same as [`ObserveOptions::direct`], extended to all descendants.
    pub const fn deep() -> Self {
        Self {
            subtree: true,
            ..Self::direct()
        }
    }

    fn accepts(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::Attributes { .. } => self.attributes,
            MutationKind::ChildList { .. } => self.child_list,
            MutationKind::CharacterData { .. } => self.character_data,
        }
    }
}

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// An attribute was set or removed.
    Attributes {
        name: String,
        old_value: Option<String>,
    },
    /// Children were inserted and/or removed.
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// A text node's data changed.
    CharacterData { old_value: String },
}

/// One observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The node whose attributes, children or data changed.
    pub target: NodeId,
    pub kind: MutationKind,
}

/// Handle to a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    pub const fn from_raw(raw: u64) -> Self {
        ObserverId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Callback invoked with one batch of records.
pub type MutationCallback = Box<dyn FnMut(&Document, Vec<MutationRecord>)>;

pub(crate) struct ObserverEntry {
    pub(crate) callback: Rc<RefCell<MutationCallback>>,
    pub(crate) targets: Vec<(NodeId, ObserveOptions)>,
    pub(crate) pending: Vec<MutationRecord>,
}

/// All observers of one document, in creation order.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    pub(crate) entries: BTreeMap<ObserverId, ObserverEntry>,
}

impl ObserverRegistry {
    pub(crate) fn create(&mut self, callback: MutationCallback) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            ObserverEntry {
                callback: Rc::new(RefCell::new(callback)),
                targets: Vec::new(),
                pending: Vec::new(),
            },
        );
        id
    }

    /// Queue `record` for every interested observer.
    ///
    /// `chain` is the inclusive ancestor chain of the record's target,
    /// target first.
    pub(crate) fn queue(&mut self, record: &MutationRecord, chain: &[NodeId]) {
        for entry in self.entries.values_mut() {
            let interested = entry.targets.iter().any(|(node, options)| {
                if !options.accepts(&record.kind) {
                    return false;
                }
                match chain.iter().position(|n| n == node) {
                    Some(0) => true,
                    Some(_) => options.subtree,
                    None => false,
                }
            });
            if interested {
                entry.pending.push(record.clone());
            }
        }
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.entries.values().map(|e| e.pending.len()).sum()
    }

    /// Take every non-empty batch, in observer creation order.
    pub(crate) fn drain_batches(
        &mut self,
    ) -> Vec<(ObserverId, Rc<RefCell<MutationCallback>>, Vec<MutationRecord>)> {
        self.entries
            .iter_mut()
            .filter(|(_, entry)| !entry.pending.is_empty())
            .map(|(id, entry)| {
                (
                    *id,
                    entry.callback.clone(),
                    std::mem::take(&mut entry.pending),
                )
            })
            .collect()
    }
}
