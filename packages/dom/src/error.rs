//! Error types for structural page operations.

use thiserror::Error;

use crate::mutation::ObserverId;
use crate::node::NodeId;

/// Errors from structural operations on a `Document`.
///
/// These mirror the DOM exceptions a browser would raise for the same
/// misuse (`NotFoundError`, `HierarchyRequestError`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The node id does not belong to this document.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// The node is not a child of the given parent.
    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// The insertion would create a cycle or target a node that cannot
    /// have children.
    #[error("cannot insert {child} into {parent}")]
    Hierarchy { parent: NodeId, child: NodeId },

    /// The operation requires a different kind of node.
    #[error("{node} is not {expected}")]
    WrongNodeType {
        node: NodeId,
        expected: &'static str,
    },

    /// The observer was never created or has been disconnected.
    #[error("unknown observer: {0}")]
    UnknownObserver(ObserverId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = DomError::NotAChild {
            parent: NodeId::from_index(1),
            child: NodeId::from_index(7),
        };
        let display = e.to_string();
        assert!(display.contains("node#7"));
        assert!(display.contains("node#1"));
    }

    #[test]
    fn wrong_node_type_display() {
        let e = DomError::WrongNodeType {
            node: NodeId::from_index(3),
            expected: "an element",
        };
        assert_eq!(e.to_string(), "node#3 is not an element");
    }

    #[test]
    fn unknown_observer_display() {
        let e = DomError::UnknownObserver(ObserverId::from_raw(4));
        assert!(e.to_string().contains("observer#4"));
    }
}
