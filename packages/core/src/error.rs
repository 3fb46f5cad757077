//! Error types for island operations.

use islet_dom::{DomError, SelectorError};
use thiserror::Error;

/// Errors returned to the caller of `Island::render` and option parsing.
///
/// Problems that originate in the page (malformed props JSON, a bad
/// `data-mount-in` selector) are never reported here; they degrade to
/// missing props or hosts instead.
#[derive(Debug, Error)]
pub enum IslandError {
    /// `clean` and `replace` were both requested.
    #[error("`clean` and `replace` cannot both be set")]
    ConflictingOptions,

    /// The island was destroyed and cannot render again.
    #[error("island has been destroyed")]
    Destroyed,

    /// A caller-supplied selector failed to parse.
    #[error("invalid {option} {selector:?}: {source}")]
    InvalidSelector {
        option: &'static str,
        selector: String,
        #[source]
        source: SelectorError,
    },

    /// Render options could not be deserialized.
    #[error("invalid render options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    /// A structural page operation failed.
    #[error("dom error: {0}")]
    Dom(#[from] DomError),
}

/// Result type alias for island operations.
pub type Result<T> = std::result::Result<T, IslandError>;
