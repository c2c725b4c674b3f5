//! Error types shared by the store, the reconciler and the driver.

use thiserror::Error;

use crate::reactive::ValueKind;

/// Result type alias for Arbor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while mutating state or rendering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The render/patch loop kept mutating state without settling.
    #[error("state did not settle after {iterations} render passes")]
    InfiniteUpdateLoop {
        /// Number of render passes that ran.
        iterations: usize,
    },

    /// A store write tried to change the kind of a cell.
    #[error("cannot write {found} over {existing} at {path}")]
    IncompatibleType {
        /// The canonical path of the cell.
        path: String,
        /// Kind currently held by the cell.
        existing: ValueKind,
        /// Kind of the rejected value.
        found: ValueKind,
    },

    /// The root value can only be replaced by the driver.
    #[error("the state root cannot be written through the store")]
    InvalidRootWrite,

    /// A scoped write escaped the subtree of its handle.
    #[error("{path} is outside of {scope}")]
    OutOfScope {
        /// The offending path after normalization.
        path: String,
        /// The handle path the write was scoped to.
        scope: String,
    },

    /// A thunk could not produce a node.
    #[error("thunk {name:?} did not resolve to a node")]
    ThunkResolution {
        /// Identity name of the thunk.
        name: String,
    },

    /// Handlers registered for one native event returned different values.
    #[error("event handlers for {event_type} disagree: {first} and {second}")]
    ConflictingEventResult {
        /// Native event type.
        event_type: String,
        /// Composite key of the first handler that produced a value.
        first: String,
        /// Composite key of the handler that disagreed.
        second: String,
    },

    /// A value of this kind cannot be rendered as a child.
    #[error("cannot render a {kind} value as a child node")]
    BadChild {
        /// Kind of the rejected value.
        kind: ValueKind,
    },

    /// Following references revisited a path.
    #[error("reference cycle through {path}")]
    CyclicReference {
        /// The first path seen twice.
        path: String,
    },

    /// No value exists at the path.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The missing path.
        path: String,
    },

    /// A sequence operation hit a non-sequence value.
    #[error("not a sequence: {path}")]
    NotASequence {
        /// The canonical path of the value.
        path: String,
    },

    /// An element mixed string and mapping styles.
    #[error("cannot mix string and mapping styles on <{tag}>")]
    MixedStyle {
        /// Tag of the element being built.
        tag: String,
    },

    /// The driver was mounted without one of its parts.
    #[error("{part} must be set before mounting")]
    MissingPart {
        /// Name of the missing part.
        part: &'static str,
    },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a path not found error.
    #[inline]
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Error::PathNotFound { path: path.into() }
    }

    /// Create an incompatible type error.
    #[inline]
    pub fn incompatible(path: impl Into<String>, existing: ValueKind, found: ValueKind) -> Self {
        Error::IncompatibleType {
            path: path.into(),
            existing,
            found,
        }
    }

    /// Create an out of scope error.
    #[inline]
    pub fn out_of_scope(path: impl Into<String>, scope: impl Into<String>) -> Self {
        Error::OutOfScope {
            path: path.into(),
            scope: scope.into(),
        }
    }

    /// Create a cyclic reference error.
    #[inline]
    pub fn cyclic(path: impl Into<String>) -> Self {
        Error::CyclicReference { path: path.into() }
    }

    /// Create a not-a-sequence error.
    #[inline]
    pub fn not_a_sequence(path: impl Into<String>) -> Self {
        Error::NotASequence { path: path.into() }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
