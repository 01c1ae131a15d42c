//! Error types for fedgate.

use thiserror::Error;

/// Result type alias for fedgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during federated coordination.
#[derive(Error, Debug)]
pub enum Error {
    // Access control errors
    /// A node's privacy filter refused a query. Expected and non-fatal:
    /// the node is excluded from the current round. Carries the refusal
    /// reason and never the refused value.
    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    // Transformation errors
    /// A data transformation failed on a node. Collected per node during
    /// fan-out; the node's data state after a failure is not guaranteed.
    #[error("transformation failed on node {node}: {detail}")]
    Transformation { node: String, detail: String },

    // Aggregation errors
    /// Per-node parameter sets disagree on shape. Fatal to the round.
    #[error("parameter shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    /// No node survived training or collection in a round. Fatal to the
    /// run; metrics for rounds completed so far are preserved.
    #[error("no viable participants remain in this round")]
    NoViableParticipants,

    // Setup errors
    /// Invalid configuration, e.g. negative or all-zero aggregation
    /// weights. Raised at construction, never mid-run.
    #[error("configuration error: {0}")]
    Configuration(String),

    // Generic errors
    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error excludes a single node rather than failing the round.
    pub fn is_exclusion(&self) -> bool {
        matches!(self, Error::AccessDenied { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
