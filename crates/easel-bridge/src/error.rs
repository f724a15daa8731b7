//! Error type for host collaborator operations
//!
//! Everything the shell can fail with funnels through [`HostError`] so the
//! classifier and retry layers see one shape regardless of transport.

/// Failure surfaced by a host collaborator (persistence, transport, dialogs).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Request never reached the remote side
    #[error("network error: {0}")]
    Network(String),

    /// Operation exceeded its deadline
    #[error("operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds spent before giving up
        elapsed_ms: u64,
    },

    /// Remote side answered with a failure status
    #[error("status {status}: {message}")]
    Status {
        /// HTTP-like status code
        status: u16,
        /// Server-provided message
        message: String,
    },

    /// Payload rejected before transmission
    #[error("validation failed: {0}")]
    Validation(String),

    /// Local persistence layer failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Caller abandoned the operation
    #[error("operation cancelled")]
    Cancelled,

    /// Anything the bridge could not map to a narrower variant
    #[error("{0}")]
    Other(String),
}

impl HostError {
    /// Status code carried by this error, if any.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the caller abandoned the operation.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
