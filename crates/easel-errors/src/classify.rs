//! Failure classification
//!
//! Centralizes the category / recoverability / retryability decision so every
//! call site gets the same verdict instead of re-implementing heuristics.

use easel_bridge::HostError;
use serde::{Deserialize, Serialize};

/// Broad failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Transient transport failure
    Network,
    /// Remote side failed (5xx)
    Server,
    /// Request was wrong (4xx) or abandoned
    Client,
    /// User input rejected before transmission
    Validation,
    /// Could not be mapped to a narrower category
    Unknown,
}

impl ErrorCategory {
    /// Lowercase label used in logs and stats.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Server => "server",
            Self::Client => "client",
            Self::Validation => "validation",
            Self::Unknown => "unknown",
        }
    }
}

/// Classification verdict for one failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Broad category
    pub category: ErrorCategory,
    /// Whether the user can plausibly recover (retry, fix input, wait)
    pub is_recoverable: bool,
    /// Whether an automatic retry is worthwhile
    pub can_retry: bool,
    /// Human-oriented message
    pub message: String,
}

/// Classify a host failure.
///
/// Network and timeout failures are transient and worth retrying. A 5xx
/// answer means the remote side may come back, so it retries too. A 4xx
/// answer will not improve by repetition. Validation failures need a human.
/// Everything else is conservatively treated as neither.
#[must_use]
pub fn classify(error: &HostError) -> ErrorInfo {
    let (category, is_recoverable, can_retry) = match error {
        HostError::Network(_) | HostError::Timeout { .. } => (ErrorCategory::Network, true, true),
        HostError::Status { status, .. } if *status >= 500 => (ErrorCategory::Server, true, true),
        HostError::Status { .. } => (ErrorCategory::Client, false, false),
        HostError::Cancelled => (ErrorCategory::Client, true, false),
        HostError::Validation(_) => (ErrorCategory::Validation, true, false),
        HostError::Storage(_) | HostError::Other(_) => (ErrorCategory::Unknown, false, false),
    };
    ErrorInfo {
        category,
        is_recoverable,
        can_retry,
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn network_flavored_failures_retry() {
        let info = classify(&HostError::Network("connection reset".to_string()));
        assert_eq!(info.category, ErrorCategory::Network);
        assert!(info.is_recoverable);
        assert!(info.can_retry);

        let info = classify(&HostError::Timeout { elapsed_ms: 5000 });
        assert_eq!(info.category, ErrorCategory::Network);
        assert!(info.can_retry);
    }

    #[test]
    fn server_status_retries_client_status_does_not() {
        let info = classify(&HostError::Status {
            status: 503,
            message: "unavailable".to_string(),
        });
        assert_eq!(info.category, ErrorCategory::Server);
        assert!(info.can_retry);

        let info = classify(&HostError::Status {
            status: 404,
            message: "missing".to_string(),
        });
        assert_eq!(info.category, ErrorCategory::Client);
        assert!(!info.can_retry);
        assert!(!info.is_recoverable);
    }

    #[test]
    fn validation_never_auto_retries() {
        let info = classify(&HostError::Validation("empty title".to_string()));
        assert_eq!(info.category, ErrorCategory::Validation);
        assert!(info.is_recoverable);
        assert!(!info.can_retry);
    }

    #[test]
    fn cancelled_is_a_recoverable_client_failure() {
        let info = classify(&HostError::Cancelled);
        assert_eq!(info.category, ErrorCategory::Client);
        assert!(info.is_recoverable);
        assert!(!info.can_retry);
    }

    #[test]
    fn unmapped_failures_stay_unknown() {
        let info = classify(&HostError::Storage("quota exceeded".to_string()));
        assert_eq!(info.category, ErrorCategory::Unknown);
        assert!(!info.is_recoverable);
        assert!(!info.can_retry);
    }

    proptest! {
        #[test]
        fn status_split_is_exhaustive(status in 100u16..600) {
            let info = classify(&HostError::Status {
                status,
                message: "any".to_string(),
            });
            if status >= 500 {
                prop_assert_eq!(info.category, ErrorCategory::Server);
                prop_assert!(info.can_retry);
            } else {
                prop_assert_eq!(info.category, ErrorCategory::Client);
                prop_assert!(!info.can_retry);
            }
        }

        #[test]
        fn message_always_carries_the_source_text(reason in "[a-z ]{1,32}") {
            let info = classify(&HostError::Network(reason.clone()));
            prop_assert!(info.message.contains(&reason));
        }
    }
}
