//! Process-wide error ledger
//!
//! Every handled failure lands here exactly once: classified, logged, and
//! appended to a bounded most-recent-first history that UI regions can
//! inspect later without having seen the failure themselves.

use crate::classify::{classify, ErrorCategory, ErrorInfo};
use chrono::{DateTime, Utc};
use easel_bridge::HostError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

/// Default bound on retained history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Context attached to a recorded failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Operation that failed ("save diagram", "load project")
    pub operation: Option<String>,
    /// Component that observed the failure
    pub component: Option<String>,
    /// Entity involved, if any
    pub entity: Option<String>,
    /// Free-form detail
    pub detail: Option<String>,
}

impl ErrorContext {
    /// Context naming only the failed operation.
    #[inline]
    #[must_use]
    pub fn operation(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Self::default()
        }
    }

    /// With the observing component.
    #[inline]
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// With the entity involved.
    #[inline]
    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// With free-form detail.
    #[inline]
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// One handled failure. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    /// Classification verdict
    pub info: ErrorInfo,
    /// Caller-supplied context
    pub context: ErrorContext,
    /// When the failure was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate counters over the current history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStats {
    /// Records currently retained
    pub total: usize,
    /// Per-category counts
    pub network: usize,
    /// 5xx-class failures
    pub server: usize,
    /// 4xx-class and cancelled failures
    pub client: usize,
    /// Rejected user input
    pub validation: usize,
    /// Unmapped failures
    pub unknown: usize,
    /// Records the user can recover from
    pub recoverable: usize,
    /// Records worth an automatic retry
    pub retryable: usize,
}

struct RegistryInner {
    history: RwLock<VecDeque<ErrorRecord>>,
    capacity: usize,
}

/// Bounded most-recent-first ledger of handled failures.
///
/// Cheap to clone; all clones share the same history.
#[derive(Clone)]
pub struct ErrorRegistry {
    inner: Arc<RegistryInner>,
}

impl ErrorRegistry {
    /// Registry with the default history bound.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Registry retaining at most `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                history: RwLock::new(VecDeque::new()),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Classify `error`, record it, log it once, and return the verdict.
    pub fn handle(&self, error: &HostError, context: ErrorContext) -> ErrorInfo {
        let info = classify(error);
        let operation = context.operation.as_deref().unwrap_or("unspecified");
        let component = context.component.as_deref().unwrap_or("unspecified");
        if info.is_recoverable {
            tracing::warn!(
                category = info.category.as_str(),
                retryable = info.can_retry,
                operation,
                component,
                "handled failure: {error}"
            );
        } else {
            tracing::error!(
                category = info.category.as_str(),
                operation,
                component,
                "handled failure: {error}"
            );
        }

        let record = ErrorRecord {
            info: info.clone(),
            context,
            recorded_at: Utc::now(),
        };
        let mut history = self.inner.history.write();
        history.push_front(record);
        history.truncate(self.inner.capacity);
        info
    }

    /// Run `future`, recording any failure before propagating it.
    pub async fn observed<T, F>(&self, operation: &str, future: F) -> Result<T, HostError>
    where
        F: Future<Output = Result<T, HostError>>,
    {
        match future.await {
            Ok(value) => Ok(value),
            Err(error) => {
                self.handle(&error, ErrorContext::operation(operation));
                Err(error)
            }
        }
    }

    /// Recording handle that pre-fills the component field.
    #[inline]
    #[must_use]
    pub fn scoped(&self, component: impl Into<String>) -> ErrorScope {
        ErrorScope {
            registry: self.clone(),
            component: component.into(),
        }
    }

    /// Retained history, most recent first.
    #[must_use]
    pub fn history(&self) -> Vec<ErrorRecord> {
        self.inner.history.read().iter().cloned().collect()
    }

    /// Aggregate counters over the retained history.
    #[must_use]
    pub fn stats(&self) -> ErrorStats {
        let history = self.inner.history.read();
        let mut stats = ErrorStats {
            total: history.len(),
            ..ErrorStats::default()
        };
        for record in history.iter() {
            match record.info.category {
                ErrorCategory::Network => stats.network += 1,
                ErrorCategory::Server => stats.server += 1,
                ErrorCategory::Client => stats.client += 1,
                ErrorCategory::Validation => stats.validation += 1,
                ErrorCategory::Unknown => stats.unknown += 1,
            }
            if record.info.is_recoverable {
                stats.recoverable += 1;
            }
            if record.info.can_retry {
                stats.retryable += 1;
            }
        }
        stats
    }

    /// True iff any retained record is unrecoverable and not a transient
    /// network blip.
    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.inner.history.read().iter().any(|record| {
            !record.info.is_recoverable
                && matches!(
                    record.info.category,
                    ErrorCategory::Server | ErrorCategory::Client | ErrorCategory::Unknown
                )
        })
    }

    /// Number of retained records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.history.read().len()
    }

    /// Whether the history is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.history.read().is_empty()
    }

    /// Drop all retained records.
    pub fn clear(&self) {
        self.inner.history.write().clear();
    }
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ErrorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorRegistry")
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

/// Component-scoped recording handle.
#[derive(Debug, Clone)]
pub struct ErrorScope {
    registry: ErrorRegistry,
    component: String,
}

impl ErrorScope {
    /// Record `error` under this scope's component.
    pub fn handle(&self, error: &HostError, operation: &str) -> ErrorInfo {
        self.registry.handle(
            error,
            ErrorContext::operation(operation).with_component(self.component.clone()),
        )
    }

    /// Run `future`, recording any failure under this scope before
    /// propagating it.
    pub async fn observed<T, F>(&self, operation: &str, future: F) -> Result<T, HostError>
    where
        F: Future<Output = Result<T, HostError>>,
    {
        match future.await {
            Ok(value) => Ok(value),
            Err(error) => {
                self.handle(&error, operation);
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error() -> HostError {
        HostError::Status {
            status: 500,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn handle_returns_classification_and_records() {
        let registry = ErrorRegistry::new();
        let info = registry.handle(
            &HostError::Network("offline".to_string()),
            ErrorContext::operation("save diagram"),
        );

        assert_eq!(info.category, ErrorCategory::Network);
        assert_eq!(registry.len(), 1);
        let history = registry.history();
        assert_eq!(history[0].context.operation.as_deref(), Some("save diagram"));
    }

    #[test]
    fn history_is_most_recent_first() {
        let registry = ErrorRegistry::new();
        registry.handle(&HostError::Network("first".to_string()), ErrorContext::default());
        registry.handle(&HostError::Network("second".to_string()), ErrorContext::default());

        let history = registry.history();
        assert!(history[0].info.message.contains("second"));
        assert!(history[1].info.message.contains("first"));
    }

    #[test]
    fn history_is_bounded() {
        let registry = ErrorRegistry::with_capacity(3);
        for i in 0..5 {
            registry.handle(&HostError::Network(format!("err {i}")), ErrorContext::default());
        }

        assert_eq!(registry.len(), 3);
        let history = registry.history();
        assert!(history[0].info.message.contains("err 4"));
        assert!(history[2].info.message.contains("err 2"));
    }

    #[test]
    fn stats_count_per_category() {
        let registry = ErrorRegistry::new();
        registry.handle(&HostError::Network("a".to_string()), ErrorContext::default());
        registry.handle(&server_error(), ErrorContext::default());
        registry.handle(&HostError::Validation("b".to_string()), ErrorContext::default());
        registry.handle(&HostError::Other("c".to_string()), ErrorContext::default());

        let stats = registry.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.network, 1);
        assert_eq!(stats.server, 1);
        assert_eq!(stats.validation, 1);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.retryable, 2);
        assert_eq!(stats.recoverable, 3);
    }

    #[test]
    fn critical_requires_unrecoverable_non_network() {
        let registry = ErrorRegistry::new();
        registry.handle(&HostError::Network("blip".to_string()), ErrorContext::default());
        assert!(!registry.has_critical());

        registry.handle(&server_error(), ErrorContext::default());
        assert!(!registry.has_critical());

        registry.handle(&HostError::Other("corrupt state".to_string()), ErrorContext::default());
        assert!(registry.has_critical());

        registry.clear();
        assert!(!registry.has_critical());
        assert!(registry.is_empty());
    }

    #[test]
    fn scoped_handle_prefills_component() {
        let registry = ErrorRegistry::new();
        let scope = registry.scoped("draft-saver");
        scope.handle(&server_error(), "save");

        let record = &registry.history()[0];
        assert_eq!(record.context.component.as_deref(), Some("draft-saver"));
        assert_eq!(record.context.operation.as_deref(), Some("save"));
    }

    #[tokio::test]
    async fn observed_records_failures_and_propagates() {
        let registry = ErrorRegistry::new();

        let ok = registry
            .observed("load", async { Ok::<_, HostError>(7) })
            .await;
        assert_eq!(ok.ok(), Some(7));
        assert!(registry.is_empty());

        let err = registry
            .observed("load", async { Err::<i32, _>(server_error()) })
            .await;
        assert!(err.is_err());
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.history()[0].context.operation.as_deref(),
            Some("load")
        );
    }

    #[tokio::test]
    async fn clones_share_history() {
        let registry = ErrorRegistry::new();
        let clone = registry.clone();
        clone.handle(&server_error(), ErrorContext::default());
        assert_eq!(registry.len(), 1);
    }
}
