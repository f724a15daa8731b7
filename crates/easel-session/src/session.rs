//! Workbench session
//!
//! The single entry point a host shell holds onto. A session owns the
//! shared loading and error registries, carries the save/retry policy,
//! and opens drafts wired to all of it. Everything else in the layer can
//! be used piecemeal; this is the assembled product.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use easel_bridge::{Confirmer, ContentStore, EntityRef, Notifier};
use easel_errors::{ErrorRegistry, DEFAULT_HISTORY_CAPACITY};
use easel_guard::{GuardOptions, DEFAULT_AUTO_SAVE_PERIOD};
use easel_loading::LoadingRegistry;
use easel_retry::{RetryPolicy, RetryRunner};
use easel_save::{SaveContext, SaverOptions, DEFAULT_DEBOUNCE};

use crate::draft::{DraftHandle, DraftOptions};

/// Session-wide policy applied to every draft it opens.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet window between the last edit and its save
    pub debounce: Duration,
    /// Auto-save period for dirty drafts; `None` disables the loop
    pub auto_save: Option<Duration>,
    /// Backoff schedule for persistence attempts
    pub retry: RetryPolicy,
    /// Error records retained by the shared registry
    pub error_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            auto_save: Some(DEFAULT_AUTO_SAVE_PERIOD),
            retry: RetryPolicy::default(),
            error_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Configuration with all defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a quiet window.
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// With an auto-save period.
    #[inline]
    #[must_use]
    pub fn with_auto_save(mut self, period: Duration) -> Self {
        self.auto_save = Some(period);
        self
    }

    /// With the auto-save loop disabled.
    #[inline]
    #[must_use]
    pub fn without_auto_save(mut self) -> Self {
        self.auto_save = None;
        self
    }

    /// With a retry policy for persistence attempts.
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With an error history capacity.
    #[inline]
    #[must_use]
    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity;
        self
    }
}

/// Errors surfaced by session-level operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session has been shut down; it refuses new drafts
    #[error("session is shut down")]
    Closed,

    /// A live draft already exists for this entity
    #[error("a draft is already open for {0}")]
    DraftAlreadyOpen(EntityRef),
}

struct SessionInner {
    config: SessionConfig,
    store: Arc<dyn ContentStore>,
    notifier: Arc<dyn Notifier>,
    confirmer: Arc<dyn Confirmer>,
    loading: LoadingRegistry,
    errors: ErrorRegistry,
    drafts: Mutex<Vec<DraftHandle>>,
    closed: AtomicBool,
}

/// One user-facing workbench session.
///
/// Cheap to clone; all clones share the same session. Drafts opened here
/// inherit the session policy and report into the shared registries, so a
/// status bar can watch one [`LoadingRegistry`] and one [`ErrorRegistry`]
/// regardless of how many drafts are up.
#[derive(Clone)]
pub struct WorkbenchSession {
    inner: Arc<SessionInner>,
}

impl WorkbenchSession {
    /// Session over the host collaborators with default policy.
    #[must_use]
    pub fn new(
        store: Arc<dyn ContentStore>,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        Self::with_config(store, notifier, confirmer, SessionConfig::default())
    }

    /// Session with explicit policy.
    #[must_use]
    pub fn with_config(
        store: Arc<dyn ContentStore>,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
        config: SessionConfig,
    ) -> Self {
        let errors = ErrorRegistry::with_capacity(config.error_capacity);
        Self {
            inner: Arc::new(SessionInner {
                config,
                store,
                notifier,
                confirmer,
                loading: LoadingRegistry::new(),
                errors,
                drafts: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Session-wide policy.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Shared loading ledger.
    #[must_use]
    pub fn loading(&self) -> LoadingRegistry {
        self.inner.loading.clone()
    }

    /// Shared error history.
    #[must_use]
    pub fn errors(&self) -> ErrorRegistry {
        self.inner.errors.clone()
    }

    /// Open a draft over `entity`, seeded with the loaded content.
    ///
    /// The draft inherits the session's debounce, retry, and auto-save
    /// policy, and its saver reports into the shared registries. At most
    /// one live draft per entity: a second open for the same id fails
    /// until the first is closed.
    pub fn open_draft(
        &self,
        entity: EntityRef,
        initial_content: impl Into<String>,
        options: DraftOptions,
    ) -> Result<DraftHandle, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let mut drafts = self.inner.drafts.lock();
        drafts.retain(|draft| !draft.is_closed());
        if drafts.iter().any(|draft| draft.entity().id == entity.id) {
            return Err(SessionError::DraftAlreadyOpen(entity));
        }

        let context = SaveContext::new(
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.notifier),
        )
        .with_errors(self.inner.errors.clone())
        .with_loading(self.inner.loading.clone());
        let saver_options = SaverOptions::new()
            .with_debounce(self.inner.config.debounce)
            .with_provenance(options.provenance)
            .with_retry(self.inner.config.retry);
        let guard_options = match self.inner.config.auto_save {
            Some(period) => GuardOptions::new().with_auto_save(period),
            None => GuardOptions::new().without_auto_save(),
        }
        .with_provenance(options.provenance);

        tracing::info!(entity = %entity, provenance = ?options.provenance, "draft opened");
        let handle = crate::draft::open_draft(
            entity,
            initial_content.into(),
            context,
            saver_options,
            Arc::clone(&self.inner.notifier),
            Arc::clone(&self.inner.confirmer),
            guard_options,
        );
        drafts.push(handle.clone());
        Ok(handle)
    }

    /// Live drafts currently tracked.
    #[must_use]
    pub fn open_draft_count(&self) -> usize {
        self.inner
            .drafts
            .lock()
            .iter()
            .filter(|draft| !draft.is_closed())
            .count()
    }

    /// Retry runner with the session policy, reporting through the
    /// session notifier. One runner per logical operation; runners are
    /// not shared between unrelated calls.
    #[must_use]
    pub fn retry_runner(&self) -> RetryRunner {
        self.retry_runner_with(self.inner.config.retry)
    }

    /// Retry runner with an explicit policy.
    #[must_use]
    pub fn retry_runner_with(&self, policy: RetryPolicy) -> RetryRunner {
        RetryRunner::new(policy).with_notifier(Arc::clone(&self.inner.notifier))
    }

    /// Close every draft and drain the loading ledger.
    ///
    /// Idempotent. The session refuses new drafts afterwards; existing
    /// handles answer read-only queries but no longer save.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let drafts = std::mem::take(&mut *self.inner.drafts.lock());
        for draft in &drafts {
            draft.close();
        }
        self.inner.loading.stop_all();
        tracing::info!(drafts = drafts.len(), "session shut down");
    }

    /// Whether [`shutdown`](WorkbenchSession::shutdown) has run.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for WorkbenchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkbenchSession")
            .field("config", &self.inner.config)
            .field("open_drafts", &self.open_draft_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_matches_component_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.debounce, DEFAULT_DEBOUNCE);
        assert_eq!(config.auto_save, Some(DEFAULT_AUTO_SAVE_PERIOD));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.error_capacity, DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn config_builders_override_fields() {
        let config = SessionConfig::new()
            .with_debounce(Duration::from_millis(500))
            .without_auto_save()
            .with_retry(RetryPolicy::new().with_max_attempts(5))
            .with_error_capacity(10);
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.auto_save, None);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.error_capacity, 10);
    }

    #[test]
    fn session_error_messages_name_the_entity() {
        use easel_bridge::ArtifactKind;

        assert_eq!(SessionError::Closed.to_string(), "session is shut down");
        let entity = EntityRef::new(ArtifactKind::Diagram, "Pump layout");
        let err = SessionError::DraftAlreadyOpen(entity);
        assert_eq!(
            err.to_string(),
            "a draft is already open for diagram \"Pump layout\""
        );
    }
}
