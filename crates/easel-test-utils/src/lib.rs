//! Easel Test Utils - shared doubles for exercising the resilience layer
//!
//! Hand-rolled fakes rather than a mocking framework:
//! - [`MemoryStore`]: in-memory [`ContentStore`] with scriptable failures
//! - [`RecordingNotifier`]: captures every [`Notice`] for inspection
//! - [`ScriptedConfirmer`]: answers confirmations from a queued script

#![warn(unreachable_pub)]

use async_trait::async_trait;
use chrono::Utc;
use easel_bridge::{
    ConfirmRequest, Confirmer, ContentStore, EntityRef, HostError, Notice, NoticeKind, Notifier,
    SavedRecord,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One recorded `save` invocation, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveCall {
    /// Entity the call targeted
    pub entity: EntityRef,
    /// Content the call carried
    pub content: String,
}

struct StoreInner {
    calls: Mutex<Vec<SaveCall>>,
    committed: Mutex<Vec<String>>,
    script: Mutex<VecDeque<HostError>>,
    fail_always: Mutex<Option<HostError>>,
    delay: Mutex<Option<Duration>>,
    revision: AtomicU64,
}

/// In-memory [`ContentStore`] with scriptable failures.
///
/// Failures queued with [`plan_failure`](Self::plan_failure) are consumed
/// one per call, then saves succeed again unless
/// [`fail_always`](Self::fail_always) is set. Every invocation is recorded,
/// whether or not it succeeds.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// Store that accepts every save.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                calls: Mutex::new(Vec::new()),
                committed: Mutex::new(Vec::new()),
                script: Mutex::new(VecDeque::new()),
                fail_always: Mutex::new(None),
                delay: Mutex::new(None),
                revision: AtomicU64::new(0),
            }),
        }
    }

    /// Sleep this long inside every save, to widen in-flight windows.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.inner.delay.lock() = Some(delay);
        self
    }

    /// Queue one failure for the next save call.
    pub fn plan_failure(&self, error: HostError) {
        self.inner.script.lock().push_back(error);
    }

    /// Queue `count` copies of the same failure.
    pub fn plan_failures(&self, count: usize, error: HostError) {
        let mut script = self.inner.script.lock();
        for _ in 0..count {
            script.push_back(error.clone());
        }
    }

    /// Reject every save from now on.
    pub fn fail_always(&self, error: HostError) {
        *self.inner.fail_always.lock() = Some(error);
    }

    /// Drop all planned and permanent failures.
    pub fn heal(&self) {
        self.inner.script.lock().clear();
        *self.inner.fail_always.lock() = None;
    }

    /// Number of save invocations, successful or not.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.inner.calls.lock().len()
    }

    /// Every save invocation, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<SaveCall> {
        self.inner.calls.lock().clone()
    }

    /// Contents of successful saves, in commit order.
    #[must_use]
    pub fn committed(&self) -> Vec<String> {
        self.inner.committed.lock().clone()
    }

    /// Content of the most recent successful save.
    #[must_use]
    pub fn last_committed(&self) -> Option<String> {
        self.inner.committed.lock().last().cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn save(&self, entity: &EntityRef, content: &str) -> Result<SavedRecord, HostError> {
        self.inner.calls.lock().push(SaveCall {
            entity: entity.clone(),
            content: content.to_string(),
        });
        let delay = *self.inner.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.inner.script.lock().pop_front() {
            return Err(error);
        }
        if let Some(error) = self.inner.fail_always.lock().clone() {
            return Err(error);
        }
        self.inner.committed.lock().push(content.to_string());
        Ok(SavedRecord {
            id: entity.id,
            revision: self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1,
            saved_at: Utc::now(),
        })
    }
}

/// Captures every delivered [`Notice`].
#[derive(Clone)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// All delivered notices, in delivery order.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.inner.lock().clone()
    }

    /// Number of delivered notices.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.lock().len()
    }

    /// Number of delivered notices of one kind.
    #[must_use]
    pub fn count_of(&self, kind: NoticeKind) -> usize {
        self.inner.lock().iter().filter(|n| n.kind == kind).count()
    }

    /// Most recently delivered notice.
    #[must_use]
    pub fn last(&self) -> Option<Notice> {
        self.inner.lock().last().cloned()
    }

    /// Forget everything delivered so far.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.inner.lock().push(notice);
    }
}

struct ConfirmInner {
    answers: Mutex<VecDeque<bool>>,
    default_answer: bool,
    requests: Mutex<Vec<ConfirmRequest>>,
}

/// Answers confirmations from a queued script, falling back to a default.
#[derive(Clone)]
pub struct ScriptedConfirmer {
    inner: Arc<ConfirmInner>,
}

impl ScriptedConfirmer {
    /// Confirmer that declines by default.
    #[must_use]
    pub fn new() -> Self {
        Self::with_default(false)
    }

    /// Confirmer that accepts by default.
    #[must_use]
    pub fn accepting() -> Self {
        Self::with_default(true)
    }

    fn with_default(default_answer: bool) -> Self {
        Self {
            inner: Arc::new(ConfirmInner {
                answers: Mutex::new(VecDeque::new()),
                default_answer,
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Queue the answer for the next confirmation.
    pub fn push_answer(&self, answer: bool) {
        self.inner.answers.lock().push_back(answer);
    }

    /// Queue several answers in order.
    pub fn push_answers(&self, answers: impl IntoIterator<Item = bool>) {
        self.inner.answers.lock().extend(answers);
    }

    /// Every question asked so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ConfirmRequest> {
        self.inner.requests.lock().clone()
    }

    /// Number of questions asked so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.inner.requests.lock().len()
    }
}

impl Default for ScriptedConfirmer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, request: ConfirmRequest) -> bool {
        self.inner.requests.lock().push(request);
        self.inner
            .answers
            .lock()
            .pop_front()
            .unwrap_or(self.inner.default_answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_bridge::ArtifactKind;

    fn entity() -> EntityRef {
        EntityRef::new(ArtifactKind::Diagram, "fixture")
    }

    #[tokio::test]
    async fn memory_store_commits_and_counts_revisions() {
        let store = MemoryStore::new();
        let entity = entity();

        let first = store.save(&entity, "one").await.expect("save succeeds");
        let second = store.save(&entity, "two").await.expect("save succeeds");

        assert_eq!(first.revision, 1);
        assert_eq!(second.revision, 2);
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.committed(), vec!["one".to_string(), "two".to_string()]);
        assert_eq!(store.last_committed().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn planned_failures_are_consumed_in_order() {
        let store = MemoryStore::new();
        store.plan_failures(2, HostError::Network("down".to_string()));
        let entity = entity();

        assert!(store.save(&entity, "a").await.is_err());
        assert!(store.save(&entity, "a").await.is_err());
        assert!(store.save(&entity, "a").await.is_ok());
        // failed calls are still recorded
        assert_eq!(store.save_count(), 3);
        assert_eq!(store.committed().len(), 1);
    }

    #[tokio::test]
    async fn fail_always_rejects_until_healed() {
        let store = MemoryStore::new();
        store.fail_always(HostError::Storage("full".to_string()));
        let entity = entity();

        assert!(store.save(&entity, "a").await.is_err());
        assert!(store.save(&entity, "a").await.is_err());

        store.heal();
        assert!(store.save(&entity, "a").await.is_ok());
    }

    #[tokio::test]
    async fn scripted_confirmer_pops_answers_then_falls_back() {
        let confirmer = ScriptedConfirmer::new();
        confirmer.push_answers([true, false]);

        assert!(confirmer.confirm(ConfirmRequest::new("t", "m")).await);
        assert!(!confirmer.confirm(ConfirmRequest::new("t", "m")).await);
        // script exhausted, default declines
        assert!(!confirmer.confirm(ConfirmRequest::new("t", "m")).await);
        assert_eq!(confirmer.request_count(), 3);
    }

    #[test]
    fn recording_notifier_filters_by_kind() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notice::info("a", "b"));
        notifier.notify(Notice::error("c", "d"));

        assert_eq!(notifier.count(), 2);
        assert_eq!(notifier.count_of(NoticeKind::Error), 1);
        assert_eq!(notifier.last().map(|n| n.title), Some("c".to_string()));

        notifier.clear();
        assert_eq!(notifier.count(), 0);
    }
}
