//! Draft handle
//!
//! One handle per open draft, pairing the debounced saver with the
//! unsaved-changes guard. A background bridge mirrors the save lifecycle
//! onto the guard, so dirtiness, auto-save arming, and navigation prompts
//! all follow the machine without the caller wiring anything.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use easel_bridge::{Confirmer, EntityRef, HostError, Notifier, Provenance, SavedRecord};
use easel_guard::{GuardOptions, NavigationSave, NavigationVerdict, UnsavedGuard};
use easel_save::{DraftSaver, SaveContext, SaveStatus, SaverOptions};

/// Per-draft knobs supplied at open time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DraftOptions {
    /// Where the draft's content came from; drives notification policy
    pub provenance: Provenance,
}

impl DraftOptions {
    /// Options for an entity that already exists in the store.
    #[inline]
    #[must_use]
    pub fn existing() -> Self {
        Self {
            provenance: Provenance::Existing,
        }
    }

    /// Options for a never-persisted draft; background saves stay quiet.
    #[inline]
    #[must_use]
    pub fn draft() -> Self {
        Self {
            provenance: Provenance::Draft,
        }
    }
}

/// Routes the guard's save requests through the draft's saver.
///
/// Quiet on purpose: the guard and the auto-save loop narrate their own
/// outcomes, and a second voice here would double the notices.
struct SaverBridge {
    saver: DraftSaver,
}

#[async_trait]
impl NavigationSave for SaverBridge {
    async fn save_now(&self) -> Result<(), HostError> {
        let content = self.saver.latest_content();
        self.saver.save_quiet(content).await.map(|_| ())
    }
}

/// Wire a saver and guard together over `entity` and hand back the handle.
pub(crate) fn open_draft(
    entity: EntityRef,
    initial_content: String,
    context: SaveContext,
    saver_options: SaverOptions,
    notifier: Arc<dyn Notifier>,
    confirmer: Arc<dyn Confirmer>,
    guard_options: GuardOptions,
) -> DraftHandle {
    let saver = DraftSaver::new(entity.clone(), initial_content, context, saver_options);
    let bridge: Arc<dyn NavigationSave> = Arc::new(SaverBridge {
        saver: saver.clone(),
    });
    let guard = UnsavedGuard::new(entity, notifier, confirmer, Some(bridge), guard_options);
    DraftHandle::new(saver, guard)
}

struct DraftInner {
    saver: DraftSaver,
    guard: UnsavedGuard,
    status_bridge: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Drop for DraftInner {
    fn drop(&mut self) {
        if let Some(task) = self.status_bridge.lock().take() {
            task.abort();
        }
        self.saver.close();
        self.guard.close();
    }
}

/// One open draft: debounced persistence plus exit-path protection.
///
/// Cheap to clone; all clones share the same draft. Dropping the last
/// clone tears the draft down as if [`close`](DraftHandle::close) had run.
#[derive(Clone)]
pub struct DraftHandle {
    inner: Arc<DraftInner>,
}

impl DraftHandle {
    pub(crate) fn new(saver: DraftSaver, guard: UnsavedGuard) -> Self {
        let status_bridge = spawn_status_bridge(&saver, &guard);
        Self {
            inner: Arc::new(DraftInner {
                saver,
                guard,
                status_bridge: Mutex::new(Some(status_bridge)),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Entity this draft edits.
    #[inline]
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        self.inner.saver.entity()
    }

    /// Current save lifecycle state.
    #[inline]
    #[must_use]
    pub fn status(&self) -> SaveStatus {
        self.inner.saver.status()
    }

    /// Subscribe to save lifecycle changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.saver.subscribe()
    }

    /// Whether edits exist that have not reached the store.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.saver.is_dirty()
    }

    /// Receipt from the last acknowledged save, if any completed.
    #[must_use]
    pub fn last_saved(&self) -> Option<SavedRecord> {
        self.inner.saver.last_saved()
    }

    /// Most recent content the draft knows: the pending edit if one
    /// exists, otherwise the persisted baseline.
    #[must_use]
    pub fn latest_content(&self) -> String {
        self.inner.saver.latest_content()
    }

    /// Whether `content` differs from the last persisted baseline.
    #[must_use]
    pub fn has_unsaved_changes(&self, content: &str) -> bool {
        self.inner.saver.has_unsaved_changes(content)
    }

    /// Re-seed the baseline from freshly loaded content.
    pub fn initialize(&self, content: impl Into<String>) {
        self.inner.saver.initialize(content);
    }

    /// Record an edit and (re)arm the quiet-window timer.
    pub fn debounced_save(&self, content: impl Into<String>) {
        self.inner.saver.debounced_save(content);
    }

    /// Save `content` immediately, bypassing the quiet window.
    pub async fn force_save(
        &self,
        content: impl Into<String>,
    ) -> Result<SavedRecord, HostError> {
        self.inner.saver.force_save(content).await
    }

    /// Synchronous exit check: whether the platform should raise its
    /// native leave-site prompt.
    #[must_use]
    pub fn before_unload(&self) -> bool {
        self.inner.guard.before_unload()
    }

    /// Walk the user through leaving while unsaved work exists.
    pub async fn before_navigate(&self) -> NavigationVerdict {
        self.inner.guard.before_navigate().await
    }

    /// Guard view of the draft, for callers that want dirty subscriptions
    /// or the last background-save time.
    #[inline]
    #[must_use]
    pub fn guard(&self) -> &UnsavedGuard {
        &self.inner.guard
    }

    /// Tear the draft down: cancel timers, stop the auto-save loop, and
    /// refuse further saves. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.inner.status_bridge.lock().take() {
            task.abort();
        }
        self.inner.saver.close();
        self.inner.guard.close();
        tracing::debug!(entity = %self.inner.saver.entity(), "draft closed");
    }

    /// Whether [`close`](DraftHandle::close) has run.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for DraftHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftHandle")
            .field("entity", &self.inner.saver.entity())
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Mirror saver lifecycle changes onto the guard.
///
/// `modified` and `error` arm the guard, `saved` disarms it, and `saving`
/// suppresses auto-save ticks. While an attempt is in flight dirtiness is
/// left alone: clearing it would disarm the auto-save loop under its own
/// running tick, and the attempt has not been acknowledged yet anyway.
/// Coalesced updates are fine, only the latest state matters.
fn spawn_status_bridge(saver: &DraftSaver, guard: &UnsavedGuard) -> JoinHandle<()> {
    let mut rx = saver.subscribe();
    let guard = guard.clone();
    tokio::spawn(async move {
        loop {
            let status = *rx.borrow_and_update();
            guard.set_saving(status == SaveStatus::Saving);
            if status != SaveStatus::Saving {
                guard.set_dirty(status.is_dirty());
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_bridge::ArtifactKind;
    use easel_test_utils::{MemoryStore, RecordingNotifier, ScriptedConfirmer};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn fixture() -> (DraftHandle, MemoryStore) {
        let store = MemoryStore::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let context = SaveContext::new(Arc::new(store.clone()), notifier.clone());
        (
            open_draft(
                EntityRef::new(ArtifactKind::Note, "scratch"),
                "A".to_string(),
                context,
                SaverOptions::default(),
                notifier,
                Arc::new(ScriptedConfirmer::accepting()),
                GuardOptions::default(),
            ),
            store,
        )
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_bridge_feeds_the_guard() {
        let (draft, _store) = fixture();
        assert!(!draft.guard().is_dirty());

        draft.debounced_save("AB");
        settle().await;
        assert!(draft.guard().is_dirty());
        assert!(draft.before_unload());

        tokio::time::advance(Duration::from_millis(2000)).await;
        settle().await;
        assert_eq!(draft.status(), SaveStatus::Saved);
        assert!(!draft.guard().is_dirty());
        assert!(!draft.before_unload());
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_idempotent_and_stops_everything() {
        let (draft, store) = fixture();
        draft.debounced_save("AB");

        draft.close();
        draft.close();
        assert!(draft.is_closed());

        tokio::time::advance(Duration::from_millis(3000)).await;
        settle().await;
        assert_eq!(store.save_count(), 0);
        let refused = draft.force_save("AB").await;
        assert!(matches!(refused, Err(HostError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_last_clone_tears_the_draft_down() {
        let (draft, store) = fixture();
        let saver = draft.inner.saver.clone();
        draft.debounced_save("AB");
        drop(draft);

        assert!(saver.is_closed());
        tokio::time::advance(Duration::from_millis(3000)).await;
        settle().await;
        assert_eq!(store.save_count(), 0);
    }
}
