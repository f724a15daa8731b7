//! Unsaved-changes guard
//!
//! One [`UnsavedGuard`] per open draft watches a dirty flag fed from the
//! save machine and intercepts the two exit paths: the synchronous
//! platform unload prompt and the asynchronous in-app navigation flow.
//! While dirty it also drives an optional periodic auto-save loop.
//!
//! The guard never persists anything itself; it delegates to the
//! [`NavigationSave`] callback it was configured with and narrates the
//! outcome.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use easel_bridge::{
    ConfirmKind, ConfirmRequest, Confirmer, EntityRef, HostError, Notice, Notifier, Provenance,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default period of the auto-save loop.
pub const DEFAULT_AUTO_SAVE_PERIOD: Duration = Duration::from_secs(30);

/// Saves the draft's latest content on behalf of the guard.
///
/// Implementations are expected to be cheap to call when nothing has
/// changed and to record their own failures.
#[async_trait]
pub trait NavigationSave: Send + Sync {
    /// Persist the latest content now.
    async fn save_now(&self) -> Result<(), HostError>;
}

/// Outcome of a navigation interception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationVerdict {
    /// Leave the draft; unsaved work was saved or knowingly discarded
    Proceed,
    /// Block the navigation and keep editing
    Stay,
}

impl NavigationVerdict {
    /// Whether the navigation may go ahead.
    #[inline]
    #[must_use]
    pub fn allows_navigation(self) -> bool {
        matches!(self, Self::Proceed)
    }
}

/// Per-guard configuration.
#[derive(Debug, Clone, Copy)]
pub struct GuardOptions {
    /// Auto-save period; `None` disables the loop
    pub auto_save: Option<Duration>,
    /// Whether the entity existed before this editing session
    pub provenance: Provenance,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            auto_save: Some(DEFAULT_AUTO_SAVE_PERIOD),
            provenance: Provenance::default(),
        }
    }
}

impl GuardOptions {
    /// Options with all defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// With an entity provenance.
    #[inline]
    #[must_use]
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}

struct GuardInner {
    entity: EntityRef,
    options: GuardOptions,
    notifier: Arc<dyn Notifier>,
    confirmer: Arc<dyn Confirmer>,
    save: Option<Arc<dyn NavigationSave>>,
    dirty_tx: watch::Sender<bool>,
    saving: AtomicBool,
    last_saved_at: Mutex<Option<DateTime<Utc>>>,
    auto_save_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Drop for GuardInner {
    fn drop(&mut self) {
        if let Some(task) = self.auto_save_task.lock().take() {
            task.abort();
        }
    }
}

/// Guards one draft's exit paths while unsaved work exists.
///
/// Cheap to clone; all clones share the same state. Armed iff the dirty
/// flag is set: clean drafts never prompt and never auto-save.
#[derive(Clone)]
pub struct UnsavedGuard {
    inner: Arc<GuardInner>,
}

impl UnsavedGuard {
    /// Guard for `entity`, saving through `save` when one is configured.
    #[must_use]
    pub fn new(
        entity: EntityRef,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
        save: Option<Arc<dyn NavigationSave>>,
        options: GuardOptions,
    ) -> Self {
        let (dirty_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(GuardInner {
                entity,
                options,
                notifier,
                confirmer,
                save,
                dirty_tx,
                saving: AtomicBool::new(false),
                last_saved_at: Mutex::new(None),
                auto_save_task: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Entity this guard watches.
    #[inline]
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.inner.entity
    }

    /// Whether unsaved work exists.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        *self.inner.dirty_tx.borrow()
    }

    /// Whether a background save is currently in flight.
    #[inline]
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.inner.saving.load(Ordering::SeqCst)
    }

    /// When the guard last saw a successful save, if ever.
    #[must_use]
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_saved_at.lock()
    }

    /// Subscribe to dirty-flag changes.
    #[must_use]
    pub fn subscribe_dirty(&self) -> watch::Receiver<bool> {
        self.inner.dirty_tx.subscribe()
    }

    /// Feed the dirty flag from the save machine.
    ///
    /// The auto-save loop is armed exactly on the `false -> true`
    /// transition and disarmed exactly on `true -> false`; repeated calls
    /// with the same value change nothing.
    pub fn set_dirty(&self, dirty: bool) {
        if self.is_closed() {
            return;
        }
        let was = self.inner.dirty_tx.send_replace(dirty);
        if was == dirty {
            return;
        }
        if dirty {
            self.arm_auto_save();
        } else {
            self.disarm_auto_save();
        }
    }

    /// Mark whether a background save is in flight.
    ///
    /// Auto-save ticks skip while the flag is set; it does not affect
    /// dirtiness.
    pub fn set_saving(&self, saving: bool) {
        self.inner.saving.store(saving, Ordering::SeqCst);
    }

    /// Synchronous unload interception: whether the platform should put up
    /// its native leave-site prompt.
    ///
    /// This path cannot run async logic by platform constraint, so it only
    /// reports whether unsaved work exists. It never saves.
    #[must_use]
    pub fn before_unload(&self) -> bool {
        !self.is_closed() && self.is_dirty()
    }

    /// In-app navigation interception.
    ///
    /// Clean drafts proceed immediately. Dirty drafts with a save path get
    /// the save-or-discard flow; without one, a plain leave-or-stay
    /// question. A save failure is a decision point, never a silent
    /// proceed.
    pub async fn before_navigate(&self) -> NavigationVerdict {
        if self.is_closed() || !self.is_dirty() {
            return NavigationVerdict::Proceed;
        }
        match self.inner.save.clone() {
            Some(save) => self.navigate_with_save(save).await,
            None => self.navigate_binary().await,
        }
    }

    /// Tear the guard down: disarm auto-save and stop intercepting.
    ///
    /// Idempotent. Leaving this out leaks the interval across navigations,
    /// so owners call it unconditionally.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.disarm_auto_save();
        tracing::debug!(entity = %self.inner.entity, "guard closed");
    }

    /// Whether [`close`](Self::close) has run.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    async fn navigate_with_save(&self, save: Arc<dyn NavigationSave>) -> NavigationVerdict {
        let wants_save = self
            .inner
            .confirmer
            .confirm(
                ConfirmRequest::new("Unsaved changes", "Save your changes before leaving?")
                    .with_labels("Save and leave", "Don't save"),
            )
            .await;
        if !wants_save {
            return self.confirm_discard().await;
        }

        self.inner.saving.store(true, Ordering::SeqCst);
        let result = save.save_now().await;
        self.inner.saving.store(false, Ordering::SeqCst);
        match result {
            Ok(()) => {
                *self.inner.last_saved_at.lock() = Some(Utc::now());
                self.set_dirty(false);
                self.inner.notifier.notify(Notice::success(
                    "Saved",
                    format!("{} saved", self.inner.entity),
                ));
                NavigationVerdict::Proceed
            }
            Err(error) => {
                let leave_anyway = self
                    .inner
                    .confirmer
                    .confirm(
                        ConfirmRequest::new("Save failed", "Leave without saving?")
                            .with_kind(ConfirmKind::Danger)
                            .with_labels("Leave anyway", "Stay")
                            .with_detail(error.to_string()),
                    )
                    .await;
                if leave_anyway {
                    self.set_dirty(false);
                    NavigationVerdict::Proceed
                } else {
                    NavigationVerdict::Stay
                }
            }
        }
    }

    async fn confirm_discard(&self) -> NavigationVerdict {
        let discard = self
            .inner
            .confirmer
            .confirm(
                ConfirmRequest::new("Discard changes?", "Your unsaved edits will be lost.")
                    .with_kind(ConfirmKind::Warning)
                    .with_labels("Discard and leave", "Keep editing"),
            )
            .await;
        if discard {
            self.set_dirty(false);
            NavigationVerdict::Proceed
        } else {
            NavigationVerdict::Stay
        }
    }

    async fn navigate_binary(&self) -> NavigationVerdict {
        let leave = self
            .inner
            .confirmer
            .confirm(
                ConfirmRequest::new("Unsaved changes", "Leave without saving?")
                    .with_kind(ConfirmKind::Warning)
                    .with_labels("Leave", "Stay"),
            )
            .await;
        if leave {
            self.set_dirty(false);
            NavigationVerdict::Proceed
        } else {
            NavigationVerdict::Stay
        }
    }

    fn arm_auto_save(&self) {
        let Some(period) = self.inner.options.auto_save else {
            return;
        };
        if self.inner.save.is_none() {
            return;
        }
        let mut slot = self.inner.auto_save_task.lock();
        if slot.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        // first tick anchored at the arming transition, not at the task's
        // first poll
        let start = tokio::time::Instant::now() + period;
        *slot = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(start, period);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let Some(inner) = Weak::upgrade(&weak) else {
                    return;
                };
                UnsavedGuard { inner }.auto_save_tick().await;
            }
        }));
        tracing::debug!(
            entity = %self.inner.entity,
            period_secs = period.as_secs(),
            "auto-save armed"
        );
    }

    fn disarm_auto_save(&self) {
        if let Some(task) = self.inner.auto_save_task.lock().take() {
            task.abort();
            tracing::debug!(entity = %self.inner.entity, "auto-save disarmed");
        }
    }

    async fn auto_save_tick(&self) {
        if self.is_closed() || !self.is_dirty() || self.is_saving() {
            return;
        }
        let Some(save) = self.inner.save.clone() else {
            return;
        };

        self.inner.saving.store(true, Ordering::SeqCst);
        let result = save.save_now().await;
        self.inner.saving.store(false, Ordering::SeqCst);
        match result {
            Ok(()) => {
                *self.inner.last_saved_at.lock() = Some(Utc::now());
                self.set_dirty(false);
                if self.inner.options.provenance.announces_saves() {
                    self.inner.notifier.notify(
                        Notice::info(
                            "Auto-saved",
                            format!("{} saved automatically", self.inner.entity),
                        )
                        .with_duration(Duration::from_secs(2)),
                    );
                }
            }
            Err(error) => {
                // non-fatal: the interval keeps ticking while still dirty
                tracing::warn!(entity = %self.inner.entity, "auto-save failed: {error}");
                self.inner.notifier.notify(Notice::warning(
                    "Auto-save failed",
                    format!("Could not save {}: {error}", self.inner.entity),
                ));
            }
        }
    }
}

impl fmt::Debug for UnsavedGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsavedGuard")
            .field("entity", &self.inner.entity)
            .field("dirty", &self.is_dirty())
            .field("saving", &self.is_saving())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_bridge::{ArtifactKind, NoticeKind};
    use easel_test_utils::{RecordingNotifier, ScriptedConfirmer};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedSave {
        calls: AtomicUsize,
        failures: Mutex<VecDeque<HostError>>,
    }

    impl ScriptedSave {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures: Mutex::new(VecDeque::new()),
            })
        }

        fn plan_failure(&self, error: HostError) {
            self.failures.lock().push_back(error);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NavigationSave for ScriptedSave {
        async fn save_now(&self) -> Result<(), HostError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failures.lock().pop_front() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    fn entity() -> EntityRef {
        EntityRef::new(ArtifactKind::Diagram, "flow")
    }

    fn guard_without_save(confirmer: ScriptedConfirmer) -> (UnsavedGuard, RecordingNotifier) {
        let notifier = RecordingNotifier::new();
        let guard = UnsavedGuard::new(
            entity(),
            Arc::new(notifier.clone()),
            Arc::new(confirmer),
            None,
            GuardOptions::default(),
        );
        (guard, notifier)
    }

    fn guard_with_save(
        confirmer: ScriptedConfirmer,
        save: Arc<ScriptedSave>,
        options: GuardOptions,
    ) -> (UnsavedGuard, RecordingNotifier) {
        let notifier = RecordingNotifier::new();
        let guard = UnsavedGuard::new(
            entity(),
            Arc::new(notifier.clone()),
            Arc::new(confirmer),
            Some(save),
            options,
        );
        (guard, notifier)
    }

    #[tokio::test(start_paused = true)]
    async fn clean_guard_never_prompts() {
        let confirmer = ScriptedConfirmer::new();
        let (guard, _notifier) = guard_without_save(confirmer.clone());

        assert!(!guard.before_unload());
        assert_eq!(guard.before_navigate().await, NavigationVerdict::Proceed);
        assert_eq!(confirmer.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn binary_confirm_governs_navigation_without_a_save_path() {
        let confirmer = ScriptedConfirmer::new();
        let (guard, _notifier) = guard_without_save(confirmer.clone());
        guard.set_dirty(true);
        assert!(guard.before_unload());

        // declining blocks and leaves the dirty flag untouched
        confirmer.push_answer(false);
        assert_eq!(guard.before_navigate().await, NavigationVerdict::Stay);
        assert!(guard.is_dirty());
        assert_eq!(confirmer.request_count(), 1);

        // accepting clears dirty state and allows navigation
        confirmer.push_answer(true);
        assert_eq!(guard.before_navigate().await, NavigationVerdict::Proceed);
        assert!(!guard.is_dirty());
        assert_eq!(confirmer.request_count(), 2);
        assert!(!guard.before_unload());
    }

    #[tokio::test(start_paused = true)]
    async fn save_and_leave_saves_then_proceeds() {
        let confirmer = ScriptedConfirmer::new();
        let save = ScriptedSave::new();
        let (guard, notifier) =
            guard_with_save(confirmer.clone(), Arc::clone(&save), GuardOptions::default());
        guard.set_dirty(true);

        confirmer.push_answer(true);
        assert_eq!(guard.before_navigate().await, NavigationVerdict::Proceed);

        assert_eq!(save.calls(), 1);
        assert!(!guard.is_dirty());
        assert!(guard.last_saved_at().is_some());
        assert_eq!(notifier.count_of(NoticeKind::Success), 1);
        let request = &confirmer.requests()[0];
        assert_eq!(request.confirm_label, "Save and leave");
        assert_eq!(request.cancel_label, "Don't save");
    }

    #[tokio::test(start_paused = true)]
    async fn declining_save_offers_discard() {
        let confirmer = ScriptedConfirmer::new();
        let save = ScriptedSave::new();
        let (guard, _notifier) =
            guard_with_save(confirmer.clone(), Arc::clone(&save), GuardOptions::default());
        guard.set_dirty(true);

        // don't save, then discard
        confirmer.push_answers([false, true]);
        assert_eq!(guard.before_navigate().await, NavigationVerdict::Proceed);
        assert_eq!(save.calls(), 0);
        assert!(!guard.is_dirty());
        assert_eq!(confirmer.request_count(), 2);

        // don't save, then keep editing
        guard.set_dirty(true);
        confirmer.push_answers([false, false]);
        assert_eq!(guard.before_navigate().await, NavigationVerdict::Stay);
        assert!(guard.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_defaults_to_staying() {
        let confirmer = ScriptedConfirmer::new();
        let save = ScriptedSave::new();
        save.plan_failure(HostError::Network("offline".to_string()));
        let (guard, _notifier) =
            guard_with_save(confirmer.clone(), Arc::clone(&save), GuardOptions::default());
        guard.set_dirty(true);

        // accept the save; the follow-up question falls through to the
        // declining default, which must keep the user on the page
        confirmer.push_answer(true);
        assert_eq!(guard.before_navigate().await, NavigationVerdict::Stay);
        assert_eq!(save.calls(), 1);
        assert!(guard.is_dirty());

        let requests = confirmer.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].kind, ConfirmKind::Danger);
        assert_eq!(requests[1].confirm_label, "Leave anyway");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_can_be_overridden_explicitly() {
        let confirmer = ScriptedConfirmer::new();
        let save = ScriptedSave::new();
        save.plan_failure(HostError::Network("offline".to_string()));
        let (guard, _notifier) =
            guard_with_save(confirmer.clone(), Arc::clone(&save), GuardOptions::default());
        guard.set_dirty(true);

        confirmer.push_answers([true, true]);
        assert_eq!(guard.before_navigate().await, NavigationVerdict::Proceed);
        assert!(!guard.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn auto_save_ticks_while_dirty_then_disarms() {
        let save = ScriptedSave::new();
        let (guard, notifier) = guard_with_save(
            ScriptedConfirmer::new(),
            Arc::clone(&save),
            GuardOptions::default().with_auto_save(Duration::from_secs(30)),
        );

        guard.set_dirty(true);
        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(save.calls(), 1);
        assert!(!guard.is_dirty());
        assert_eq!(notifier.count_of(NoticeKind::Info), 1);

        // clean again: the interval is disarmed, no further ticks
        tokio::time::advance(Duration::from_secs(90)).await;
        tokio::task::yield_now().await;
        assert_eq!(save.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_save_interval_is_anchored_at_the_dirty_transition() {
        let save = ScriptedSave::new();
        let (guard, _notifier) = guard_with_save(
            ScriptedConfirmer::new(),
            Arc::clone(&save),
            GuardOptions::default().with_auto_save(Duration::from_secs(30)),
        );

        // the loop task gets no chance to run between arming and the jump
        // past its first deadline; the overdue tick must still land
        guard.set_dirty(true);
        tokio::time::advance(Duration::from_secs(45)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(save.calls(), 1);
        assert!(!guard.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn auto_save_failures_keep_the_loop_alive() {
        let save = ScriptedSave::new();
        save.plan_failure(HostError::Network("offline".to_string()));
        save.plan_failure(HostError::Network("still offline".to_string()));
        let (guard, notifier) = guard_with_save(
            ScriptedConfirmer::new(),
            Arc::clone(&save),
            GuardOptions::default().with_auto_save(Duration::from_secs(30)),
        );

        guard.set_dirty(true);
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(30)).await;
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
        }

        // two failures then a success that clears the dirty flag
        assert_eq!(save.calls(), 3);
        assert_eq!(notifier.count_of(NoticeKind::Warning), 2);
        assert_eq!(notifier.count_of(NoticeKind::Info), 1);
        assert!(!guard.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn auto_save_skips_while_a_save_is_in_flight() {
        let save = ScriptedSave::new();
        let (guard, _notifier) = guard_with_save(
            ScriptedConfirmer::new(),
            Arc::clone(&save),
            GuardOptions::default().with_auto_save(Duration::from_secs(30)),
        );

        guard.set_dirty(true);
        guard.set_saving(true);
        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert_eq!(save.calls(), 0);

        guard.set_saving(false);
        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(save.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_restarts_the_interval() {
        let save = ScriptedSave::new();
        let (guard, _notifier) = guard_with_save(
            ScriptedConfirmer::new(),
            Arc::clone(&save),
            GuardOptions::default().with_auto_save(Duration::from_secs(30)),
        );

        guard.set_dirty(true);
        tokio::time::advance(Duration::from_secs(20)).await;
        guard.set_dirty(false);
        guard.set_dirty(true);

        // the fresh interval starts counting from the re-arm
        tokio::time::advance(Duration::from_secs(29)).await;
        tokio::task::yield_now().await;
        assert_eq!(save.calls(), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(save.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn draft_auto_save_succeeds_quietly_but_still_warns_on_failure() {
        let save = ScriptedSave::new();
        save.plan_failure(HostError::Network("offline".to_string()));
        let (guard, notifier) = guard_with_save(
            ScriptedConfirmer::new(),
            Arc::clone(&save),
            GuardOptions::default()
                .with_auto_save(Duration::from_secs(30))
                .with_provenance(Provenance::Draft),
        );

        guard.set_dirty(true);
        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(notifier.count_of(NoticeKind::Warning), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(save.calls(), 2);
        assert!(!guard.is_dirty());
        // success notice suppressed for never-persisted drafts
        assert_eq!(notifier.count_of(NoticeKind::Info), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_idempotent_and_disarms_everything() {
        let save = ScriptedSave::new();
        let confirmer = ScriptedConfirmer::new();
        let (guard, _notifier) = guard_with_save(
            confirmer.clone(),
            Arc::clone(&save),
            GuardOptions::default().with_auto_save(Duration::from_secs(30)),
        );
        guard.set_dirty(true);

        guard.close();
        guard.close();

        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert_eq!(save.calls(), 0);

        assert!(!guard.before_unload());
        assert_eq!(guard.before_navigate().await, NavigationVerdict::Proceed);
        assert_eq!(confirmer.request_count(), 0);

        // the dirty flag no longer re-arms anything
        guard.set_dirty(true);
        tokio::time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(save.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_save_without_a_save_path_never_arms() {
        let confirmer = ScriptedConfirmer::new();
        let (guard, notifier) = guard_without_save(confirmer);

        guard.set_dirty(true);
        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert_eq!(notifier.count(), 0);
        assert!(guard.is_dirty());
    }
}
