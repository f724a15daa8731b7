//! Debounced draft saver
//!
//! One [`DraftSaver`] tracks one editable entity. Edits arrive through
//! [`debounced_save`](DraftSaver::debounced_save); after the quiet window
//! elapses the latest pending edit is persisted through the retry runner,
//! and the four-state lifecycle is published on a watch channel.
//!
//! Persistence attempts are strictly serialized: a second trigger while a
//! save is in flight only replaces the pending edit, and the completing
//! save re-arms the cycle if content has diverged in the meantime.

use crate::status::SaveStatus;
use chrono::{DateTime, Utc};
use easel_bridge::{
    ContentStore, EntityRef, HostError, Notice, NoticeAction, Notifier, Provenance, SavedRecord,
};
use easel_errors::{ErrorContext, ErrorRegistry};
use easel_loading::{LoadingRegistry, StartOptions};
use easel_retry::{RetryOptions, RetryPolicy, RetryRunner};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default quiet window before a pending edit is persisted.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Loading-registry scope that in-flight persistence attempts are tagged
/// with.
pub const SAVE_SCOPE: &str = "save";

/// Shared services a saver reports into.
#[derive(Clone)]
pub struct SaveContext {
    /// Persistence seam
    pub store: Arc<dyn ContentStore>,
    /// Notification seam
    pub notifier: Arc<dyn Notifier>,
    /// Failure ledger
    pub errors: ErrorRegistry,
    /// In-flight operation ledger
    pub loading: LoadingRegistry,
}

impl SaveContext {
    /// Context over the two host seams, with fresh registries.
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            errors: ErrorRegistry::new(),
            loading: LoadingRegistry::new(),
        }
    }

    /// With a shared error registry.
    #[inline]
    #[must_use]
    pub fn with_errors(mut self, errors: ErrorRegistry) -> Self {
        self.errors = errors;
        self
    }

    /// With a shared loading registry.
    #[inline]
    #[must_use]
    pub fn with_loading(mut self, loading: LoadingRegistry) -> Self {
        self.loading = loading;
        self
    }
}

impl fmt::Debug for SaveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveContext")
            .field("errors", &self.errors)
            .field("loading", &self.loading)
            .finish_non_exhaustive()
    }
}

/// Per-saver configuration.
#[derive(Debug, Clone)]
pub struct SaverOptions {
    /// Quiet window before a pending edit is persisted
    pub debounce: Duration,
    /// Whether the entity existed before this editing session
    pub provenance: Provenance,
    /// Backoff policy applied to each persistence attempt
    pub retry: RetryPolicy,
}

impl Default for SaverOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            provenance: Provenance::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SaverOptions {
    /// Options with all defaults.
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

    /// With an entity provenance.
    #[inline]
    #[must_use]
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// With a retry policy for persistence attempts.
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// The most recent edit not yet confirmed persisted.
///
/// Replaced whole on every new edit, never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    /// Draft content as of the edit
    pub content: String,
    /// When the edit arrived
    pub captured_at: DateTime<Utc>,
}

impl PendingEdit {
    fn capture(content: String) -> Self {
        Self {
            content,
            captured_at: Utc::now(),
        }
    }
}

/// Who initiated a save, which decides what gets announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveOrigin {
    Debounced,
    Forced,
    Quiet,
}

impl SaveOrigin {
    fn announces(self) -> bool {
        !matches!(self, Self::Quiet)
    }
}

struct MachineState {
    baseline: String,
    pending: Option<PendingEdit>,
    in_flight: Option<String>,
    last_record: Option<SavedRecord>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl MachineState {
    /// Aborts any armed timer and invalidates fires already in progress.
    fn cancel_timer(&mut self) {
        self.generation += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct SaverInner {
    entity: EntityRef,
    options: SaverOptions,
    context: SaveContext,
    runner: RetryRunner,
    status_tx: watch::Sender<SaveStatus>,
    machine: Mutex<MachineState>,
    save_serial: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

/// Debounced save machine for one draft.
///
/// Cheap to clone; all clones drive the same machine. Construction seeds
/// the baseline and does not count as a save; [`close`](DraftSaver::close)
/// cancels timers and does not persist.
#[derive(Clone)]
pub struct DraftSaver {
    inner: Arc<SaverInner>,
}

impl DraftSaver {
    /// Saver over `entity`, seeded with the loaded content.
    #[must_use]
    pub fn new(
        entity: EntityRef,
        initial_content: impl Into<String>,
        context: SaveContext,
        options: SaverOptions,
    ) -> Self {
        let (status_tx, _) = watch::channel(SaveStatus::Saved);
        Self {
            inner: Arc::new(SaverInner {
                entity,
                runner: RetryRunner::new(options.retry),
                options,
                context,
                status_tx,
                machine: Mutex::new(MachineState {
                    baseline: initial_content.into(),
                    pending: None,
                    in_flight: None,
                    last_record: None,
                    timer: None,
                    generation: 0,
                }),
                save_serial: tokio::sync::Mutex::new(()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Entity this saver persists.
    #[inline]
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.inner.entity
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn status(&self) -> SaveStatus {
        *self.inner.status_tx.borrow()
    }

    /// Subscribe to lifecycle state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Whether the machine currently holds unsaved work.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.status().is_dirty()
    }

    /// Whether a persistence attempt is in flight.
    #[inline]
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.status() == SaveStatus::Saving
    }

    /// Receipt of the most recent successful save, if any.
    #[must_use]
    pub fn last_saved(&self) -> Option<SavedRecord> {
        self.inner.machine.lock().last_record.clone()
    }

    /// Content most recently confirmed persisted.
    #[must_use]
    pub fn baseline(&self) -> String {
        self.inner.machine.lock().baseline.clone()
    }

    /// Latest known content: the pending edit if one exists, else whatever
    /// is in flight, else the baseline.
    #[must_use]
    pub fn latest_content(&self) -> String {
        let machine = self.inner.machine.lock();
        if let Some(edit) = &machine.pending {
            return edit.content.clone();
        }
        if let Some(in_flight) = &machine.in_flight {
            return in_flight.clone();
        }
        machine.baseline.clone()
    }

    /// Whether `content` differs from the persisted baseline.
    ///
    /// Content identical to an in-flight attempt reports clean: that exact
    /// text is already on its way to the store.
    #[must_use]
    pub fn has_unsaved_changes(&self, content: &str) -> bool {
        let machine = self.inner.machine.lock();
        if machine.in_flight.as_deref() == Some(content) {
            return false;
        }
        content != machine.baseline
    }

    /// Re-seed the baseline from freshly loaded content.
    ///
    /// Cancels any pending cycle, drops the pending edit, and does not
    /// count as a save. Meant for load time, before edits stream in; an
    /// attempt already in flight still completes on its own terms.
    pub fn initialize(&self, content: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        {
            let mut machine = self.inner.machine.lock();
            machine.cancel_timer();
            machine.pending = None;
            machine.baseline = content.into();
        }
        self.set_status(SaveStatus::Saved);
    }

    /// Record `content` and (re)arm the trailing-edge debounce timer.
    ///
    /// Only the last call within one quiet window reaches the store. While
    /// a save is in flight the edit is recorded but no timer is armed; the
    /// completing save re-arms the cycle if content diverged. An edit that
    /// returns content to the baseline cancels the cycle outright.
    pub fn debounced_save(&self, content: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        let content = content.into();
        let mut machine = self.inner.machine.lock();
        if machine.in_flight.is_some() {
            machine.pending = Some(PendingEdit::capture(content));
            return;
        }
        if content == machine.baseline {
            machine.cancel_timer();
            machine.pending = None;
            drop(machine);
            self.set_status(SaveStatus::Saved);
            return;
        }
        machine.pending = Some(PendingEdit::capture(content));
        self.arm_timer(&mut machine);
        drop(machine);
        self.set_status(SaveStatus::Modified);
    }

    /// Cancel any pending timer and persist `content` immediately.
    ///
    /// Bypasses the quiet window but still serializes behind an in-flight
    /// attempt. A returned error has already been recorded and announced.
    pub async fn force_save(&self, content: impl Into<String>) -> Result<SavedRecord, HostError> {
        self.save_with(content.into(), SaveOrigin::Forced).await
    }

    /// Persist `content` immediately without any saver-issued notices.
    ///
    /// Status transitions and error-ledger records still happen; only the
    /// user-facing announcements are suppressed. Callers that narrate the
    /// save themselves (navigation and auto-save flows) use this.
    pub async fn save_quiet(&self, content: impl Into<String>) -> Result<SavedRecord, HostError> {
        self.save_with(content.into(), SaveOrigin::Quiet).await
    }

    /// Replay of [`force_save`](Self::force_save) with the result
    /// discarded, boxed because the retry action spawns it from inside
    /// the very save cycle it replays.
    fn force_save_boxed(&self, content: String) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let saver = self.clone();
        Box::pin(async move {
            let _ = saver.force_save(content).await;
        })
    }

    /// Tear the saver down: cancel timers and refuse further saves.
    ///
    /// Does not persist. Idempotent; an attempt already in flight is left
    /// to settle on its own.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.machine.lock().cancel_timer();
        tracing::debug!(entity = %self.inner.entity, "draft saver closed");
    }

    /// Whether [`close`](Self::close) has run.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn arm_timer(&self, machine: &mut MachineState) {
        machine.cancel_timer();
        let generation = machine.generation;
        let saver = self.clone();
        // deadline anchored at the arming edit, not at the task's first poll
        let deadline = tokio::time::Instant::now() + self.inner.options.debounce;
        machine.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            saver.on_timer_fire(generation).await;
        }));
    }

    async fn on_timer_fire(self, generation: u64) {
        if self.is_closed() {
            return;
        }
        let serial = self.inner.save_serial.lock().await;
        let content;
        {
            let mut machine = self.inner.machine.lock();
            if machine.generation != generation {
                return;
            }
            machine.timer = None;
            match machine.pending.as_ref() {
                None => return,
                // content went quiet on the baseline, nothing to persist
                Some(edit) if edit.content == machine.baseline => {
                    machine.pending = None;
                    content = None;
                }
                Some(edit) => content = Some(edit.content.clone()),
            }
        }
        match content {
            Some(content) => {
                let _ = self.run_save(serial, content, SaveOrigin::Debounced).await;
            }
            None => self.set_status(SaveStatus::Saved),
        }
    }

    async fn save_with(
        &self,
        content: String,
        origin: SaveOrigin,
    ) -> Result<SavedRecord, HostError> {
        if self.is_closed() {
            return Err(HostError::Cancelled);
        }
        {
            let mut machine = self.inner.machine.lock();
            machine.cancel_timer();
            machine.pending = Some(PendingEdit::capture(content));
        }
        let serial = self.inner.save_serial.lock().await;
        if self.is_closed() {
            return Err(HostError::Cancelled);
        }
        // the lock wait is a suspension point: re-read what to persist
        let content = {
            let machine = self.inner.machine.lock();
            match machine.pending.as_ref() {
                Some(edit) => edit.content.clone(),
                None => machine.baseline.clone(),
            }
        };
        self.run_save(serial, content, origin).await
    }

    async fn run_save(
        &self,
        _serial: tokio::sync::MutexGuard<'_, ()>,
        content: String,
        origin: SaveOrigin,
    ) -> Result<SavedRecord, HostError> {
        {
            let mut machine = self.inner.machine.lock();
            machine.cancel_timer();
            machine.in_flight = Some(content.clone());
            if machine.pending.as_ref().is_some_and(|edit| edit.content == content) {
                machine.pending = None;
            }
        }
        self.set_status(SaveStatus::Saving);

        let loading_id = self.inner.context.loading.start(
            format!("Saving {}", self.inner.entity),
            StartOptions::default().with_scope(SAVE_SCOPE),
        );
        let store = Arc::clone(&self.inner.context.store);
        let entity = self.inner.entity.clone();
        let body = content.clone();
        let result = self
            .inner
            .runner
            .execute(
                move || {
                    let store = Arc::clone(&store);
                    let entity = entity.clone();
                    let body = body.clone();
                    async move { store.save(&entity, &body).await }
                },
                RetryOptions::labeled(format!("save {}", self.inner.entity.kind.as_str())),
            )
            .await;
        self.inner.context.loading.stop(loading_id);

        match result {
            Ok(record) => {
                let next_status;
                {
                    let mut machine = self.inner.machine.lock();
                    machine.baseline = content;
                    machine.last_record = Some(record.clone());
                    machine.in_flight = None;
                    match machine.pending.as_ref() {
                        // newer edits landed mid-save, start the next cycle
                        Some(edit) if edit.content != machine.baseline => {
                            self.arm_timer(&mut machine);
                            next_status = SaveStatus::Modified;
                        }
                        _ => {
                            machine.pending = None;
                            next_status = SaveStatus::Saved;
                        }
                    }
                }
                self.set_status(next_status);
                tracing::debug!(
                    entity = %self.inner.entity,
                    revision = record.revision,
                    "draft saved"
                );
                if origin.announces() && self.inner.options.provenance.announces_saves() {
                    self.inner.context.notifier.notify(
                        Notice::success("Saved", format!("{} saved", self.inner.entity))
                            .with_duration(Duration::from_secs(2)),
                    );
                }
                Ok(record)
            }
            Err(error) => {
                self.inner.context.errors.handle(
                    &error,
                    ErrorContext::operation("save")
                        .with_component("draft-saver")
                        .with_entity(self.inner.entity.to_string()),
                );
                {
                    let mut machine = self.inner.machine.lock();
                    machine.in_flight = None;
                    if machine.pending.is_none() {
                        machine.pending = Some(PendingEdit::capture(content.clone()));
                    }
                }
                self.set_status(SaveStatus::Error);
                if origin.announces() {
                    let saver = self.clone();
                    let retry_content = content;
                    let runtime = tokio::runtime::Handle::current();
                    self.inner.context.notifier.notify(
                        Notice::error(
                            "Save failed",
                            format!("Could not save {}: {error}", self.inner.entity),
                        )
                        .with_action(NoticeAction::new("Retry", move || {
                            runtime.spawn(saver.force_save_boxed(retry_content.clone()));
                        })),
                    );
                }
                Err(error)
            }
        }
    }

    fn set_status(&self, next: SaveStatus) {
        self.inner.status_tx.send_if_modified(|status| {
            if *status == next {
                return false;
            }
            debug_assert!(
                status.can_transition_to(next),
                "illegal save transition {status} -> {next}"
            );
            tracing::trace!(
                entity = %self.inner.entity,
                from = status.as_str(),
                to = next.as_str(),
                "save status changed"
            );
            *status = next;
            true
        });
    }
}

impl fmt::Debug for DraftSaver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftSaver")
            .field("entity", &self.inner.entity)
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
