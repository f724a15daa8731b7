//! Loading registry
//!
//! Purely in-memory bookkeeping; no I/O. Entries live from `start` to
//! `stop`, and the aggregate "is anything loading" answer is true iff at
//! least one entry exists in the queried (scoped) view.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use ulid::Ulid;

/// Unique loading entry identifier (ULID for sortability).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoadingId(pub Ulid);

impl LoadingId {
    /// Generate a new id.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for LoadingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LoadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type CancelFn = Arc<dyn Fn() + Send + Sync>;

/// Options accepted by [`LoadingRegistry::start`].
#[derive(Clone, Default)]
pub struct StartOptions {
    /// Namespace tag; scoped views only see matching entries
    pub scope: Option<String>,
    /// Initial progress in `[0, 1]`
    pub progress: Option<f32>,
    /// Whether the shell may offer a cancel affordance
    pub cancellable: bool,
    /// Invoked at most once when cancellation is requested
    pub on_cancel: Option<CancelFn>,
}

impl StartOptions {
    /// Tag the entry with a scope.
    #[inline]
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// With an initial progress value.
    #[inline]
    #[must_use]
    pub fn with_progress(mut self, progress: f32) -> Self {
        self.progress = Some(progress.clamp(0.0, 1.0));
        self
    }

    /// Mark the entry cancellable and register the callback.
    #[must_use]
    pub fn cancellable(mut self, on_cancel: impl Fn() + Send + Sync + 'static) -> Self {
        self.cancellable = true;
        self.on_cancel = Some(Arc::new(on_cancel));
        self
    }
}

impl fmt::Debug for StartOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartOptions")
            .field("scope", &self.scope)
            .field("progress", &self.progress)
            .field("cancellable", &self.cancellable)
            .finish_non_exhaustive()
    }
}

/// Partial update applied by [`LoadingRegistry::update`].
#[derive(Debug, Clone, Default)]
pub struct LoadingUpdate {
    /// Replacement message
    pub message: Option<String>,
    /// Replacement progress in `[0, 1]`
    pub progress: Option<f32>,
}

impl LoadingUpdate {
    /// Update only the message.
    #[inline]
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            progress: None,
        }
    }

    /// Update only the progress.
    #[inline]
    #[must_use]
    pub fn progress(progress: f32) -> Self {
        Self {
            message: None,
            progress: Some(progress),
        }
    }

    /// With a replacement message.
    #[inline]
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// With a replacement progress.
    #[inline]
    #[must_use]
    pub fn with_progress(mut self, progress: f32) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Snapshot of one in-flight operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadingState {
    /// Entry id
    pub id: LoadingId,
    /// Namespace tag, if any
    pub scope: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Progress in `[0, 1]`, if reported
    pub progress: Option<f32>,
    /// Whether the shell may offer a cancel affordance
    pub cancellable: bool,
}

struct Entry {
    scope: Option<String>,
    message: String,
    progress: Option<f32>,
    cancellable: bool,
    on_cancel: Option<CancelFn>,
}

impl Entry {
    fn snapshot(&self, id: LoadingId) -> LoadingState {
        LoadingState {
            id,
            scope: self.scope.clone(),
            message: self.message.clone(),
            progress: self.progress,
            cancellable: self.cancellable,
        }
    }
}

struct RegistryInner {
    entries: DashMap<LoadingId, Entry>,
    active_tx: watch::Sender<usize>,
}

/// Process-wide ledger of in-flight operations.
///
/// Cheap to clone; all clones share the same entries.
#[derive(Clone)]
pub struct LoadingRegistry {
    inner: Arc<RegistryInner>,
}

impl LoadingRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (active_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(RegistryInner {
                entries: DashMap::new(),
                active_tx,
            }),
        }
    }

    /// Register an in-flight operation and return its id.
    pub fn start(&self, message: impl Into<String>, options: StartOptions) -> LoadingId {
        let id = LoadingId::new();
        let message = message.into();
        tracing::debug!(%id, scope = options.scope.as_deref(), "loading started: {message}");
        self.inner.entries.insert(
            id,
            Entry {
                scope: options.scope,
                message,
                progress: options.progress,
                cancellable: options.cancellable,
                on_cancel: options.on_cancel,
            },
        );
        self.publish_count();
        id
    }

    /// Remove an entry. Unknown ids are a no-op.
    pub fn stop(&self, id: LoadingId) {
        if self.inner.entries.remove(&id).is_some() {
            tracing::debug!(%id, "loading stopped");
            self.publish_count();
        }
    }

    /// Apply a partial update to an entry. Unknown ids are a no-op.
    pub fn update(&self, id: LoadingId, update: LoadingUpdate) {
        if let Some(mut entry) = self.inner.entries.get_mut(&id) {
            if let Some(message) = update.message {
                entry.message = message;
            }
            if let Some(progress) = update.progress {
                entry.progress = Some(progress.clamp(0.0, 1.0));
            }
        }
    }

    /// Replace an entry's progress, clamped to `[0, 1]`.
    #[inline]
    pub fn set_progress(&self, id: LoadingId, progress: f32) {
        self.update(id, LoadingUpdate::progress(progress));
    }

    /// Replace an entry's message.
    #[inline]
    pub fn set_message(&self, id: LoadingId, message: impl Into<String>) {
        self.update(id, LoadingUpdate::message(message));
    }

    /// Fire an entry's cancellation callback, at most once.
    ///
    /// Returns whether a callback ran. The entry stays registered until the
    /// owning operation observes the request and calls [`stop`](Self::stop).
    pub fn request_cancel(&self, id: LoadingId) -> bool {
        let callback = self
            .inner
            .entries
            .get_mut(&id)
            .and_then(|mut entry| entry.on_cancel.take());
        match callback {
            Some(callback) => {
                tracing::debug!(%id, "loading cancellation requested");
                callback();
                true
            }
            None => false,
        }
    }

    /// Whether any operation is in flight.
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.inner.entries.is_empty()
    }

    /// Whether the given entry is still in flight.
    #[inline]
    #[must_use]
    pub fn is_loading_id(&self, id: LoadingId) -> bool {
        self.inner.entries.contains_key(&id)
    }

    /// Snapshot of one entry.
    #[must_use]
    pub fn state(&self, id: LoadingId) -> Option<LoadingState> {
        self.inner.entries.get(&id).map(|entry| entry.snapshot(id))
    }

    /// Snapshots of all entries, across every scope.
    #[must_use]
    pub fn states(&self) -> Vec<LoadingState> {
        self.inner
            .entries
            .iter()
            .map(|entry| entry.snapshot(*entry.key()))
            .collect()
    }

    /// Number of in-flight operations.
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.entries.len()
    }

    /// Remove every entry.
    pub fn stop_all(&self) {
        self.inner.entries.clear();
        self.publish_count();
    }

    /// Subscribe to the aggregate in-flight count.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.inner.active_tx.subscribe()
    }

    /// Namespaced view over entries tagged with `name`.
    #[must_use]
    pub fn scope(&self, name: impl Into<String>) -> LoadingScope {
        LoadingScope {
            registry: self.clone(),
            name: name.into(),
        }
    }

    /// Run `operation` under a loading entry, stopping it on every exit path.
    pub async fn with_loading<T, Fut>(
        &self,
        message: impl Into<String>,
        options: StartOptions,
        operation: Fut,
    ) -> T
    where
        Fut: Future<Output = T>,
    {
        let id = self.start(message, options);
        let _guard = StopGuard { registry: self, id };
        operation.await
    }

    /// Like [`with_loading`](Self::with_loading), handing the operation a
    /// progress reporter wired to this entry.
    pub async fn with_progress_loading<T, F, Fut>(
        &self,
        message: impl Into<String>,
        options: StartOptions,
        operation: F,
    ) -> T
    where
        F: FnOnce(ProgressHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        let id = self.start(message, options);
        let _guard = StopGuard { registry: self, id };
        let progress = ProgressHandle {
            registry: self.clone(),
            id,
        };
        operation(progress).await
    }

    fn publish_count(&self) {
        self.inner.active_tx.send_replace(self.inner.entries.len());
    }
}

impl Default for LoadingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoadingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingRegistry")
            .field("active", &self.active_count())
            .finish()
    }
}

/// Stops the owned entry when dropped, even on panic or cancellation.
struct StopGuard<'a> {
    registry: &'a LoadingRegistry,
    id: LoadingId,
}

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        self.registry.stop(self.id);
    }
}

/// Progress reporter handed to [`LoadingRegistry::with_progress_loading`]
/// operations.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    registry: LoadingRegistry,
    id: LoadingId,
}

impl ProgressHandle {
    /// Report progress in `[0, 1]`.
    #[inline]
    pub fn set(&self, progress: f32) {
        self.registry.set_progress(self.id, progress);
    }

    /// Replace the entry's message.
    #[inline]
    pub fn set_message(&self, message: impl Into<String>) {
        self.registry.set_message(self.id, message);
    }

    /// Id of the underlying entry.
    #[inline]
    #[must_use]
    pub fn id(&self) -> LoadingId {
        self.id
    }
}

/// Namespaced view of a [`LoadingRegistry`].
///
/// `start` tags entries with the scope name; the query operations only see
/// matching entries. The global registry still aggregates across scopes.
#[derive(Debug, Clone)]
pub struct LoadingScope {
    registry: LoadingRegistry,
    name: String,
}

impl LoadingScope {
    /// Scope name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an in-flight operation tagged with this scope.
    pub fn start(&self, message: impl Into<String>, options: StartOptions) -> LoadingId {
        self.registry
            .start(message, options.with_scope(self.name.clone()))
    }

    /// Remove an entry. Unknown ids are a no-op.
    #[inline]
    pub fn stop(&self, id: LoadingId) {
        self.registry.stop(id);
    }

    /// Whether any operation in this scope is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.registry
            .inner
            .entries
            .iter()
            .any(|entry| entry.scope.as_deref() == Some(self.name.as_str()))
    }

    /// Snapshots of this scope's entries.
    #[must_use]
    pub fn states(&self) -> Vec<LoadingState> {
        self.registry
            .inner
            .entries
            .iter()
            .filter(|entry| entry.scope.as_deref() == Some(self.name.as_str()))
            .map(|entry| entry.snapshot(*entry.key()))
            .collect()
    }

    /// Number of in-flight operations in this scope.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.states().len()
    }

    /// Remove every entry in this scope.
    pub fn stop_all(&self) {
        let ids: Vec<LoadingId> = self
            .registry
            .inner
            .entries
            .iter()
            .filter(|entry| entry.scope.as_deref() == Some(self.name.as_str()))
            .map(|entry| *entry.key())
            .collect();
        for id in ids {
            self.registry.stop(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn start_then_stop_clears_the_aggregate() {
        let registry = LoadingRegistry::new();
        assert!(!registry.is_loading());

        let id = registry.start("Loading project", StartOptions::default());
        assert!(registry.is_loading());
        assert!(registry.is_loading_id(id));

        registry.stop(id);
        assert!(!registry.is_loading());
        assert!(!registry.is_loading_id(id));
    }

    #[test]
    fn two_starts_need_two_stops() {
        let registry = LoadingRegistry::new();
        let a = registry.start("a", StartOptions::default());
        let b = registry.start("b", StartOptions::default());

        registry.stop(a);
        assert!(registry.is_loading());
        registry.stop(b);
        assert!(!registry.is_loading());
    }

    #[test]
    fn stop_is_idempotent() {
        let registry = LoadingRegistry::new();
        let id = registry.start("x", StartOptions::default());
        registry.stop(id);
        registry.stop(id);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn update_replaces_message_and_clamps_progress() {
        let registry = LoadingRegistry::new();
        let id = registry.start("Uploading", StartOptions::default().with_progress(0.2));

        registry.update(
            id,
            LoadingUpdate::default()
                .with_message("Still uploading")
                .with_progress(1.7),
        );

        let state = registry.state(id).expect("entry exists");
        assert_eq!(state.message, "Still uploading");
        assert_eq!(state.progress, Some(1.0));

        registry.set_progress(id, -0.5);
        assert_eq!(registry.state(id).expect("entry exists").progress, Some(0.0));
    }

    #[test]
    fn scope_views_are_isolated() {
        let registry = LoadingRegistry::new();
        let saves = registry.scope("saves");
        let loads = registry.scope("loads");

        let save_id = saves.start("Saving diagram", StartOptions::default());
        assert!(saves.is_loading());
        assert!(!loads.is_loading());
        assert!(registry.is_loading());
        assert_eq!(saves.states().len(), 1);
        assert_eq!(saves.states()[0].scope.as_deref(), Some("saves"));

        saves.stop(save_id);
        assert!(!saves.is_loading());
        assert!(!registry.is_loading());
    }

    #[test]
    fn scoped_stop_all_leaves_other_scopes() {
        let registry = LoadingRegistry::new();
        let saves = registry.scope("saves");
        saves.start("one", StartOptions::default());
        saves.start("two", StartOptions::default());
        let other = registry.start("global", StartOptions::default());

        saves.stop_all();
        assert_eq!(saves.active_count(), 0);
        assert!(registry.is_loading_id(other));

        registry.stop_all();
        assert!(!registry.is_loading());
    }

    #[test]
    fn cancel_fires_at_most_once() {
        let registry = LoadingRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&hits);
        let id = registry.start(
            "Converting",
            StartOptions::default().cancellable(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(registry.request_cancel(id));
        assert!(!registry.request_cancel(id));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // entry survives until the owner stops it
        assert!(registry.is_loading_id(id));
    }

    #[tokio::test]
    async fn with_loading_stops_on_success_and_failure() {
        let registry = LoadingRegistry::new();

        let value = registry
            .with_loading("ok path", StartOptions::default(), async {
                Ok::<_, &str>(42)
            })
            .await;
        assert_eq!(value.ok(), Some(42));
        assert!(!registry.is_loading());

        let failed: Result<(), &str> = registry
            .with_loading("err path", StartOptions::default(), async { Err("down") })
            .await;
        assert!(failed.is_err());
        assert!(!registry.is_loading());
    }

    #[tokio::test]
    async fn with_progress_loading_reports_through_the_handle() {
        let registry = LoadingRegistry::new();
        let observer = registry.clone();

        registry
            .with_progress_loading("steps", StartOptions::default(), |progress| async move {
                progress.set(0.5);
                let state = observer.state(progress.id()).expect("entry exists");
                assert_eq!(state.progress, Some(0.5));
            })
            .await;

        assert!(!registry.is_loading());
    }

    #[tokio::test]
    async fn subscribe_tracks_the_active_count() {
        let registry = LoadingRegistry::new();
        let rx = registry.subscribe();
        assert_eq!(*rx.borrow(), 0);

        let id = registry.start("x", StartOptions::default());
        assert_eq!(*rx.borrow(), 1);

        registry.stop(id);
        assert_eq!(*rx.borrow(), 0);
    }
}
