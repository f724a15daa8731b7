//! Retry runner
//!
//! Wraps an arbitrary asynchronous operation with the bounded backoff loop:
//! attempts run strictly one after another, every scheduled retry is
//! announced through hooks and (optionally) user notices, and the final
//! error always reaches the caller.

use crate::policy::RetryPolicy;
use easel_bridge::{HostError, Notice, Notifier};
use easel_errors::classify;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Errors specific to runner misuse.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetryError {
    /// The wrapped operation failed terminally
    #[error(transparent)]
    Host(#[from] HostError),

    /// The runner was driven incorrectly
    #[error("invalid usage: {0}")]
    InvalidUsage(String),
}

/// Observable runner state for UI binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// True from the first scheduled retry until the call settles
    pub is_retrying: bool,
    /// Attempt currently running (0 when idle)
    pub current_attempt: u32,
    /// Most recent failure observed by the runner
    pub last_error: Option<HostError>,
    /// Backoff currently being waited out, if any
    pub next_retry_in: Option<Duration>,
}

type RetryPredicate = Arc<dyn Fn(&HostError, u32) -> bool + Send + Sync>;
type AttemptHook = Arc<dyn Fn(u32, &HostError) + Send + Sync>;
type TerminalHook = Arc<dyn Fn(&HostError) + Send + Sync>;

/// Per-call knobs. Every field is optional.
#[derive(Clone, Default)]
pub struct RetryOptions {
    /// Overrides the classifier-driven retry decision
    pub should_retry: Option<RetryPredicate>,
    /// Observes each scheduled retry
    pub on_retry: Option<AttemptHook>,
    /// Observes the terminal failure
    pub on_exhausted: Option<TerminalHook>,
    /// Human-readable operation name used in notices and logs
    pub label: Option<String>,
}

impl RetryOptions {
    /// Options with only a label set.
    #[inline]
    #[must_use]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// With a custom retryability predicate.
    #[must_use]
    pub fn with_should_retry(
        mut self,
        predicate: impl Fn(&HostError, u32) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    /// With a scheduled-retry observer.
    #[must_use]
    pub fn with_on_retry(mut self, hook: impl Fn(u32, &HostError) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(hook));
        self
    }

    /// With a terminal-failure observer.
    #[must_use]
    pub fn with_on_exhausted(mut self, hook: impl Fn(&HostError) + Send + Sync + 'static) -> Self {
        self.on_exhausted = Some(Arc::new(hook));
        self
    }

    /// With a human-readable operation name.
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("label", &self.label)
            .field("has_should_retry", &self.should_retry.is_some())
            .field("has_on_retry", &self.on_retry.is_some())
            .field("has_on_exhausted", &self.on_exhausted.is_some())
            .finish()
    }
}

/// Runs operations under a [`RetryPolicy`].
///
/// A runner without a notifier stays silent; callers that surface their own
/// failure UI (the save machine does) pass none.
pub struct RetryRunner {
    policy: RetryPolicy,
    notifier: Option<Arc<dyn Notifier>>,
    state_tx: watch::Sender<RetryState>,
    replay: Mutex<Option<RetryOptions>>,
}

impl RetryRunner {
    /// Runner with the given policy and no notifier.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        let (state_tx, _) = watch::channel(RetryState::default());
        Self {
            policy,
            notifier: None,
            state_tx,
            replay: Mutex::new(None),
        }
    }

    /// With a notifier for attempt-boundary notices.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// The policy this runner applies.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Current observable state.
    #[must_use]
    pub fn state(&self) -> RetryState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to observable state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RetryState> {
        self.state_tx.subscribe()
    }

    /// Run `operation` under the retry policy.
    ///
    /// Attempts are numbered from 1 and strictly serialized. The terminal
    /// error is always returned; with `max_attempts == 1` the call behaves
    /// as a single plain attempt and emits no notices.
    pub async fn execute<T, F, Fut>(
        &self,
        mut operation: F,
        options: RetryOptions,
    ) -> Result<T, HostError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HostError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let instrumented = max_attempts > 1;
        let label = options.label.clone().unwrap_or_else(|| "operation".to_string());
        self.state_tx.send_replace(RetryState::default());

        let mut attempt: u32 = 1;
        loop {
            self.state_tx.send_modify(|state| {
                state.current_attempt = attempt;
                state.next_retry_in = None;
            });

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, max_attempts, "{label} recovered");
                        self.notify(Notice::success(
                            format!("{label} recovered"),
                            format!("Succeeded on attempt {attempt} of {max_attempts}"),
                        ));
                    }
                    *self.replay.lock() = None;
                    self.state_tx.send_replace(RetryState::default());
                    return Ok(value);
                }
                Err(error) => {
                    let retryable = match &options.should_retry {
                        Some(predicate) => predicate(&error, attempt),
                        None => classify(&error).can_retry,
                    };

                    if attempt < max_attempts && retryable {
                        let delay = self.policy.delay_for_attempt(attempt);
                        if let Some(on_retry) = &options.on_retry {
                            on_retry(attempt, &error);
                        }
                        tracing::warn!(
                            attempt,
                            max_attempts,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "{label} failed, retrying: {error}"
                        );
                        self.notify(Notice::warning(
                            format!("{label} failed"),
                            format!(
                                "Retrying in {}s (attempt {attempt} of {max_attempts})",
                                delay.as_secs_f64().round()
                            ),
                        ));
                        self.state_tx.send_modify(|state| {
                            state.is_retrying = true;
                            state.last_error = Some(error.clone());
                            state.next_retry_in = Some(delay);
                        });
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if let Some(on_exhausted) = &options.on_exhausted {
                        on_exhausted(&error);
                    }
                    tracing::error!(attempt, max_attempts, "{label} failed terminally: {error}");
                    if instrumented {
                        self.notify(Notice::error(
                            format!("{label} failed"),
                            format!("Gave up after {attempt} of {max_attempts} attempts: {error}"),
                        ));
                    }
                    *self.replay.lock() = retryable.then(|| options.clone());
                    self.state_tx.send_modify(|state| {
                        state.is_retrying = false;
                        state.current_attempt = attempt;
                        state.last_error = Some(error.clone());
                        state.next_retry_in = None;
                    });
                    return Err(error);
                }
            }
        }
    }

    /// Replay the most recent failed call with a fresh operation.
    ///
    /// Fails with [`RetryError::InvalidUsage`] when no operation is supplied
    /// or when the runner has no retryable failure on record.
    pub async fn retry_last<T, F, Fut>(&self, operation: Option<F>) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HostError>>,
    {
        let Some(operation) = operation else {
            return Err(RetryError::InvalidUsage(
                "retry_last needs the operation to replay".to_string(),
            ));
        };
        let options = self.replay.lock().clone().ok_or_else(|| {
            RetryError::InvalidUsage("no retryable failure recorded".to_string())
        })?;
        self.execute(operation, options).await.map_err(RetryError::from)
    }

    /// Return the runner to its initial state, forgetting any recorded
    /// failure.
    pub fn reset(&self) {
        *self.replay.lock() = None;
        self.state_tx.send_replace(RetryState::default());
    }

    fn notify(&self, notice: Notice) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(notice);
        }
    }
}

impl fmt::Debug for RetryRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRunner")
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
