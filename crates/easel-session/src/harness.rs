//! Scripted editing sessions against an unreliable store.
//!
//! The harness drives a real [`WorkbenchSession`] end to end: it types a
//! burst of edits, lets the quiet window flush them, recovers from
//! injected failures, and leaves through the navigation guard. Failures
//! draw from a seeded RNG, so a failing seed replays exactly.
//!
//! Violations are invariant breaks, not bad luck: an unlucky seed may
//! leave with unsaved work (reported as `left_cleanly: false`) and still
//! pass, but a saved status that disagrees with the store never does.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use easel_bridge::{
    ArtifactKind, ConfirmRequest, Confirmer, ContentStore, EntityRef, HostError, Notice,
    NoticeKind, Notifier, SavedRecord,
};
use easel_errors::ErrorStats;
use easel_retry::RetryPolicy;
use easel_save::SaveStatus;

use crate::draft::{DraftHandle, DraftOptions};
use crate::session::{SessionConfig, WorkbenchSession};

/// Harness configuration.
#[derive(Debug, Clone, Serialize)]
pub struct HarnessConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Edits typed during the burst
    pub edits: u32,
    /// Probability that one persistence attempt fails
    pub failure_rate: f64,
    /// Attempts that fail unconditionally before the store heals
    pub outage_attempts: u32,
    /// Quiet window between the last edit and its save, in milliseconds
    pub debounce_ms: u64,
    /// Pause between consecutive edits, in milliseconds
    pub pause_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            edits: 30,
            failure_rate: 0.2,
            outage_attempts: 0,
            debounce_ms: 200,
            pause_ms: 20,
        }
    }
}

/// Store that fails a configurable share of attempts.
///
/// The first `outage_attempts` calls fail unconditionally, simulating a
/// hard outage at session start; afterwards each attempt fails with
/// `failure_rate` probability, drawn from the seeded RNG.
struct FlakyStore {
    rng: Mutex<StdRng>,
    failure_rate: f64,
    outage_remaining: AtomicU32,
    attempts: AtomicU64,
    failures: AtomicU64,
    revision: AtomicU64,
    committed: Mutex<Vec<String>>,
}

impl FlakyStore {
    fn new(config: &HarnessConfig) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(config.seed)),
            failure_rate: config.failure_rate,
            outage_remaining: AtomicU32::new(config.outage_attempts),
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            revision: AtomicU64::new(0),
            committed: Mutex::new(Vec::new()),
        }
    }

    fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    fn committed(&self) -> Vec<String> {
        self.committed.lock().clone()
    }

    fn last_committed(&self) -> Option<String> {
        self.committed.lock().last().cloned()
    }

    fn next_error(&self) -> HostError {
        match self.rng.lock().random_range(0..3) {
            0 => HostError::Network("connection reset".to_string()),
            1 => HostError::Timeout { elapsed_ms: 2 },
            _ => HostError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            },
        }
    }
}

#[async_trait]
impl ContentStore for FlakyStore {
    async fn save(&self, entity: &EntityRef, content: &str) -> Result<SavedRecord, HostError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        // a little latency so in-flight states are observable
        tokio::time::sleep(Duration::from_millis(2)).await;

        let forced = self
            .outage_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        let unlucky = self.rng.lock().random::<f64>() < self.failure_rate;
        if forced || unlucky {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(self.next_error());
        }

        self.committed.lock().push(content.to_string());
        Ok(SavedRecord {
            id: entity.id,
            revision: self.revision.fetch_add(1, Ordering::SeqCst) + 1,
            saved_at: Utc::now(),
        })
    }
}

/// Notice counts observed during a run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoticeTally {
    /// Neutral information notices
    pub info: u64,
    /// Completed-operation notices
    pub success: u64,
    /// Degraded-but-recovering notices
    pub warning: u64,
    /// Failure notices
    pub error: u64,
}

/// Notifier that tallies notices by kind and mirrors them to the log.
#[derive(Default)]
struct TallyNotifier {
    info: AtomicU64,
    success: AtomicU64,
    warning: AtomicU64,
    error: AtomicU64,
}

impl TallyNotifier {
    fn tally(&self) -> NoticeTally {
        NoticeTally {
            info: self.info.load(Ordering::SeqCst),
            success: self.success.load(Ordering::SeqCst),
            warning: self.warning.load(Ordering::SeqCst),
            error: self.error.load(Ordering::SeqCst),
        }
    }
}

impl Notifier for TallyNotifier {
    fn notify(&self, notice: Notice) {
        let counter = match notice.kind {
            NoticeKind::Info => &self.info,
            NoticeKind::Success => &self.success,
            NoticeKind::Warning => &self.warning,
            NoticeKind::Error => &self.error,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        tracing::info!(kind = ?notice.kind, title = %notice.title, "{}", notice.message);
    }
}

/// Confirmer that always answers the same way.
struct DecisiveConfirmer {
    answer: bool,
    asked: AtomicU64,
}

impl DecisiveConfirmer {
    fn accepting() -> Self {
        Self {
            answer: true,
            asked: AtomicU64::new(0),
        }
    }

    fn asked(&self) -> u64 {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirmer for DecisiveConfirmer {
    async fn confirm(&self, request: ConfirmRequest) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(title = %request.title, answer = self.answer, "confirm prompt");
        self.answer
    }
}

/// Outcome of one scripted session.
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    /// Configuration the run used
    pub config: HarnessConfig,
    /// Edits the script typed
    pub edits_typed: u32,
    /// Persistence attempts the store saw
    pub save_attempts: u64,
    /// Attempts that failed
    pub save_failures: u64,
    /// Contents the store committed
    pub saves_committed: usize,
    /// Explicit recoveries driven after an exhausted cycle
    pub forced_recoveries: u32,
    /// Confirm prompts answered during navigation
    pub prompts_answered: u64,
    /// Draft status when the script left
    pub final_status: SaveStatus,
    /// Whether the script left with everything persisted
    pub left_cleanly: bool,
    /// Notices observed, by kind
    pub notices: NoticeTally,
    /// Shared error history at the end of the run
    pub errors: ErrorStats,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
    /// Invariant breaks; empty means the run passed
    pub violations: Vec<String>,
}

impl HarnessReport {
    /// Whether the run held every invariant.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report.
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Easel Harness Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Edits Typed: {}\n", self.edits_typed));
        report.push_str(&format!("Save Attempts: {}\n", self.save_attempts));
        report.push_str(&format!("Save Failures: {}\n", self.save_failures));
        report.push_str(&format!("Saves Committed: {}\n", self.saves_committed));
        report.push_str(&format!("Forced Recoveries: {}\n", self.forced_recoveries));
        report.push_str(&format!("Prompts Answered: {}\n", self.prompts_answered));
        report.push_str(&format!("Final Status: {}\n", self.final_status));
        report.push_str(&format!("Left Cleanly: {}\n", self.left_cleanly));
        report.push_str(&format!(
            "Notices: {} info / {} success / {} warning / {} error\n",
            self.notices.info, self.notices.success, self.notices.warning, self.notices.error
        ));
        report.push_str(&format!(
            "Errors Recorded: {} (network {}, server {}, client {}, validation {}, unknown {})\n",
            self.errors.total,
            self.errors.network,
            self.errors.server,
            self.errors.client,
            self.errors.validation,
            self.errors.unknown
        ));
        report.push_str(&format!("Elapsed: {}ms\n", self.elapsed_ms));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, violation) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {violation}\n", i + 1));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

/// Run one scripted editing session.
pub async fn run_harness(config: HarnessConfig) -> HarnessReport {
    let started = Instant::now();
    let store = Arc::new(FlakyStore::new(&config));
    let notifier = Arc::new(TallyNotifier::default());
    let confirmer = Arc::new(DecisiveConfirmer::accepting());

    let session = WorkbenchSession::with_config(
        store.clone(),
        notifier.clone(),
        confirmer.clone(),
        SessionConfig::new()
            .with_debounce(Duration::from_millis(config.debounce_ms))
            .without_auto_save()
            .with_retry(
                RetryPolicy::new()
                    .with_base_delay(Duration::from_millis(25))
                    .with_max_delay(Duration::from_millis(100)),
            ),
    );

    let mut violations: Vec<String> = Vec::new();

    let entity = EntityRef::new(ArtifactKind::Note, format!("harness-{}", config.seed));
    let draft = session
        .open_draft(entity, "draft v0", DraftOptions::existing())
        .expect("fresh session accepts a draft");

    for i in 1..=config.edits {
        draft.debounced_save(format!("draft v{i}"));
        tokio::time::sleep(Duration::from_millis(config.pause_ms)).await;
    }

    // the quiet window flushes the burst
    tokio::time::sleep(Duration::from_millis(config.debounce_ms)).await;
    if !wait_for_settled(&draft, Duration::from_secs(5)).await {
        violations.push("draft did not settle after the quiet window".to_string());
    }

    // an exhausted cycle parks in error; recover the way the retry
    // notice action would
    let mut forced_recoveries: u32 = 0;
    while draft.status() == SaveStatus::Error && forced_recoveries < 10 {
        forced_recoveries += 1;
        let content = draft.latest_content();
        if draft.force_save(content).await.is_ok() {
            break;
        }
    }

    // a tail edit right before leaving: the guard must flush it
    draft.debounced_save(format!("draft v{} final", config.edits));
    // let the lifecycle bridge feed the guard before intercepting
    tokio::time::sleep(Duration::from_millis(10)).await;
    let verdict = draft.before_navigate().await;

    let final_status = draft.status();
    let left_cleanly = verdict.allows_navigation() && final_status == SaveStatus::Saved;

    if final_status == SaveStatus::Saved {
        match store.last_committed() {
            Some(committed) if committed == draft.latest_content() => {}
            Some(_) => violations
                .push("status is saved but the last committed content disagrees".to_string()),
            None => violations.push("status is saved but nothing was ever committed".to_string()),
        }
    }
    if draft.last_saved().is_some() && store.committed().is_empty() {
        violations.push("a save was acknowledged but nothing was committed".to_string());
    }
    let committed_count = u64::try_from(store.committed().len()).unwrap_or(u64::MAX);
    if store.attempts() < store.failures()
        || committed_count != store.attempts() - store.failures()
    {
        violations.push("attempt accounting is inconsistent".to_string());
    }
    if session.loading().is_loading() {
        violations.push("loading ledger still active after the draft settled".to_string());
    }

    draft.close();
    session.shutdown();
    let reopened = session.open_draft(
        EntityRef::new(ArtifactKind::Note, "post-shutdown"),
        "",
        DraftOptions::default(),
    );
    if reopened.is_ok() {
        violations.push("session accepted a draft after shutdown".to_string());
    }

    HarnessReport {
        edits_typed: config.edits,
        save_attempts: store.attempts(),
        save_failures: store.failures(),
        saves_committed: store.committed().len(),
        forced_recoveries,
        prompts_answered: confirmer.asked(),
        final_status,
        left_cleanly,
        notices: notifier.tally(),
        errors: session.errors().stats(),
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        violations,
        config,
    }
}

async fn wait_for_settled(draft: &DraftHandle, deadline: Duration) -> bool {
    let started = Instant::now();
    while started.elapsed() < deadline {
        match draft.status() {
            SaveStatus::Saved | SaveStatus::Error => return true,
            SaveStatus::Modified | SaveStatus::Saving => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
    false
}

/// Aggregate outcome across consecutive seeds.
#[derive(Debug, Clone, Serialize)]
pub struct CertifyReport {
    /// Seeds the harness ran
    pub seeds_tested: u64,
    /// Violations across every run
    pub total_violations: usize,
    /// Seeds whose run failed
    pub failing_seeds: Vec<u64>,
}

impl CertifyReport {
    /// Whether every seed passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.total_violations == 0
    }

    /// Generate a text report.
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Easel Certification Report ===\n\n");
        report.push_str(&format!("Seeds Tested: {}\n", self.seeds_tested));
        report.push_str(&format!("Total Violations: {}\n", self.total_violations));
        if !self.failing_seeds.is_empty() {
            report.push_str(&format!("Failing Seeds: {:?}\n", self.failing_seeds));
        }
        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));
        report
    }
}

/// Run the harness across `seeds` consecutive seeds starting at
/// `base.seed`.
pub async fn run_certification(base: HarnessConfig, seeds: u64) -> CertifyReport {
    let mut total_violations = 0;
    let mut failing_seeds = Vec::new();
    for offset in 0..seeds {
        let config = HarnessConfig {
            seed: base.seed + offset,
            ..base.clone()
        };
        let seed = config.seed;
        let report = run_harness(config).await;
        if !report.passed() {
            tracing::warn!(seed, violations = report.violations.len(), "seed failed");
            total_violations += report.violations.len();
            failing_seeds.push(seed);
        }
    }
    CertifyReport {
        seeds_tested: seeds,
        total_violations,
        failing_seeds,
    }
}
