//! Easel Errors - failure classification and the process-wide error ledger
//!
//! Two pieces:
//! - [`classify`] maps a [`HostError`](easel_bridge::HostError) to a
//!   category with recoverability and retryability verdicts
//! - [`ErrorRegistry`] records every handled failure in a bounded
//!   most-recent-first history with aggregate stats and a critical signal
//!
//! Classification lives here, and only here, so the retry engine, the save
//! machine, and ad-hoc call sites all agree on what is worth retrying.

#![warn(unreachable_pub)]

// Core modules
pub mod classify;
pub mod registry;

// Re-exports for convenience
pub use classify::{classify, ErrorCategory, ErrorInfo};
pub use registry::{
    ErrorContext, ErrorRecord, ErrorRegistry, ErrorScope, ErrorStats, DEFAULT_HISTORY_CAPACITY,
};
