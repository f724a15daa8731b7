//! Easel Retry - bounded jittered-backoff retry engine
//!
//! Wraps any asynchronous operation with the workbench retry policy:
//! bounded attempts, exponential backoff with jitter, a pluggable
//! retryability predicate (defaulting to the central classifier), lifecycle
//! hooks, and observable state for UI binding.
//!
//! # Example
//!
//! ```rust,ignore
//! use easel_retry::{RetryOptions, RetryPolicy, RetryRunner};
//!
//! # async fn example() -> Result<(), easel_bridge::HostError> {
//! let runner = RetryRunner::new(RetryPolicy::default());
//! let value = runner
//!     .execute(|| fetch_project(), RetryOptions::labeled("load project"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod policy;
pub mod runner;

// Re-exports for convenience
pub use policy::{RetryPolicy, JITTER_FRACTION};
pub use runner::{RetryError, RetryOptions, RetryRunner, RetryState};
