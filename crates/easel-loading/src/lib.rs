//! Easel Loading - process-wide registry of in-flight operations
//!
//! Independent UI regions ask one ledger "is anything loading?" instead of
//! wiring back-channels between themselves. Entries carry a message,
//! optional progress, and an optional cancellation callback; scoped views
//! partition the ledger by namespace.
//!
//! # Example
//!
//! ```rust,ignore
//! use easel_loading::{LoadingRegistry, StartOptions};
//!
//! # async fn example() {
//! let registry = LoadingRegistry::new();
//! let result = registry
//!     .with_loading("Loading project", StartOptions::default(), async {
//!         Ok::<_, String>("project")
//!     })
//!     .await;
//! assert!(!registry.is_loading());
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod registry;

// Re-exports for convenience
pub use registry::{
    LoadingId, LoadingRegistry, LoadingScope, LoadingState, LoadingUpdate, ProgressHandle,
    StartOptions,
};
