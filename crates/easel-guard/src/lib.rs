//! Easel Guard - unsaved-changes protection for draft exits
//!
//! Intercepts the two ways a user can leave an edited draft: the platform
//! unload prompt (synchronous, report-only) and in-app navigation
//! (asynchronous, with save / discard / stay flows). While unsaved work
//! exists an optional interval saves it in the background.
//!
//! The guard owns no content. It watches a dirty flag fed from the save
//! machine and persists through the [`NavigationSave`] seam, so it
//! composes with any saver.

#![warn(unreachable_pub)]

// Core modules
pub mod guard;

// Re-exports for convenience
pub use guard::{
    GuardOptions, NavigationSave, NavigationVerdict, UnsavedGuard, DEFAULT_AUTO_SAVE_PERIOD,
};
