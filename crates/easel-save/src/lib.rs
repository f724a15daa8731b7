//! Easel Save - debounced persistence for editable drafts
//!
//! One [`DraftSaver`] per open draft: edits stream in, a trailing-edge
//! quiet window collapses them, and only the latest content reaches the
//! store. The four-state lifecycle (`saved`, `modified`, `saving`,
//! `error`) is published on a watch channel for UI binding, failures land
//! in the error ledger with a retry-capable notice, and persistence
//! attempts run under the retry engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use easel_save::{DraftSaver, SaveContext, SaverOptions};
//!
//! # async fn example(context: SaveContext, entity: easel_bridge::EntityRef) {
//! let saver = DraftSaver::new(entity, "loaded content", context, SaverOptions::default());
//! saver.debounced_save("loaded content, edited");
//! // ...2s of quiet later the edit is persisted...
//! saver.close();
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod saver;
pub mod status;

// Re-exports for convenience
pub use saver::{
    DraftSaver, PendingEdit, SaveContext, SaverOptions, DEFAULT_DEBOUNCE, SAVE_SCOPE,
};
pub use status::SaveStatus;
