//! Easel Session - the assembled resilience layer
//!
//! A [`WorkbenchSession`] is what a host shell actually holds: it owns the
//! shared loading and error registries, carries the save/retry policy, and
//! opens [`DraftHandle`]s that pair a debounced saver with an
//! unsaved-changes guard. The member crates underneath stay usable on
//! their own; this crate is the wiring.
//!
//! The `easel-harness` binary drives scripted editing sessions against a
//! deliberately unreliable store; see [`harness`].
//!
//! # Example
//!
//! ```rust,ignore
//! use easel_session::prelude::*;
//!
//! # async fn example(store: std::sync::Arc<dyn ContentStore>,
//! #                  notifier: std::sync::Arc<dyn Notifier>,
//! #                  confirmer: std::sync::Arc<dyn Confirmer>) {
//! let session = WorkbenchSession::new(store, notifier, confirmer);
//! let entity = EntityRef::new(ArtifactKind::Diagram, "Pump layout");
//! let draft = session.open_draft(entity, "loaded content", DraftOptions::existing()).unwrap();
//!
//! draft.debounced_save("loaded content, edited");
//! // ...2s of quiet later the edit is persisted...
//! if draft.before_navigate().await.allows_navigation() {
//!     draft.close();
//! }
//! session.shutdown();
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod draft;
pub mod harness;
pub mod session;

// Re-exports for convenience
pub use draft::{DraftHandle, DraftOptions};
pub use session::{SessionConfig, SessionError, WorkbenchSession};

/// Crate version, as the harness binary reports it.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for host shells embedding the layer.
pub mod prelude {
    pub use crate::draft::{DraftHandle, DraftOptions};
    pub use crate::session::{SessionConfig, SessionError, WorkbenchSession};
    pub use easel_bridge::{
        ArtifactKind, ConfirmKind, ConfirmRequest, Confirmer, ContentStore, EntityRef, HostError,
        Notice, NoticeAction, NoticeKind, Notifier, Provenance, SavedRecord,
    };
    pub use easel_errors::{classify, ErrorCategory, ErrorInfo, ErrorRegistry};
    pub use easel_guard::{NavigationSave, NavigationVerdict, UnsavedGuard};
    pub use easel_loading::{LoadingRegistry, LoadingScope, StartOptions};
    pub use easel_retry::{RetryOptions, RetryPolicy, RetryRunner};
    pub use easel_save::{DraftSaver, SaveContext, SaveStatus, SaverOptions};
}
