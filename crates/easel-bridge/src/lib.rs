//! Easel Bridge - collaborator seams between the resilience core and the shell
//!
//! Defines the narrow surface the core consumes from its host:
//! - [`ContentStore`] persists entity content
//! - [`Notifier`] delivers fire-and-forget notices
//! - [`Confirmer`] asks modal yes/no questions
//!
//! plus the shared types flowing across that surface: [`HostError`],
//! [`EntityRef`]/[`SavedRecord`], and the [`Provenance`] notification policy.
//!
//! # Example
//!
//! ```rust,ignore
//! use easel_bridge::{ContentStore, EntityRef, ArtifactKind};
//!
//! # async fn example(store: std::sync::Arc<dyn ContentStore>) {
//! let entity = EntityRef::new(ArtifactKind::Diagram, "Pump layout");
//! let record = store.save(&entity, "graph TD; A-->B").await;
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod confirm;
pub mod entity;
pub mod error;
pub mod notify;
pub mod store;

// Re-exports for convenience
pub use confirm::{ConfirmKind, ConfirmRequest, Confirmer};
pub use entity::{ArtifactKind, EntityRef, Provenance, SavedRecord};
pub use error::HostError;
pub use notify::{Notice, NoticeAction, NoticeKind, NoticeOptions, NoticePosition, Notifier};
pub use store::ContentStore;
