//! Save lifecycle states
//!
//! Four states, with `Saved` as the initial one:
//!
//! ```text
//! saved --edit--> modified --timer fires--> saving --ok--> saved
//!                                                 --err--> error
//! error --edit--> modified        error --force save--> saving
//! ```
//!
//! `Modified -> Saved` and `Error -> Saved` cover the case where an edit
//! returns the content to the persisted baseline, leaving nothing to save.
//! `Saving -> Modified` covers a save that succeeds while newer edits are
//! already pending.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one tracked draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    /// Content matches the persisted baseline
    #[default]
    Saved,
    /// Edits exist that have not been persisted
    Modified,
    /// A persistence attempt is in flight
    Saving,
    /// The most recent persistence attempt failed
    Error,
}

impl SaveStatus {
    /// Stable lowercase name.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Modified => "modified",
            Self::Saving => "saving",
            Self::Error => "error",
        }
    }

    /// States reachable from `self` in one step.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [SaveStatus] {
        use SaveStatus::{Error, Modified, Saved, Saving};
        match self {
            Saved => &[Modified, Saving],
            Modified => &[Saving, Saved],
            Saving => &[Saved, Modified, Error],
            Error => &[Modified, Saving, Saved],
        }
    }

    /// Whether `next` is reachable from `self` in one step.
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, next: SaveStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Whether unsaved work exists in this state.
    ///
    /// `Saving` is deliberately not dirty: the in-flight attempt owns the
    /// content, and arming guards or auto-save against it would duplicate
    /// the save.
    #[inline]
    #[must_use]
    pub fn is_dirty(self) -> bool {
        matches!(self, Self::Modified | Self::Error)
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_saved() {
        assert_eq!(SaveStatus::default(), SaveStatus::Saved);
    }

    #[test]
    fn edit_and_save_paths_are_legal() {
        assert!(SaveStatus::Saved.can_transition_to(SaveStatus::Modified));
        assert!(SaveStatus::Modified.can_transition_to(SaveStatus::Saving));
        assert!(SaveStatus::Saving.can_transition_to(SaveStatus::Saved));
        assert!(SaveStatus::Saving.can_transition_to(SaveStatus::Error));
        assert!(SaveStatus::Error.can_transition_to(SaveStatus::Modified));
        assert!(SaveStatus::Error.can_transition_to(SaveStatus::Saving));
    }

    #[test]
    fn reverting_to_baseline_is_legal() {
        assert!(SaveStatus::Modified.can_transition_to(SaveStatus::Saved));
        assert!(SaveStatus::Error.can_transition_to(SaveStatus::Saved));
    }

    #[test]
    fn save_success_with_pending_edits_returns_to_modified() {
        assert!(SaveStatus::Saving.can_transition_to(SaveStatus::Modified));
    }

    #[test]
    fn saved_never_reaches_error_directly() {
        assert!(!SaveStatus::Saved.can_transition_to(SaveStatus::Error));
        assert!(!SaveStatus::Modified.can_transition_to(SaveStatus::Error));
        assert!(!SaveStatus::Error.can_transition_to(SaveStatus::Error));
    }

    #[test]
    fn only_modified_and_error_are_dirty() {
        assert!(!SaveStatus::Saved.is_dirty());
        assert!(SaveStatus::Modified.is_dirty());
        assert!(!SaveStatus::Saving.is_dirty());
        assert!(SaveStatus::Error.is_dirty());
    }

    #[test]
    fn names_are_stable() {
        assert_eq!(SaveStatus::Saving.as_str(), "saving");
        assert_eq!(SaveStatus::Error.to_string(), "error");
    }
}
