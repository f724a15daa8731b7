//! Modal confirmation seam

use async_trait::async_trait;

/// Visual register of a confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmKind {
    /// Neutral question
    #[default]
    Question,
    /// Something will be lost or degraded
    Warning,
    /// Destructive and irreversible
    Danger,
}

/// A yes/no question put to the user.
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    /// Dialog headline
    pub title: String,
    /// Question body
    pub message: String,
    /// Visual register
    pub kind: ConfirmKind,
    /// Label on the accepting button
    pub confirm_label: String,
    /// Label on the declining button
    pub cancel_label: String,
    /// Extra context shown below the message
    pub detail: Option<String>,
}

impl ConfirmRequest {
    /// Create a request with default labels.
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind: ConfirmKind::Question,
            confirm_label: "Confirm".to_string(),
            cancel_label: "Cancel".to_string(),
            detail: None,
        }
    }

    /// With a visual register.
    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: ConfirmKind) -> Self {
        self.kind = kind;
        self
    }

    /// With button labels.
    #[inline]
    #[must_use]
    pub fn with_labels(mut self, confirm: impl Into<String>, cancel: impl Into<String>) -> Self {
        self.confirm_label = confirm.into();
        self.cancel_label = cancel.into();
        self
    }

    /// With extra context.
    #[inline]
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Modal binary choice implemented by the shell.
///
/// Resolves only on an explicit user decision; it never times out on its own.
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Ask the user and wait for their answer.
    async fn confirm(&self, request: ConfirmRequest) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_request_defaults() {
        let request = ConfirmRequest::new("Unsaved changes", "Leave without saving?");
        assert_eq!(request.kind, ConfirmKind::Question);
        assert_eq!(request.confirm_label, "Confirm");
        assert_eq!(request.cancel_label, "Cancel");
        assert!(request.detail.is_none());
    }

    #[test]
    fn confirm_request_builder() {
        let request = ConfirmRequest::new("Discard changes?", "Your edits will be lost.")
            .with_kind(ConfirmKind::Danger)
            .with_labels("Discard", "Keep editing")
            .with_detail("Last saved 2 minutes ago");

        assert_eq!(request.kind, ConfirmKind::Danger);
        assert_eq!(request.confirm_label, "Discard");
        assert_eq!(request.cancel_label, "Keep editing");
        assert_eq!(request.detail.as_deref(), Some("Last saved 2 minutes ago"));
    }
}
