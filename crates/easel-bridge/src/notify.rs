//! User-visible notification seam
//!
//! The core never renders anything itself; it hands [`Notice`] values to the
//! shell through [`Notifier`] and moves on. Delivery must not block.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// Neutral information
    Info,
    /// Operation completed
    Success,
    /// Something degraded but recoverable
    Warning,
    /// Operation failed
    Error,
}

/// Placement hint for the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoticePosition {
    /// Default toast corner
    #[default]
    BottomRight,
    /// Upper corner, for persistent warnings
    TopRight,
    /// Centered banner
    TopCenter,
}

/// Inline action attached to a notice.
#[derive(Clone)]
pub struct NoticeAction {
    /// Button label
    pub label: String,
    /// Invoked when the user activates the action
    pub run: Arc<dyn Fn() + Send + Sync>,
}

impl NoticeAction {
    /// Create an action.
    #[must_use]
    pub fn new(label: impl Into<String>, run: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            run: Arc::new(run),
        }
    }
}

impl fmt::Debug for NoticeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoticeAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Presentation options for a notice.
#[derive(Debug, Clone, Default)]
pub struct NoticeOptions {
    /// Auto-dismiss after this long; `None` leaves it to the shell
    pub duration: Option<Duration>,
    /// Placement hint
    pub position: NoticePosition,
    /// Inline actions, in display order
    pub actions: Vec<NoticeAction>,
}

/// A user-visible notification.
#[derive(Debug, Clone)]
pub struct Notice {
    /// Severity
    pub kind: NoticeKind,
    /// Short headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Presentation options
    pub options: NoticeOptions,
}

impl Notice {
    /// Create a notice with default options.
    #[must_use]
    pub fn new(kind: NoticeKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            options: NoticeOptions::default(),
        }
    }

    /// Informational notice.
    #[inline]
    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, title, message)
    }

    /// Success notice.
    #[inline]
    #[must_use]
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, title, message)
    }

    /// Warning notice.
    #[inline]
    #[must_use]
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, title, message)
    }

    /// Error notice.
    #[inline]
    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, title, message)
    }

    /// With an auto-dismiss duration.
    #[inline]
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.options.duration = Some(duration);
        self
    }

    /// With a placement hint.
    #[inline]
    #[must_use]
    pub fn with_position(mut self, position: NoticePosition) -> Self {
        self.options.position = position;
        self
    }

    /// With an inline action appended.
    #[inline]
    #[must_use]
    pub fn with_action(mut self, action: NoticeAction) -> Self {
        self.options.actions.push(action);
        self
    }
}

/// Fire-and-forget notification sink implemented by the shell.
pub trait Notifier: Send + Sync {
    /// Deliver `notice` to the user. Must return promptly.
    fn notify(&self, notice: Notice);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn notice_builder() {
        let notice = Notice::warning("Slow save", "Still trying")
            .with_duration(Duration::from_secs(5))
            .with_position(NoticePosition::TopRight)
            .with_action(NoticeAction::new("Retry", || {}));

        assert_eq!(notice.kind, NoticeKind::Warning);
        assert_eq!(notice.options.duration, Some(Duration::from_secs(5)));
        assert_eq!(notice.options.position, NoticePosition::TopRight);
        assert_eq!(notice.options.actions.len(), 1);
        assert_eq!(notice.options.actions[0].label, "Retry");
    }

    #[test]
    fn notice_action_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&hits);
        let action = NoticeAction::new("Retry", move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        (action.run)();
        (action.run)();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
