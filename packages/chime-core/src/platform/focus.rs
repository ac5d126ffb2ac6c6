//! Application focus queries.

use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the application currently has the user's attention,
/// and can ask the host to bring it to the foreground.
pub trait FocusProbe: Send + Sync {
    /// Whether the application window is focused right now.
    fn is_focused(&self) -> bool;

    /// Asks the host to focus the application. Best-effort; some hosts
    /// ignore this outside of a user gesture.
    fn request_focus(&self);
}

/// Probe with a settable focus flag.
///
/// The headless default, and what tests use to steer the focused/unfocused
/// branches. `request_focus` flips the flag so tests can observe the call.
#[derive(Debug, Default)]
pub struct StaticFocusProbe {
    focused: AtomicBool,
}

impl StaticFocusProbe {
    /// Probe that reports focused.
    #[must_use]
    pub fn focused() -> Self {
        Self {
            focused: AtomicBool::new(true),
        }
    }

    /// Probe that reports unfocused.
    #[must_use]
    pub fn unfocused() -> Self {
        Self {
            focused: AtomicBool::new(false),
        }
    }

    /// Overrides the focus flag.
    pub fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }
}

impl FocusProbe for StaticFocusProbe {
    fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    fn request_focus(&self) {
        self.focused.store(true, Ordering::SeqCst);
    }
}
