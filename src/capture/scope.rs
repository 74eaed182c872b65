use std::ops::{Deref, DerefMut};

use super::{Capture, SpanId};

/// Span guard, ends the span when dropped.
///
/// Dereferences to the [`Capture`] so nested scopes can be opened while the
/// outer one is alive. The span is closed on every exit path, including
/// early returns and unwinding.
pub struct Scope<'c, 'r> {
    capture: &'c mut Capture<'r>,
    span: SpanId,
    recording: bool,
}

impl<'c, 'r> Scope<'c, 'r> {
    pub(super) fn new(capture: &'c mut Capture<'r>, span: SpanId, name: &str) -> Self {
        let recording = capture.begin(span, name);
        Self {
            capture,
            span,
            recording,
        }
    }

    /// Whether the span got a ring slot.
    pub fn is_recording(&self) -> bool {
        self.recording
    }
}

impl<'r> Deref for Scope<'_, 'r> {
    type Target = Capture<'r>;

    fn deref(&self) -> &Self::Target {
        self.capture
    }
}

impl DerefMut for Scope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.capture
    }
}

impl Drop for Scope<'_, '_> {
    fn drop(&mut self) {
        if self.recording {
            self.capture.end(self.span);
        }
    }
}
