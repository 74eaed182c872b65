use std::cell::{Cell, RefCell};
use std::sync::Arc;

use super::{Capture, Registry, SpanId};
use crate::clock::{Clock, MonotonicClock};

thread_local! {
    static CURRENT: RefCell<Option<Capture<'static>>> = const { RefCell::new(None) };
}

/// Registers the calling thread in the [global registry][Registry::global]
/// and returns its slot.
///
/// # Panics
///
/// If the thread is already registered or every slot is taken.
pub fn init_capture_for_this_thread(thread_id: u32, name: &str) -> usize {
    init_capture_for_this_thread_with_clock(thread_id, name, Arc::new(MonotonicClock))
}

/// Same as [`init_capture_for_this_thread`] with a custom tick source.
pub fn init_capture_for_this_thread_with_clock(
    thread_id: u32,
    name: &str,
    clock: Arc<dyn Clock>,
) -> usize {
    CURRENT.with_borrow_mut(|current| {
        if current.is_some() {
            panic!("capture already initialized for this thread");
        }
        match Registry::global().register_with_clock(thread_id, name, clock) {
            Ok(capture) => {
                let slot = capture.slot();
                *current = Some(capture);
                slot
            }
            Err(e) => panic!("failed to initialize capture for thread {}: {}", thread_id, e),
        }
    })
}

/// Unregisters the calling thread, no-op if it never registered.
///
/// Consumers should stop draining the thread's slot first.
pub fn stop_capture_for_this_thread() {
    let capture = CURRENT.with_borrow_mut(Option::take);
    drop(capture);
}

/// Whether the calling thread is registered.
pub fn is_capturing() -> bool {
    CURRENT.with_borrow(Option::is_some)
}

/// Runs `f` with the calling thread's capture.
///
/// # Panics
///
/// If the thread is not registered.
pub fn with_capture<F, R>(f: F) -> R
where
    F: FnOnce(&mut Capture<'static>) -> R,
{
    CURRENT.with_borrow_mut(|current| match current {
        Some(capture) => f(capture),
        None => panic!("capture used before init_capture_for_this_thread"),
    })
}

/// Slot of the calling thread, `None` if not registered.
pub fn current_slot() -> Option<usize> {
    CURRENT.with_borrow(|c| c.as_ref().map(Capture::slot))
}

fn current_generation() -> Option<u64> {
    CURRENT
        .try_with(|c| c.try_borrow().ok()?.as_ref().map(Capture::generation))
        .ok()
        .flatten()
}

/// See [`Capture::allocate_span`], panics if the arena is exhausted.
pub fn allocate_span() -> SpanId {
    with_capture(|c| match c.allocate_span() {
        Ok(span) => span,
        Err(e) => panic!("{}", e),
    })
}

/// See [`Capture::begin`].
pub fn begin(span: SpanId, name: &str) -> bool {
    with_capture(|c| c.begin(span, name))
}

/// See [`Capture::end`].
pub fn end(span: SpanId) {
    with_capture(|c| c.end(span))
}

/// Opens `span` on the calling thread until the returned guard drops.
pub fn scope(span: SpanId, name: &str) -> LocalScope {
    let generation = current_generation();
    let recording = begin(span, name);
    LocalScope {
        span,
        generation,
        recording,
    }
}

/// Guard returned by [`scope`] and the [`scope!`][crate::scope!] macro.
///
/// Unlike [`Scope`][super::Scope] it does not borrow the capture, so it can
/// be held across calls that open their own spans.
#[must_use]
pub struct LocalScope {
    span: SpanId,
    generation: Option<u64>,
    recording: bool,
}

impl LocalScope {
    fn inert() -> Self {
        Self {
            span: SpanId(0),
            generation: None,
            recording: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }
}

impl Drop for LocalScope {
    fn drop(&mut self) {
        if !self.recording {
            return;
        }
        // The thread may have re-registered (new arena) or be tearing down.
        let _ = CURRENT.try_with(|current| {
            if let Ok(mut current) = current.try_borrow_mut() {
                if let Some(capture) = current.as_mut() {
                    if Some(capture.generation()) == self.generation {
                        capture.end(self.span);
                    }
                }
            }
        });
    }
}

/// Per call site span cache used by [`scope!`][crate::scope!].
///
/// Holds one span record per registration of the calling thread. Recursive
/// entries into the same call site find the record still open and are not
/// recorded.
pub struct CallSite {
    cached: Cell<Option<(u64, SpanId)>>,
}

impl Default for CallSite {
    fn default() -> Self {
        Self::new()
    }
}

impl CallSite {
    pub const fn new() -> Self {
        Self {
            cached: Cell::new(None),
        }
    }

    /// Opens the call site's span, an inert guard if the thread is not
    /// registered or its arena is exhausted.
    pub fn enter(&self, name: &str) -> LocalScope {
        let Some(generation) = current_generation() else {
            return LocalScope::inert();
        };

        let span = match self.cached.get() {
            Some((g, span)) if g == generation => span,
            _ => match with_capture(|c| c.allocate_span()) {
                Ok(span) => {
                    self.cached.set(Some((generation, span)));
                    span
                }
                Err(_) => return LocalScope::inert(),
            },
        };

        scope(span, name)
    }
}

/// Times the rest of the enclosing block on the calling thread.
///
/// Each expansion caches its own span record, no-op on unregistered threads.
///
/// ```rust
/// use mali_spans::capture::{init_capture_for_this_thread, stop_capture_for_this_thread};
///
/// init_capture_for_this_thread(7, "worker");
/// {
///     mali_spans::scope!("load");
///     // ...
/// }
/// stop_capture_for_this_thread();
/// ```
#[macro_export]
macro_rules! scope {
    ($name:expr) => {
        let _scope = {
            ::std::thread_local! {
                static SITE: $crate::capture::CallSite = const { $crate::capture::CallSite::new() };
            }
            SITE.with(|site| site.enter($name))
        };
    };
}
