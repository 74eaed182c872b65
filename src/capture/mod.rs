//! Per-thread span capture.
//!
//! Every profiled thread registers once with a [`Registry`] and gets a
//! [`Capture`]: the thread's span arena, nesting depth and event ring.
//! Spans are opened with [`Capture::begin`] and closed with [`Capture::end`],
//! or bracketed by a [`Scope`] guard. Consumer threads find the rings through
//! the registry and drain them with any [`Sink`].
//!
//! # Examples
//!
//! ```rust
//! use mali_spans::capture::Registry;
//!
//! let registry = Registry::new();
//! let mut capture = registry.register(1, "main").unwrap();
//! let slot = capture.slot();
//!
//! let frame = capture.allocate_span().unwrap();
//! let update = capture.allocate_span().unwrap();
//! {
//!     let mut frame = capture.scope(frame, "frame");
//!     let _update = frame.scope(update, "update");
//! }
//!
//! let mut events = vec![];
//! registry.drain(slot, &mut events);
//! assert_eq!(events.len(), 2);
//! assert_eq!(events[0].name.as_str(), "frame");
//! assert_eq!(events[1].depth, 2);
//! ```

#[cfg(test)]
mod test;

mod arena;
mod local;
mod rb;
mod scope;

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use arena::{SpanArena, SpanId};
use arrayvec::ArrayString;
pub use local::*;
pub use rb::{Event, EventRing, Reservation};
pub use scope::Scope;
use thiserror::Error;

use crate::clock::{ticks_to_ms, Clock, MonotonicClock};
use crate::config::{NAME_CAP, SPAN_ARENA_BYTES, THREADS_CAP};
use crate::drain::{Sink, UnpackedCapture};

/// Fixed-size span and capture name.
pub type Name = ArrayString<NAME_CAP>;

/// Builds a [`Name`], truncating on a char boundary if `s` is too long.
pub fn truncated(s: &str) -> Name {
    let mut end = s.len().min(NAME_CAP);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut name = Name::new();
    name.push_str(&s[..end]);
    name
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("all {} capture slots are in use", THREADS_CAP)]
    ThreadsExhausted,
    #[error("span arena budget exhausted")]
    ArenaExhausted,
}

static GENERATION: AtomicU64 = AtomicU64::new(1);

/// Thread-local capture metadata.
#[derive(Clone, Debug)]
pub struct CaptureInfo {
    pub thread_id: u32,
    pub name: Name,
    /// Number of spans currently open on this thread.
    pub depth: u32,
    /// Index of the thread's ring in the registry.
    pub slot: usize,
    /// Ticks per second of the capture clock.
    pub frequency: u64,
}

/// What a consumer sees of a registered thread.
#[derive(Clone, Debug)]
pub struct CaptureMeta {
    pub slot: usize,
    pub thread_id: u32,
    pub name: Name,
}

struct Entry {
    thread_id: u32,
    name: Name,
    generation: u64,
    ring: Arc<EventRing>,
}

struct Slots {
    active: usize,
    entries: [Option<Entry>; THREADS_CAP],
}

/// Table of registered threads and their event rings.
///
/// Registration and teardown are serialized by one lock, which is also taken
/// briefly by consumers to look a ring up.
pub struct Registry {
    slots: Mutex<Slots>,
}

static GLOBAL: Registry = Registry::new();

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                active: 0,
                entries: [const { None }; THREADS_CAP],
            }),
        }
    }

    /// The process-wide registry used by the thread-local API.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the calling thread, timing spans with [`MonotonicClock`].
    pub fn register(&self, thread_id: u32, name: &str) -> Result<Capture<'_>, CaptureError> {
        self.register_with_clock(thread_id, name, Arc::new(MonotonicClock))
    }

    /// Registers the calling thread with a custom tick source.
    ///
    /// Takes the lowest free slot, allocates the span arena and a fresh
    /// event ring for it.
    pub fn register_with_clock(
        &self,
        thread_id: u32,
        name: &str,
        clock: Arc<dyn Clock>,
    ) -> Result<Capture<'_>, CaptureError> {
        let mut slots = self.lock();
        let Some(slot) = slots.entries.iter().position(Option::is_none) else {
            return Err(CaptureError::ThreadsExhausted);
        };

        let name = truncated(name);
        let generation = GENERATION.fetch_add(1, Ordering::Relaxed);
        let ring = Arc::new(EventRing::new());
        slots.entries[slot] = Some(Entry {
            thread_id,
            name,
            generation,
            ring: Arc::clone(&ring),
        });
        slots.active += 1;

        log::debug!("capture {} (thread {}) registered in slot {}", name, thread_id, slot);

        Ok(Capture {
            info: CaptureInfo {
                thread_id,
                name,
                depth: 0,
                slot,
                frequency: clock.frequency(),
            },
            arena: SpanArena::with_budget(SPAN_ARENA_BYTES),
            ring,
            clock,
            generation,
            registry: self,
            _thread_bound: PhantomData,
        })
    }

    fn release(&self, slot: usize, generation: u64) {
        let mut slots = self.lock();
        let owned = matches!(&slots.entries[slot], Some(e) if e.generation == generation);
        if owned {
            if let Some(entry) = slots.entries[slot].take() {
                log::debug!(
                    "capture {} (thread {}) released slot {}",
                    entry.name,
                    entry.thread_id,
                    slot
                );
            }
            slots.active -= 1;
        }
    }

    /// Number of currently registered threads.
    pub fn active_threads(&self) -> usize {
        self.lock().active
    }

    /// Lists the registered threads.
    pub fn captures(&self) -> Vec<CaptureMeta> {
        let slots = self.lock();
        slots
            .entries
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| {
                e.as_ref().map(|e| CaptureMeta {
                    slot,
                    thread_id: e.thread_id,
                    name: e.name,
                })
            })
            .collect()
    }

    /// The event ring registered in `slot`.
    pub fn ring(&self, slot: usize) -> Option<Arc<EventRing>> {
        let slots = self.lock();
        let entry = slots.entries.get(slot)?.as_ref()?;
        Some(Arc::clone(&entry.ring))
    }

    /// Drains the ring in `slot` into `sink`, see [`EventRing::drain`].
    ///
    /// Returns 0 for a vacant slot. Draining a thread that is concurrently
    /// being stopped yields whatever the ring held when it was looked up.
    pub fn drain<S>(&self, slot: usize, sink: &mut S) -> usize
    where
        S: Sink + ?Sized,
    {
        match self.ring(slot) {
            Some(ring) => ring.drain(sink),
            None => 0,
        }
    }

    /// Drains `slot` into a fresh [`UnpackedCapture`] tagged with the thread's identity.
    pub fn unpack(&self, slot: usize) -> Option<UnpackedCapture> {
        let (thread_id, name, ring) = {
            let slots = self.lock();
            let entry = slots.entries.get(slot)?.as_ref()?;
            (entry.thread_id, entry.name, Arc::clone(&entry.ring))
        };
        let mut unpacked = UnpackedCapture::new(thread_id, name);
        ring.drain(&mut unpacked);
        Some(unpacked)
    }
}

/// A thread's capture context.
///
/// Owns the span arena and the producer side of the thread's event ring.
/// Not `Send`: spans must begin and end on the thread that registered.
/// Dropping it releases the registry slot.
pub struct Capture<'r> {
    info: CaptureInfo,
    arena: SpanArena,
    ring: Arc<EventRing>,
    clock: Arc<dyn Clock>,
    generation: u64,
    registry: &'r Registry,
    _thread_bound: PhantomData<*const ()>,
}

impl<'r> Capture<'r> {
    pub fn info(&self) -> &CaptureInfo {
        &self.info
    }

    pub fn slot(&self) -> usize {
        self.info.slot
    }

    pub fn depth(&self) -> u32 {
        self.info.depth
    }

    /// Unique per registration, never reused within the process.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ring(&self) -> &Arc<EventRing> {
        &self.ring
    }

    pub fn arena(&self) -> &SpanArena {
        &self.arena
    }

    /// Allocates a span record, meant to be cached per call site.
    pub fn allocate_span(&mut self) -> Result<SpanId, CaptureError> {
        self.arena.alloc().ok_or(CaptureError::ArenaExhausted)
    }

    /// Opens `span`.
    ///
    /// Returns `false` if no event will be recorded: the ring is full (the event
    /// is dropped silently), `span` is already open, or `span` is unknown.
    pub fn begin(&mut self, span: SpanId, name: &str) -> bool {
        let Some(record) = self.arena.get_mut(span) else {
            return false;
        };
        if record.is_open() {
            return false;
        }
        let Some(reservation) = self.ring.reserve() else {
            return false;
        };

        self.info.depth += 1;
        record.start = self.clock.now();
        record.depth = self.info.depth;
        record.name = truncated(name);
        record.reservation = Some(reservation);
        true
    }

    /// Closes `span` and publishes its event, no-op if it holds no slot.
    pub fn end(&mut self, span: SpanId) {
        let Some(record) = self.arena.get_mut(span) else {
            return;
        };
        let Some(reservation) = record.reservation.take() else {
            return;
        };

        let duration_ticks = self.clock.now().saturating_sub(record.start);
        self.info.depth = self.info.depth.saturating_sub(1);

        let event = Event {
            start: record.start,
            duration_ticks,
            duration_ms: ticks_to_ms(duration_ticks, self.info.frequency),
            depth: record.depth,
            name: record.name,
        };
        self.ring.publish(reservation, event);
    }

    /// Opens `span` until the returned guard drops.
    pub fn scope(&mut self, span: SpanId, name: &str) -> Scope<'_, 'r> {
        Scope::new(self, span, name)
    }

    /// Unregisters the thread, same as dropping the capture.
    pub fn stop(self) {}
}

impl Drop for Capture<'_> {
    fn drop(&mut self) {
        self.registry.release(self.info.slot, self.generation);
    }
}
