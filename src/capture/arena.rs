use std::mem::size_of;

use super::rb::Reservation;
use super::Name;

/// Handle to a span record in a thread's [`SpanArena`].
///
/// Only meaningful for the [`Capture`][super::Capture] that allocated it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpanId(pub(crate) u32);

/// One open (or reusable) span.
#[derive(Debug, Default)]
pub(crate) struct Span {
    pub start: u64,
    pub depth: u32,
    pub name: Name,
    // `None` when closed, or when the event was dropped on a full ring.
    pub reservation: Option<Reservation>,
}

impl Span {
    pub fn is_open(&self) -> bool {
        self.reservation.is_some()
    }
}

/// Fixed-budget pool of span records.
///
/// Records are never released one by one, the whole pool goes away with
/// the capture that owns it.
pub struct SpanArena {
    spans: Vec<Span>,
    cap: usize,
}

impl SpanArena {
    pub fn with_budget(bytes: usize) -> Self {
        let cap = (bytes / size_of::<Span>()).min(u32::MAX as usize);
        Self {
            spans: Vec::with_capacity(cap.min(64)),
            cap,
        }
    }

    /// Carves out a new record, `None` once the budget is spent.
    pub fn alloc(&mut self) -> Option<SpanId> {
        if self.spans.len() >= self.cap {
            return None;
        }
        let id = SpanId(self.spans.len() as u32);
        self.spans.push(Span::default());
        Some(id)
    }

    pub(crate) fn get_mut(&mut self, id: SpanId) -> Option<&mut Span> {
        self.spans.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Maximum number of records.
    pub fn capacity(&self) -> usize {
        self.cap
    }
}
