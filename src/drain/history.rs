use arrayvec::ArrayVec;

use super::Sink;
use crate::capture::Event;

/// Fixed-capacity event history that overwrites its oldest entry when full.
///
/// Never refuses an event, so a drain into it always empties the ready
/// prefix of the ring.
#[derive(Clone, Debug, Default)]
pub struct History<const N: usize> {
    buf: ArrayVec<Event, N>,
    // Index of the oldest entry once `buf` is full.
    head: usize,
}

impl<const N: usize> History<N> {
    pub fn new() -> Self {
        Self {
            buf: ArrayVec::new(),
            head: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
    }

    /// Iterates from the oldest to the newest entry.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        let (newer, older) = self.buf.split_at(self.head);
        older.iter().chain(newer)
    }

    pub fn latest(&self) -> Option<&Event> {
        match self.head {
            0 => self.buf.last(),
            h => self.buf.get(h - 1),
        }
    }
}

impl<const N: usize> Sink for History<N> {
    fn push_event(&mut self, event: Event) -> bool {
        if N == 0 {
            return true;
        }
        if self.buf.is_full() {
            self.buf[self.head] = event;
            self.head = (self.head + 1) % N;
        } else {
            self.buf.push(event);
        }
        true
    }
}
