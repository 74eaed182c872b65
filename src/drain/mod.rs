//! Consumer side of the event rings.
//!
//! [`EventRing::drain`][crate::capture::EventRing::drain] and
//! [`Registry::drain`][crate::capture::Registry::drain] move finished events
//! into any [`Sink`]. Growable containers take everything; bounded ones stop
//! the drain once full, leaving the rest in the ring for the next pass.

#[cfg(test)]
mod test;

mod history;

use std::collections::VecDeque;

use arrayvec::ArrayVec;
pub use history::History;

use crate::capture::{Event, Name};
use crate::config::SAVED_EVENTS;

/// Destination of drained events.
pub trait Sink {
    /// Appends `event`, or returns `false` to stop the drain before it.
    fn push_event(&mut self, event: Event) -> bool;
}

impl Sink for Vec<Event> {
    fn push_event(&mut self, event: Event) -> bool {
        self.push(event);
        true
    }
}

impl Sink for VecDeque<Event> {
    fn push_event(&mut self, event: Event) -> bool {
        self.push_back(event);
        true
    }
}

impl<const N: usize> Sink for ArrayVec<Event, N> {
    fn push_event(&mut self, event: Event) -> bool {
        self.try_push(event).is_ok()
    }
}

impl<S> Sink for &mut S
where
    S: Sink + ?Sized,
{
    fn push_event(&mut self, event: Event) -> bool {
        (**self).push_event(event)
    }
}

/// Events drained from one thread, tagged with its identity.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnpackedCapture {
    pub thread_id: u32,
    pub name: Name,
    pub events: ArrayVec<Event, SAVED_EVENTS>,
}

impl UnpackedCapture {
    pub fn new(thread_id: u32, name: Name) -> Self {
        Self {
            thread_id,
            name,
            events: ArrayVec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.events.is_full()
    }
}

impl Sink for UnpackedCapture {
    fn push_event(&mut self, event: Event) -> bool {
        self.events.push_event(event)
    }
}
