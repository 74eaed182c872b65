use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::Name;
use crate::config::EVENTS_CAP;
use crate::drain::Sink;

/// A finished span as handed out to consumers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Tick at which the span began.
    pub start: u64,
    pub duration_ticks: u64,
    pub duration_ms: f64,
    /// Nesting level, 1 for outermost spans.
    pub depth: u32,
    pub name: Name,
}

#[derive(Default)]
struct Slot {
    // The payload is only valid once this is set.
    ready: AtomicBool,
    event: UnsafeCell<Event>,
}

struct Cursor {
    read: usize,
    write: usize,
}

/// Claim on one ring slot, returned by [`EventRing::reserve`].
///
/// Consumed by [`EventRing::publish`], which is the only way the slot
/// becomes visible to [`drain`][EventRing::drain].
#[derive(Debug, PartialEq, Eq)]
pub struct Reservation {
    ring: u64,
    idx: usize,
}

impl Reservation {
    pub fn index(&self) -> usize {
        self.idx
    }
}

/// Bounded single-producer/single-consumer event ring.
///
/// The mutex only guards the read and write indices. Payloads are written
/// by the producer outside of the lock, readiness of each slot is the only
/// signal the consumer relies on.
///
/// Slots are drained strictly in reservation order: [`drain`][Self::drain]
/// stops at the first slot that is still reserved. Since a span reserves its
/// slot in `begin` but publishes it in `end`, an open parent holds back all of
/// its already finished children until it closes itself.
pub struct EventRing {
    id: u64,
    cursor: Mutex<Cursor>,
    slots: Box<[Slot]>,
}

// Never reused, so a reservation outliving its ring matches no other ring.
static RING_ID: AtomicU64 = AtomicU64::new(1);

// Each slot payload is written only by the holder of its `Reservation`
// while `ready` is false, and read only by the drainer once `ready` is true.
unsafe impl Sync for EventRing {}

impl Default for EventRing {
    fn default() -> Self {
        Self::with_capacity(EVENTS_CAP)
    }
}

impl EventRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ring with `cap` slots, `cap - 1` of which are usable.
    pub fn with_capacity(cap: usize) -> Self {
        assert!(cap >= 2, "ring capacity must be at least 2");
        Self {
            id: RING_ID.fetch_add(1, Ordering::Relaxed),
            cursor: Mutex::new(Cursor { read: 0, write: 0 }),
            slots: (0..cap).map(|_| Slot::default()).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn lock(&self) -> MutexGuard<'_, Cursor> {
        // Index updates are single stores, a panicking holder cannot tear them.
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the next free slot, `None` if the ring is full.
    pub fn reserve(&self) -> Option<Reservation> {
        let mut cur = self.lock();
        let next = (cur.write + 1) % self.slots.len();
        if next == cur.read {
            return None;
        }

        let idx = cur.write;
        self.slots[idx].ready.store(false, Ordering::Relaxed);
        cur.write = next;

        Some(Reservation {
            ring: self.id,
            idx,
        })
    }

    /// Fills the reserved slot and marks it ready, without taking the lock.
    pub fn publish(&self, reservation: Reservation, event: Event) {
        assert_eq!(
            reservation.ring,
            self.id,
            "reservation published into a foreign ring"
        );
        let slot = &self.slots[reservation.idx];
        // Unique access: we hold the reservation and `ready` is still false.
        unsafe { *slot.event.get() = event };
        slot.ready.store(true, Ordering::Release);
    }

    /// Moves every contiguous ready event into `sink`.
    ///
    /// Stops at the first slot that is not ready yet or that `sink` refuses,
    /// and returns the number of events moved.
    pub fn drain<S>(&self, sink: &mut S) -> usize
    where
        S: Sink + ?Sized,
    {
        let mut cur = self.lock();
        let cap = self.slots.len();
        let mut moved = 0;

        while cur.read != cur.write {
            let slot = &self.slots[cur.read];
            if !slot.ready.load(Ordering::Acquire) {
                break;
            }
            // Ready slots are not written again until the read index passes them.
            let event = unsafe { *slot.event.get() };
            if !sink.push_event(event) {
                break;
            }
            cur.read = (cur.read + 1) % cap;
            moved += 1;
        }

        moved
    }

    /// Current `(read, write)` indices.
    pub fn cursor(&self) -> (usize, usize) {
        let cur = self.lock();
        (cur.read, cur.write)
    }

    /// Number of reserved slots not yet drained, ready or not.
    pub fn pending(&self) -> usize {
        let (read, write) = self.cursor();
        (write + self.slots.len() - read) % self.slots.len()
    }
}
