use std::collections::VecDeque;

use arrayvec::ArrayVec;

use super::{History, Sink, UnpackedCapture};
use crate::capture::{truncated, Event, EventRing};
use crate::config::SAVED_EVENTS;

fn filled(n: u64) -> EventRing {
    let ring = EventRing::with_capacity(16);
    for start in 0..n {
        let r = ring.reserve().unwrap();
        ring.publish(
            r,
            Event {
                start,
                ..Default::default()
            },
        );
    }
    ring
}

fn starts<'a>(events: impl IntoIterator<Item = &'a Event>) -> Vec<u64> {
    events.into_iter().map(|e| e.start).collect()
}

#[test]
fn test_bounded_sink_stops_drain() {
    let ring = filled(5);
    let mut first = ArrayVec::<Event, 3>::new();
    assert_eq!(ring.drain(&mut first), 3);
    assert_eq!(starts(&first), [0, 1, 2]);
    assert_eq!(ring.pending(), 2);

    let mut rest = VecDeque::new();
    assert_eq!(ring.drain(&mut rest), 2);
    assert_eq!(starts(&rest), [3, 4]);
    assert_eq!(ring.pending(), 0);
}

#[test]
fn test_dyn_sink() {
    let ring = filled(2);
    let mut events: Vec<Event> = vec![];
    let sink: &mut dyn Sink = &mut events;
    assert_eq!(ring.drain(sink), 2);
    assert_eq!(starts(&events), [0, 1]);
}

#[test]
fn test_history_overwrites_oldest() {
    let ring = filled(7);
    let mut history = History::<4>::new();
    assert!(history.latest().is_none());

    assert_eq!(ring.drain(&mut history), 7);
    assert_eq!(history.len(), 4);
    assert_eq!(starts(history.iter()), [3, 4, 5, 6]);
    assert_eq!(history.latest().map(|e| e.start), Some(6));

    history.clear();
    assert!(history.is_empty());
    history.push_event(Event::default());
    assert_eq!(history.len(), 1);
}

#[test]
fn test_unpacked_capture() {
    let mut unpacked = UnpackedCapture::new(3, truncated("render"));
    for _ in 0..SAVED_EVENTS {
        assert!(unpacked.push_event(Event::default()));
    }
    assert!(unpacked.is_full());
    assert!(!unpacked.push_event(Event::default()));
    assert_eq!(unpacked.events.len(), SAVED_EVENTS);
    assert_eq!(unpacked.name.as_str(), "render");
}
