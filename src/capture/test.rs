use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use super::*;
use crate::clock::ManualClock;
use crate::config::EVENTS_CAP;

fn manual(registry: &Registry, thread_id: u32) -> (Capture<'_>, ManualClock) {
    let clock = ManualClock::new(1000);
    let capture = registry
        .register_with_clock(thread_id, "test", Arc::new(clock.clone()))
        .unwrap();
    (capture, clock)
}

fn drain_all(registry: &Registry, slot: usize) -> Vec<Event> {
    let mut events = vec![];
    registry.drain(slot, &mut events);
    events
}

#[test]
fn test_nested_spans() {
    let registry = Registry::new();
    let (mut capture, clock) = manual(&registry, 1);
    let a = capture.allocate_span().unwrap();
    let b = capture.allocate_span().unwrap();

    assert!(capture.begin(a, "A"));
    clock.advance(5);
    assert!(capture.begin(b, "B"));
    assert_eq!(capture.depth(), 2);
    clock.advance(3);
    capture.end(b);
    clock.advance(2);
    capture.end(a);
    assert_eq!(capture.depth(), 0);

    let events = drain_all(&registry, capture.slot());
    assert_eq!(events.len(), 2);

    assert_eq!(events[0].name.as_str(), "A");
    assert_eq!(events[0].start, 0);
    assert_eq!(events[0].duration_ticks, 10);
    assert_eq!(events[0].duration_ms, 10.0);
    assert_eq!(events[0].depth, 1);

    assert_eq!(events[1].name.as_str(), "B");
    assert_eq!(events[1].start, 5);
    assert_eq!(events[1].duration_ticks, 3);
    assert_eq!(events[1].depth, 2);
}

#[test]
fn test_open_parent_blocks_children() {
    let registry = Registry::new();
    let (mut capture, clock) = manual(&registry, 1);
    let a = capture.allocate_span().unwrap();
    let b = capture.allocate_span().unwrap();

    capture.begin(a, "A");
    capture.begin(b, "B");
    clock.advance(1);
    capture.end(b);

    assert!(drain_all(&registry, capture.slot()).is_empty());
    assert_eq!(capture.ring().pending(), 2);

    capture.end(a);
    let events = drain_all(&registry, capture.slot());
    let names: Vec<_> = events.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["A", "B"]);

    let (read, write) = capture.ring().cursor();
    assert_eq!(read, write);
}

#[test]
fn test_ring_reserve_publish() {
    let ring = EventRing::with_capacity(4);
    let a = ring.reserve().unwrap();
    let b = ring.reserve().unwrap();
    let c = ring.reserve().unwrap();
    assert!(ring.reserve().is_none());
    assert_eq!((a.index(), b.index(), c.index()), (0, 1, 2));

    let event = |start| Event {
        start,
        ..Default::default()
    };
    ring.publish(b, event(2));
    let mut out = vec![];
    assert_eq!(ring.drain(&mut out), 0);

    ring.publish(a, event(1));
    assert_eq!(ring.drain(&mut out), 2);
    assert_eq!(ring.cursor(), (2, 3));

    // The freed slots are reused after wrapping.
    let d = ring.reserve().unwrap();
    let e = ring.reserve().unwrap();
    assert_eq!((d.index(), e.index()), (3, 0));
    assert!(ring.reserve().is_none());

    ring.publish(c, event(3));
    ring.publish(d, event(4));
    ring.publish(e, event(5));
    assert_eq!(ring.drain(&mut out), 3);
    let starts: Vec<_> = out.iter().map(|e| e.start).collect();
    assert_eq!(starts, [1, 2, 3, 4, 5]);
    assert_eq!(ring.pending(), 0);
}

#[test]
#[should_panic(expected = "foreign ring")]
fn test_publish_foreign_reservation() {
    let a = EventRing::with_capacity(2);
    let b = EventRing::with_capacity(2);
    let r = a.reserve().unwrap();
    b.publish(r, Event::default());
}

#[test]
#[should_panic(expected = "foreign ring")]
fn test_publish_reservation_of_dropped_ring() {
    let a = Box::new(EventRing::with_capacity(2));
    let stale = a.reserve().unwrap();
    drop(a);

    // Likely allocated where `a` was.
    let b = Box::new(EventRing::with_capacity(2));
    let own = b.reserve().unwrap();
    assert_eq!(own.index(), stale.index());
    b.publish(stale, Event::default());
}

#[test]
fn test_full_ring_drops_events() {
    let registry = Registry::new();
    let (mut capture, _clock) = manual(&registry, 1);
    let span = capture.allocate_span().unwrap();

    for _ in 0..EVENTS_CAP - 1 {
        assert!(capture.begin(span, "s"));
        capture.end(span);
    }
    assert!(!capture.begin(span, "dropped"));
    assert_eq!(capture.depth(), 0);
    // Closing a span that got no slot is a no-op.
    capture.end(span);

    let events = drain_all(&registry, capture.slot());
    assert_eq!(events.len(), EVENTS_CAP - 1);
    assert!(events.iter().all(|e| e.name.as_str() == "s"));

    assert!(capture.begin(span, "again"));
    capture.end(span);
    assert_eq!(drain_all(&registry, capture.slot()).len(), 1);
}

#[test]
fn test_begin_open_span() {
    let registry = Registry::new();
    let (mut capture, _clock) = manual(&registry, 1);
    let span = capture.allocate_span().unwrap();

    assert!(capture.begin(span, "outer"));
    assert!(!capture.begin(span, "recursive"));
    assert_eq!(capture.depth(), 1);
    capture.end(span);

    let events = drain_all(&registry, capture.slot());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name.as_str(), "outer");

    assert!(!capture.begin(SpanId(1000), "unknown"));
}

#[test]
fn test_arena_budget() {
    let mut arena = SpanArena::with_budget(0);
    assert!(arena.alloc().is_none());

    let registry = Registry::new();
    let (mut capture, _clock) = manual(&registry, 1);
    let cap = capture.arena().capacity();
    assert!(cap > 0);
    for _ in 0..cap {
        capture.allocate_span().unwrap();
    }
    assert_eq!(capture.allocate_span(), Err(CaptureError::ArenaExhausted));
}

#[test]
fn test_threads_exhausted() {
    let registry = Registry::new();
    let mut captures: Vec<_> = (0..THREADS_CAP as u32)
        .map(|i| registry.register(i, "t").unwrap())
        .collect();
    assert_eq!(registry.active_threads(), THREADS_CAP);
    assert!(matches!(
        registry.register(99, "late"),
        Err(CaptureError::ThreadsExhausted)
    ));

    let freed = captures.remove(3);
    assert_eq!(freed.slot(), 3);
    freed.stop();
    assert_eq!(registry.active_threads(), THREADS_CAP - 1);
    assert!(registry.ring(3).is_none());

    let late = registry.register(99, "late").unwrap();
    assert_eq!(late.slot(), 3);
    assert_eq!(late.info().thread_id, 99);
}

#[test]
fn test_captures_and_unpack() {
    let registry = Registry::new();
    let (mut capture, clock) = manual(&registry, 42);
    assert_eq!(capture.info().frequency, 1000);

    let meta = registry.captures();
    assert_eq!(meta.len(), 1);
    assert_eq!(meta[0].thread_id, 42);
    assert_eq!(meta[0].name.as_str(), "test");

    let span = capture.allocate_span().unwrap();
    {
        let _scope = capture.scope(span, "frame");
        clock.advance(16);
    }

    let unpacked = registry.unpack(capture.slot()).unwrap();
    assert_eq!(unpacked.thread_id, 42);
    assert_eq!(unpacked.name.as_str(), "test");
    assert_eq!(unpacked.events.len(), 1);
    assert_eq!(unpacked.events[0].duration_ms, 16.0);

    assert!(registry.unpack(capture.slot() + 1).is_none());
}

#[test]
fn test_scope_on_unwind() {
    let registry = Registry::new();
    let (mut capture, clock) = manual(&registry, 1);
    let outer = capture.allocate_span().unwrap();
    let inner = capture.allocate_span().unwrap();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut outer = capture.scope(outer, "outer");
        let inner = outer.scope(inner, "inner");
        assert!(inner.is_recording());
        clock.advance(1);
        panic!("boom");
    }));
    assert!(result.is_err());
    assert_eq!(capture.depth(), 0);

    let events = drain_all(&registry, capture.slot());
    let names: Vec<_> = events.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["outer", "inner"]);
}

#[test]
fn test_long_names_truncated() {
    let name = format!("{}é", "a".repeat(NAME_CAP - 1));
    assert_eq!(truncated(&name).len(), NAME_CAP - 1);
    assert_eq!(truncated("short").as_str(), "short");

    let registry = Registry::new();
    let capture = registry.register(1, &name).unwrap();
    assert_eq!(capture.info().name.as_str(), "a".repeat(NAME_CAP - 1));
}

#[test]
fn test_concurrent_drain() {
    const SPANS: u64 = 20_000;

    let registry = Registry::new();
    let clock = ManualClock::new(1_000_000);
    let done = AtomicBool::new(false);
    let slot = std::sync::OnceLock::new();

    let (drained, recorded) = thread::scope(|s| {
        let producer = s.spawn(|| {
            let mut capture = registry
                .register_with_clock(1, "producer", Arc::new(clock.clone()))
                .unwrap();
            let _ = slot.set(capture.slot());
            let span = capture.allocate_span().unwrap();
            let mut recorded = 0;
            for _ in 0..SPANS {
                clock.advance(1);
                if capture.begin(span, "work") {
                    capture.end(span);
                    recorded += 1;
                }
            }
            // Keep the slot registered until the consumer caught up.
            while capture.ring().pending() > 0 {
                thread::yield_now();
            }
            done.store(true, Ordering::Release);
            recorded
        });

        let mut events = vec![];
        while !done.load(Ordering::Acquire) {
            if let Some(&slot) = slot.get() {
                registry.drain(slot, &mut events);
            }
            thread::yield_now();
        }
        (events, producer.join().unwrap())
    });

    assert!(recorded > 0);
    assert_eq!(drained.len() as u64, recorded);
    assert!(drained.windows(2).all(|w| w[0].start < w[1].start));
    assert_eq!(registry.active_threads(), 0);
}

#[test]
fn test_local_api() {
    thread::spawn(|| {
        assert!(!is_capturing());
        {
            crate::scope!("ignored");
        }

        let clock = ManualClock::new(1000);
        let slot = init_capture_for_this_thread_with_clock(7, "worker", Arc::new(clock.clone()));
        assert!(is_capturing());
        assert_eq!(current_slot(), Some(slot));

        fn leaf(clock: &ManualClock) {
            crate::scope!("leaf");
            clock.advance(2);
        }

        for _ in 0..2 {
            crate::scope!("frame");
            clock.advance(1);
            leaf(&clock);
        }

        let mut events = vec![];
        Registry::global().drain(slot, &mut events);
        let seen: Vec<_> = events.iter().map(|e| (e.name.as_str(), e.depth)).collect();
        assert_eq!(
            seen,
            [("frame", 1), ("leaf", 2), ("frame", 1), ("leaf", 2)]
        );
        assert_eq!(events[0].duration_ticks, 3);
        assert_eq!(with_capture(|c| c.depth()), 0);

        stop_capture_for_this_thread();
        assert!(!is_capturing());
        assert!(Registry::global().ring(slot).is_none());
    })
    .join()
    .unwrap();
}

#[test]
fn test_local_scope_outlives_registration() {
    thread::spawn(|| {
        init_capture_for_this_thread(8, "first");
        let span = allocate_span();
        let guard = scope(span, "stale");
        assert!(guard.is_recording());

        stop_capture_for_this_thread();
        init_capture_for_this_thread(8, "second");
        // Must not close a span of the new registration.
        drop(guard);
        assert_eq!(with_capture(|c| c.depth()), 0);

        let span = allocate_span();
        assert!(begin(span, "fresh"));
        end(span);
        stop_capture_for_this_thread();
    })
    .join()
    .unwrap();
}

#[test]
#[should_panic(expected = "already initialized")]
fn test_double_init() {
    init_capture_for_this_thread(9, "twice");
    init_capture_for_this_thread(9, "twice");
}
