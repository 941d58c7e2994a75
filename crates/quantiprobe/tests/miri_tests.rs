//! Miri-compatible tests for detecting undefined behavior.
//!
//! Run with: `cargo +nightly miri test --test miri_tests`
//!
//! These exercise the unsafe slot accesses in `RingChannel` with small
//! counts so Miri finishes quickly: uninitialized reads, double drops,
//! leaks of values left in the channel, and data races across the split
//! endpoints.

#![cfg(not(feature = "loom"))]

use quantiprobe::RingChannel;
use std::rc::Rc;
use std::thread;

/// Send and receive heap-owning values through several wraps.
#[test]
fn miri_channel_wrap_around() {
    let channel = RingChannel::<Box<u32>>::new(3).unwrap();

    for round in 0..4u32 {
        for i in 0..3 {
            assert!(channel.try_send(Box::new(round * 10 + i)));
        }
        assert!(!channel.try_send(Box::new(99)));
        for i in 0..3 {
            assert_eq!(channel.try_receive().as_deref(), Some(&(round * 10 + i)));
        }
        assert!(channel.try_receive().is_none());
    }
}

/// Values still queued are dropped exactly once with the channel.
#[test]
fn miri_drop_leftovers() {
    let witness = Rc::new(());
    {
        let channel = RingChannel::<Rc<()>>::new(4).unwrap();
        for _ in 0..4 {
            assert!(channel.try_send(Rc::clone(&witness)));
        }
        // Rejected value is dropped on the spot.
        assert!(!channel.try_send(Rc::clone(&witness)));
        assert_eq!(Rc::strong_count(&witness), 5);

        drop(channel.try_receive());
        assert_eq!(Rc::strong_count(&witness), 4);
    }
    assert_eq!(Rc::strong_count(&witness), 1);
}

/// Zero-sized payloads still respect capacity.
#[test]
fn miri_zero_sized_type() {
    let channel = RingChannel::<()>::new(2).unwrap();
    assert!(channel.try_send(()));
    assert!(channel.try_send(()));
    assert!(!channel.try_send(()));
    assert_eq!(channel.try_receive(), Some(()));
    assert_eq!(channel.try_receive(), Some(()));
    assert_eq!(channel.try_receive(), None);
}

/// Split endpoints on two threads; Miri's race detector checks the slot
/// handoff.
#[test]
fn miri_split_threads() {
    let (tx, rx) = RingChannel::<String>::new(2).unwrap().split();

    let producer = thread::spawn(move || {
        let mut sent = 0;
        while sent < 20 {
            if tx.try_send(format!("event-{sent}")) {
                sent += 1;
            } else {
                thread::yield_now();
            }
        }
    });

    let mut next = 0;
    while next < 20 {
        match rx.try_receive() {
            Some(s) => {
                assert_eq!(s, format!("event-{next}"));
                next += 1;
            }
            None => thread::yield_now(),
        }
    }

    producer.join().unwrap();
}

/// Endpoints dropped on different threads with items still queued.
#[test]
fn miri_drop_endpoints_on_different_threads() {
    let (tx, rx) = RingChannel::<Vec<u8>>::new(4).unwrap().split();
    assert!(tx.try_send(vec![1, 2, 3]));
    assert!(tx.try_send(vec![4]));

    let consumer = thread::spawn(move || {
        assert_eq!(rx.try_receive(), Some(vec![1, 2, 3]));
    });
    consumer.join().unwrap();
    drop(tx);
}
