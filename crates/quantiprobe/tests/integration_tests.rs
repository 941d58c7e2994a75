#![cfg(not(feature = "loom"))]

use quantiprobe::{
    probe, ChannelError, CycleClock, IdleStrategy, ProbeConfig, ProbeError, ProfileEvent, RingChannel,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_capacity_bound() {
    const N: usize = 8;
    let channel = RingChannel::<usize>::new(N).unwrap();

    for i in 0..N {
        assert!(channel.try_send(i), "send {} should fit in capacity {}", i, N);
    }
    assert!(!channel.try_send(N), "send past capacity must fail");
    assert_eq!(channel.len(), N);

    assert_eq!(channel.try_receive(), Some(0));
    assert!(channel.try_send(N), "one receive frees exactly one slot");
    assert!(!channel.try_send(N + 1));
}

#[test]
fn test_empty_bound() {
    let channel = RingChannel::<u64>::new(16).unwrap();
    assert_eq!(channel.try_receive(), None);

    for i in 0..5 {
        assert!(channel.try_send(i));
    }
    for _ in 0..5 {
        assert!(channel.try_receive().is_some());
    }
    assert_eq!(channel.try_receive(), None, "drained channel must read empty");
}

#[test]
fn test_fifo_ordering_single_thread() {
    let channel = RingChannel::<u64>::new(100).unwrap();

    const N: u64 = 10_000;
    let mut expected = 0;

    // Interleave bursts of sends and receives so the cursors wrap many times.
    let mut next = 0;
    while expected < N {
        for _ in 0..37 {
            if next < N && channel.try_send(next) {
                next += 1;
            }
        }
        while let Some(item) = channel.try_receive() {
            assert_eq!(item, expected, "FIFO violation: expected {}, got {}", expected, item);
            expected += 1;
        }
    }

    assert_eq!(expected, N);
    assert!(channel.is_empty());
}

#[test]
fn test_no_loss_under_respected_capacity() {
    const CAPACITY: usize = 32;
    const ROUNDS: u64 = 1_000;

    let (tx, rx) = RingChannel::<u64>::new(CAPACITY).unwrap().split();
    let (ack_tx, ack_rx) = RingChannel::<()>::new(1).unwrap().split();

    // Producer sends one full channel's worth per round and waits for the
    // consumer to acknowledge the drain before the next round.
    let producer = thread::spawn(move || {
        for round in 0..ROUNDS {
            for i in 0..CAPACITY as u64 {
                assert!(tx.try_send(round * CAPACITY as u64 + i), "lossless send failed");
            }
            while ack_rx.try_receive().is_none() {
                thread::yield_now();
            }
        }
    });

    let mut expected = 0u64;
    for _ in 0..ROUNDS {
        let mut got = 0;
        while got < CAPACITY {
            match rx.try_receive() {
                Some(item) => {
                    assert_eq!(item, expected);
                    expected += 1;
                    got += 1;
                }
                None => thread::yield_now(),
            }
        }
        assert!(ack_tx.try_send(()));
    }

    producer.join().unwrap();
    assert_eq!(expected, ROUNDS * CAPACITY as u64);
    assert_eq!(rx.try_receive(), None);
}

#[test]
fn test_drop_accounting_under_overproduction() {
    const TOTAL: u64 = 200_000;

    let (tx, rx) = RingChannel::<u64>::new(8).unwrap().split();
    let done = Arc::new(AtomicBool::new(false));
    let consumer_done = Arc::clone(&done);

    // Slow consumer: yields between receives so the producer overruns it.
    let consumer = thread::spawn(move || {
        let mut received = Vec::new();
        loop {
            let finished = consumer_done.load(Ordering::Acquire);
            match rx.try_receive() {
                Some(item) => {
                    received.push(item);
                    thread::yield_now();
                }
                None if finished => break,
                None => thread::yield_now(),
            }
        }
        received
    });

    let mut accepted = Vec::new();
    let mut rejected = 0u64;
    for i in 0..TOTAL {
        if tx.try_send(i) {
            accepted.push(i);
        } else {
            rejected += 1;
        }
    }
    done.store(true, Ordering::Release);

    let received = consumer.join().unwrap();

    assert_eq!(accepted.len() as u64 + rejected, TOTAL);
    assert_eq!(received, accepted, "exactly the accepted values, in order");

    let unique: HashSet<_> = received.iter().collect();
    assert_eq!(unique.len(), received.len(), "no value received twice");
}

#[test]
fn test_profile_events_across_threads() {
    let (tx, rx) = RingChannel::<ProfileEvent>::new(1024).unwrap().split();

    let producer = thread::spawn(move || {
        let mut sent = 0u32;
        while sent < 10_000 {
            let event = ProfileEvent {
                id: sent,
                timestamp: CycleClock::now(),
            };
            if tx.try_send(event) {
                sent += 1;
            } else {
                std::hint::spin_loop();
            }
        }
    });

    let mut next_id = 0u32;
    while next_id < 10_000 {
        if let Some(event) = rx.try_receive() {
            assert_eq!(event.id, next_id);
            next_id += 1;
        }
    }
    producer.join().unwrap();
}

#[test]
fn test_clock_measures_sleep() {
    let start = CycleClock::now();
    thread::sleep(Duration::from_millis(20));
    let end = CycleClock::now();

    assert!(end >= start);
    let measured = CycleClock::to_duration(CycleClock::elapsed(start, end));
    assert!(measured >= Duration::from_millis(15), "measured {:?}", measured);
    assert!(measured < Duration::from_secs(2), "measured {:?}", measured);
}

#[test]
fn test_probe_run_each_idle_strategy() {
    for idle in [IdleStrategy::BusySpin, IdleStrategy::Yield, IdleStrategy::Backoff] {
        let report = probe::run(&ProbeConfig::new(64, 20_000, idle)).unwrap();
        assert_eq!(report.received + report.dropped, 20_000, "idle={}", idle);
        assert_eq!(report.out_of_order, 0, "idle={}", idle);
        assert!(report.received > 0, "idle={}", idle);
    }
}

#[test]
fn test_unaddressable_capacity_is_a_config_error() {
    for capacity in [usize::MAX, usize::MAX - 1, usize::MAX / 4] {
        let err = RingChannel::<ProfileEvent>::new(capacity).unwrap_err();
        assert_eq!(err, ChannelError::CapacityOverflow { requested: capacity });

        let err = probe::run(&ProbeConfig::default().with_capacity(capacity)).unwrap_err();
        assert_eq!(err, ProbeError::Channel(ChannelError::CapacityOverflow { requested: capacity }));
        assert!(err.is_config_error());
    }
}
