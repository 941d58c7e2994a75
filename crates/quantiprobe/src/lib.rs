//! quantiprobe - Wait-Free SPSC Event Channel and Cycle Clock
//!
//! Moves fixed-size profiling events from one producer thread to one
//! consumer thread without locks, without allocating after construction,
//! and without blocking either side. Events are timestamped with the raw
//! hardware cycle counter.
//!
//! # Key Features
//!
//! - Fixed `capacity + 1` slot arena, two cursors, modular indexing
//! - Acquire/release cursors as the only synchronization
//! - Cache-padded cursors (no producer/consumer false sharing)
//! - Drop-on-full / drop-on-empty: `try_send` and `try_receive` never wait
//! - `cntvct_el0` / `rdtsc` cycle clock with a portable fallback
//!
//! The channel is deliberately lossy. A full channel rejects the event and
//! the caller counts it as dropped; there is no backpressure and no
//! delivery guarantee.
//!
//! # Example
//!
//! ```
//! use quantiprobe::{CycleClock, RingChannel};
//! use std::thread;
//!
//! let (tx, rx) = RingChannel::<u64>::new(1024).unwrap().split();
//!
//! let producer = thread::spawn(move || {
//!     let mut dropped = 0;
//!     for _ in 0..1000 {
//!         if !tx.try_send(CycleClock::now()) {
//!             dropped += 1;
//!         }
//!     }
//!     dropped
//! });
//!
//! let dropped = producer.join().unwrap();
//! let mut received = 0;
//! while let Some(sent_at) = rx.try_receive() {
//!     let _latency = CycleClock::to_duration(CycleClock::elapsed(sent_at, CycleClock::now()));
//!     received += 1;
//! }
//! assert_eq!(received + dropped, 1000);
//! ```

mod backoff;
mod channel;
mod clock;
mod config;
mod error;
pub mod probe;
mod sync;

pub use backoff::{Backoff, IdleStrategy, ParseIdleStrategyError};
pub use channel::{Consumer, Producer, RingChannel};
pub use clock::CycleClock;
pub use config::{ProbeConfig, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use error::{ChannelError, ProbeError};
pub use probe::{ProbeReport, ProfileEvent};
