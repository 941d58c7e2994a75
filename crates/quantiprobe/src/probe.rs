//! Synthetic profiling run over a [`RingChannel`].
//!
//! The calling thread produces timestamped [`ProfileEvent`]s as fast as it
//! can, dropping whatever does not fit; a spawned consumer thread drains
//! them and measures send-to-receive latency in cycles. Shutdown goes
//! through an external done flag, since the channel has no closed state.

use crate::{Backoff, Consumer, CycleClock, IdleStrategy, ProbeConfig, ProbeError, RingChannel};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Record carried through the channel during a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileEvent {
    pub id: u32,
    /// [`CycleClock::now`] at send time
    pub timestamp: u64,
}

/// Outcome of a probe run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeReport {
    /// Events the producer attempted to send
    pub total: u64,
    pub received: u64,
    /// Sends rejected because the channel was full
    pub dropped: u64,
    /// Received events whose id was not greater than the previous one.
    /// Always zero for a correct FIFO channel.
    pub out_of_order: u64,
    /// From the start of production until the consumer finished draining
    pub elapsed: Duration,
    pub latency_cycles_sum: u128,
    pub latency_cycles_max: u64,
    /// Counter frequency the latencies were measured with
    pub frequency: u64,
}

impl ProbeReport {
    /// Percentage of sends that were dropped.
    pub fn drop_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.dropped as f64 / self.total as f64 * 100.0
    }

    /// Received events per second, in millions.
    pub fn throughput_mops(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.received as f64 / secs / 1e6
    }

    /// Mean send-to-receive latency.
    pub fn mean_latency(&self) -> Duration {
        if self.received == 0 {
            return Duration::ZERO;
        }
        let mean_cycles = self.latency_cycles_sum / u128::from(self.received);
        self.cycles_to_duration(mean_cycles)
    }

    /// Worst send-to-receive latency.
    pub fn max_latency(&self) -> Duration {
        self.cycles_to_duration(u128::from(self.latency_cycles_max))
    }

    fn cycles_to_duration(&self, cycles: u128) -> Duration {
        let nanos = cycles * 1_000_000_000 / u128::from(self.frequency.max(1));
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Benchmark Results ---")?;
        writeln!(f, "Total Ops    : {}", self.total)?;
        writeln!(f, "Received     : {}", self.received)?;
        writeln!(f, "Dropped      : {} ({:.2}%)", self.dropped, self.drop_rate())?;
        writeln!(f, "Time Taken   : {:.6} seconds", self.elapsed.as_secs_f64())?;
        writeln!(f, "Throughput   : {:.2} M ops/sec", self.throughput_mops())?;
        writeln!(f, "Mean Latency : {:?}", self.mean_latency())?;
        write!(f, "Max Latency  : {:?}", self.max_latency())
    }
}

/// Counts kept by the consumer thread.
#[derive(Debug, Default)]
struct ConsumerStats {
    received: u64,
    out_of_order: u64,
    last_id: Option<u32>,
    latency_cycles_sum: u128,
    latency_cycles_max: u64,
}

impl ConsumerStats {
    #[inline]
    fn record(&mut self, event: ProfileEvent, now: u64) {
        let latency = CycleClock::elapsed(event.timestamp, now);
        self.received += 1;
        self.latency_cycles_sum += u128::from(latency);
        self.latency_cycles_max = self.latency_cycles_max.max(latency);
        if self.last_id.is_some_and(|last| event.id <= last) {
            self.out_of_order += 1;
        }
        self.last_id = Some(event.id);
    }
}

/// Runs one probe: produce `config.events` events on the calling thread and
/// consume them on a spawned thread.
pub fn run(config: &ProbeConfig) -> Result<ProbeReport, ProbeError> {
    if config.events == 0 {
        return Err(ProbeError::NoEvents);
    }
    if config.events > u64::from(u32::MAX) + 1 {
        return Err(ProbeError::EventIdOverflow {
            events: config.events,
        });
    }

    let (producer, consumer) = RingChannel::<ProfileEvent>::new(config.capacity)?.split();

    // Calibrate (where needed) before the clock starts.
    let frequency = CycleClock::frequency();

    log::info!(
        "probe starting: capacity={} events={} idle={}",
        config.capacity,
        config.events,
        config.idle
    );

    let done = Arc::new(AtomicBool::new(false));
    let consumer_done = Arc::clone(&done);
    let idle = config.idle;
    let consumer_handle = thread::spawn(move || drain(&consumer, &consumer_done, idle));

    let start = Instant::now();
    let mut dropped = 0u64;
    for i in 0..config.events {
        let event = ProfileEvent {
            id: i as u32,
            timestamp: CycleClock::now(),
        };
        if !producer.try_send(event) {
            dropped += 1;
        }
    }
    done.store(true, Ordering::Release);

    let stats = consumer_handle
        .join()
        .map_err(|_| ProbeError::ConsumerPanicked)?;
    let elapsed = start.elapsed();

    let report = ProbeReport {
        total: config.events,
        received: stats.received,
        dropped,
        out_of_order: stats.out_of_order,
        elapsed,
        latency_cycles_sum: stats.latency_cycles_sum,
        latency_cycles_max: stats.latency_cycles_max,
        frequency,
    };

    log::info!(
        "probe finished: received={} dropped={} ({:.2}%) in {:?}",
        report.received,
        report.dropped,
        report.drop_rate(),
        report.elapsed
    );
    if report.out_of_order > 0 {
        log::warn!("{} events arrived out of order", report.out_of_order);
    }

    Ok(report)
}

/// Consumer loop: receive until the producer is done and the channel is
/// drained.
fn drain(consumer: &Consumer<ProfileEvent>, done: &AtomicBool, idle: IdleStrategy) -> ConsumerStats {
    let mut stats = ConsumerStats::default();
    let mut backoff = Backoff::new();

    loop {
        // Read the flag before polling: if it was already set, every send
        // is visible and an empty poll means the channel is drained.
        let finished = done.load(Ordering::Acquire);
        match consumer.try_receive() {
            Some(event) => {
                stats.record(event, CycleClock::now());
                backoff.reset();
            }
            None if finished => break,
            None => idle.idle(&mut backoff),
        }
    }

    log::debug!("consumer drained {} events", stats.received);
    stats
}
