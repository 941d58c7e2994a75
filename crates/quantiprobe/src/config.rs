use crate::IdleStrategy;

/// Configuration for a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Channel capacity in events (default: 1024)
    pub capacity: usize,
    /// Number of events the producer attempts to send (default: 1M)
    pub events: u64,
    /// What the consumer does when the channel is empty
    pub idle: IdleStrategy,
}

impl ProbeConfig {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: usize, events: u64, idle: IdleStrategy) -> Self {
        Self {
            capacity,
            events,
            idle,
        }
    }

    /// Sets the channel capacity.
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the number of events to send.
    pub const fn with_events(mut self, events: u64) -> Self {
        self.events = events;
        self
    }

    /// Sets the consumer idle strategy.
    pub const fn with_idle(mut self, idle: IdleStrategy) -> Self {
        self.idle = idle;
        self
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            events: 1_000_000,
            idle: IdleStrategy::Yield,
        }
    }
}

/// Low latency configuration (4K events, busy-spinning consumer)
pub const LOW_LATENCY_CONFIG: ProbeConfig = ProbeConfig::new(4096, 1_000_000, IdleStrategy::BusySpin);

/// High throughput configuration (64K events, adaptive backoff)
pub const HIGH_THROUGHPUT_CONFIG: ProbeConfig =
    ProbeConfig::new(65_536, 10_000_000, IdleStrategy::Backoff);
