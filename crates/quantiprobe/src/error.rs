//! Error types for channel construction and probe runs.
//!
//! Full and empty are not errors: `try_send` and `try_receive` report them
//! through `bool` and `Option`.

use thiserror::Error;

/// Errors returned when constructing a [`RingChannel`](crate::RingChannel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A channel must hold at least one element.
    #[error("channel capacity must be at least 1")]
    ZeroCapacity,

    /// `capacity + 1` slots cannot be addressed or allocated.
    #[error("channel capacity {requested} is too large")]
    CapacityOverflow { requested: usize },
}

/// Errors that abort a [`probe::run`](crate::probe::run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The channel could not be built from the probe configuration.
    #[error("channel setup failed: {0}")]
    Channel(#[from] ChannelError),

    /// A probe with zero events measures nothing.
    #[error("probe must send at least one event")]
    NoEvents,

    /// Event ids are `u32`; the run would reuse ids.
    #[error("{events} events exceed the u32 event id space")]
    EventIdOverflow { events: u64 },

    /// The consumer thread panicked before reporting its counts.
    #[error("consumer thread panicked")]
    ConsumerPanicked,
}

impl ProbeError {
    /// Returns `true` if the error comes from the configuration rather than
    /// from the run itself.
    #[inline]
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::ConsumerPanicked)
    }
}
