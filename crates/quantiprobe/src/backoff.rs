use std::fmt;
use std::hint;
use std::str::FromStr;
use std::thread;

/// What a caller does after a failed `try_send` or `try_receive`.
///
/// The channel itself never waits; these are the caller-side policies the
/// probe harness (and the benchmark binary) choose between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleStrategy {
    /// Spin with a PAUSE/YIELD hint. Lowest latency, burns a core.
    BusySpin,
    /// Give the time slice back to the OS on every miss.
    #[default]
    Yield,
    /// Spin with exponentially more hints, then fall back to yielding.
    Backoff,
}

impl IdleStrategy {
    /// Performs one idle step.
    ///
    /// `backoff` carries the state for [`IdleStrategy::Backoff`] and is
    /// ignored by the other strategies. Call [`Backoff::reset`] after each
    /// successful poll.
    #[inline]
    pub fn idle(self, backoff: &mut Backoff) {
        match self {
            Self::BusySpin => hint::spin_loop(),
            Self::Yield => thread::yield_now(),
            Self::Backoff => backoff.snooze(),
        }
    }

    /// Name accepted by [`FromStr`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BusySpin => "spin",
            Self::Yield => "yield",
            Self::Backoff => "backoff",
        }
    }
}

impl fmt::Display for IdleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown idle strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown idle strategy {0:?} (expected spin, yield or backoff)")]
pub struct ParseIdleStrategyError(String);

impl FromStr for IdleStrategy {
    type Err = ParseIdleStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spin" | "busy-spin" => Ok(Self::BusySpin),
            "yield" => Ok(Self::Yield),
            "backoff" => Ok(Self::Backoff),
            _ => Err(ParseIdleStrategyError(s.to_owned())),
        }
    }
}

/// Exponential spin-then-yield backoff (Crossbeam-style).
///
/// Unlike a blocking wait this never gives up: after the spin phase every
/// step yields, and the caller decides when to stop polling.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 hints per step before yielding

    /// Creates a backoff that starts with the shortest spin.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Waits a little longer than last time.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..1u32 << self.step {
                hint::spin_loop();
            }
            self.step += 1;
        } else {
            thread::yield_now();
        }
    }

    /// Returns true once the spin phase is over and every snooze yields.
    #[inline]
    pub fn is_yielding(&self) -> bool {
        self.step > Self::SPIN_LIMIT
    }

    /// Starts over from the shortest spin.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
