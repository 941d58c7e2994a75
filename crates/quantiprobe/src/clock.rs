//! Hardware cycle counter access.
//!
//! [`CycleClock::now`] reads the cheapest monotonic counter the target
//! offers and [`CycleClock::frequency`] reports its rate, so deltas can be
//! turned into wall-clock time:
//!
//! | target        | counter               | frequency                    |
//! |---------------|-----------------------|------------------------------|
//! | aarch64       | `cntvct_el0`          | `cntfrq_el0`                 |
//! | x86_64        | `rdtsc`               | calibrated once at first use |
//! | other unix    | `CLOCK_MONOTONIC_RAW` | 1 GHz (nanoseconds)          |
//! | anything else | `Instant` since epoch | 1 GHz (nanoseconds)          |
//!
//! Readings are non-decreasing on one thread as long as it stays on one
//! core. After a migration between cores, counters that are not
//! synchronized across cores can step back slightly.

use std::time::Duration;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Stateless access to the platform cycle counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleClock;

impl CycleClock {
    /// Returns the current counter value.
    #[inline(always)]
    pub fn now() -> u64 {
        platform::read_counter()
    }

    /// Returns the counter rate in ticks per second. Never zero.
    #[inline]
    pub fn frequency() -> u64 {
        platform::counter_frequency().max(1)
    }

    /// Ticks between two readings, zero if `end` precedes `start`.
    #[inline]
    pub fn elapsed(start: u64, end: u64) -> u64 {
        end.saturating_sub(start)
    }

    /// Converts a tick count to nanoseconds.
    #[inline]
    pub fn to_nanos(ticks: u64) -> u64 {
        let nanos = u128::from(ticks) * u128::from(NANOS_PER_SEC) / u128::from(Self::frequency());
        u64::try_from(nanos).unwrap_or(u64::MAX)
    }

    /// Converts a tick count to a [`Duration`].
    #[inline]
    pub fn to_duration(ticks: u64) -> Duration {
        Duration::from_nanos(Self::to_nanos(ticks))
    }
}

#[cfg(target_arch = "aarch64")]
mod platform {
    #[inline(always)]
    pub(super) fn read_counter() -> u64 {
        let ticks: u64;
        // SAFETY: cntvct_el0 is readable from EL0 on every aarch64 OS we
        // target and the read has no side effects.
        unsafe {
            std::arch::asm!("mrs {}, cntvct_el0", out(reg) ticks, options(nomem, nostack));
        }
        ticks
    }

    #[inline]
    pub(super) fn counter_frequency() -> u64 {
        let freq: u64;
        // SAFETY: cntfrq_el0 is readable from EL0 and the read has no side
        // effects.
        unsafe {
            std::arch::asm!("mrs {}, cntfrq_el0", out(reg) freq, options(nomem, nostack));
        }
        freq
    }
}

#[cfg(target_arch = "x86_64")]
mod platform {
    use std::sync::OnceLock;
    use std::time::{Duration, Instant};

    const CALIBRATION_WINDOW: Duration = Duration::from_millis(10);

    static TSC_FREQUENCY: OnceLock<u64> = OnceLock::new();

    #[inline(always)]
    pub(super) fn read_counter() -> u64 {
        // SAFETY: rdtsc is available on every x86_64 CPU and has no side
        // effects.
        unsafe { core::arch::x86_64::_rdtsc() }
    }

    /// The TSC has no architectural frequency register; measure it against
    /// the OS monotonic clock once and cache the result.
    pub(super) fn counter_frequency() -> u64 {
        *TSC_FREQUENCY.get_or_init(calibrate)
    }

    fn calibrate() -> u64 {
        for _ in 0..10 {
            read_counter();
        }

        let start_instant = Instant::now();
        let start_ticks = read_counter();
        while start_instant.elapsed() < CALIBRATION_WINDOW {
            std::hint::spin_loop();
        }
        let end_ticks = read_counter();
        let elapsed = start_instant.elapsed();

        let ticks = u128::from(end_ticks.saturating_sub(start_ticks));
        let nanos = elapsed.as_nanos().max(1);
        let freq = u64::try_from(ticks * u128::from(super::NANOS_PER_SEC) / nanos).unwrap_or(u64::MAX);

        log::debug!(
            "tsc calibrated: {:.3} GHz over {:?}",
            freq as f64 / 1e9,
            elapsed
        );
        freq
    }
}

#[cfg(all(unix, not(any(target_arch = "aarch64", target_arch = "x86_64"))))]
mod platform {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    const CLOCK: libc::clockid_t = libc::CLOCK_MONOTONIC_RAW;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const CLOCK: libc::clockid_t = libc::CLOCK_MONOTONIC;

    #[inline]
    pub(super) fn read_counter() -> u64 {
        // SAFETY: all-zero is a valid timespec, and `ts` is writable for
        // clock_gettime. A monotonic clock id cannot fail on a supported
        // platform; on failure `ts` stays zeroed.
        let ts = unsafe {
            let mut ts: libc::timespec = std::mem::zeroed();
            libc::clock_gettime(CLOCK, &mut ts);
            ts
        };
        (ts.tv_sec as u64)
            .saturating_mul(super::NANOS_PER_SEC)
            .saturating_add(ts.tv_nsec as u64)
    }

    #[inline]
    pub(super) fn counter_frequency() -> u64 {
        super::NANOS_PER_SEC
    }
}

#[cfg(not(any(unix, target_arch = "aarch64", target_arch = "x86_64")))]
mod platform {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();

    #[inline]
    pub(super) fn read_counter() -> u64 {
        let epoch = EPOCH.get_or_init(Instant::now);
        u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    #[inline]
    pub(super) fn counter_frequency() -> u64 {
        super::NANOS_PER_SEC
    }
}
