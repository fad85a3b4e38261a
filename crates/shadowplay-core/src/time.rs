use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SimTime
// ---------------------------------------------------------------------------

/// Integer-nanosecond engine clock.
///
/// Tracks elapsed simulation time as a monotonically increasing `u64`
/// nanosecond count so that replaying the same `deltaTime` sequence yields
/// bit-identical timestamps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime {
    nanos: u64,
}

impl SimTime {
    /// Zero time.
    pub const ZERO: Self = Self { nanos: 0 };

    /// Create a `SimTime` from a raw nanosecond count.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Create a `SimTime` from seconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_secs(secs: f64) -> Self {
        Self {
            nanos: (secs.max(0.0) * 1_000_000_000.0) as u64,
        }
    }

    /// Raw nanosecond count.
    #[must_use]
    pub const fn nanos(&self) -> u64 {
        self.nanos
    }

    /// Elapsed milliseconds (truncated).
    #[must_use]
    pub const fn millis(&self) -> u64 {
        self.nanos / 1_000_000
    }

    /// Elapsed seconds as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn secs_f64(&self) -> f64 {
        self.nanos as f64 / 1_000_000_000.0
    }

    /// Advance the clock by a [`Duration`], saturating at `u64::MAX` nanoseconds.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn advance(&mut self, delta: Duration) {
        self.nanos = self.nanos.saturating_add(delta.as_nanos() as u64);
    }

    /// Reset to zero.
    pub const fn reset(&mut self) {
        self.nanos = 0;
    }
}

impl Add<Duration> for SimTime {
    type Output = Self;

    fn add(mut self, rhs: Duration) -> Self {
        self.advance(rhs);
        self
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        self.advance(rhs);
    }
}

impl Sub for SimTime {
    type Output = Duration;

    /// Saturating difference between two times.
    fn sub(self, rhs: Self) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(rhs.nanos))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.nanos / 1_000_000_000;
        let remaining_nanos = self.nanos % 1_000_000_000;
        let millis = remaining_nanos / 1_000_000;
        let micros = (remaining_nanos % 1_000_000) / 1_000;
        write!(f, "{total_secs}.{millis:03}{micros:03}s")
    }
}

// ---------------------------------------------------------------------------
// Cadence
// ---------------------------------------------------------------------------

/// Runs a slower stage every `stride` ticks of a faster one.
///
/// Used to evaluate IK at a fraction of the commit rate. Counting ticks
/// instead of accumulating floating-point time keeps the schedule exact:
/// the same tick index always lands on the same phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    stride: u32,
}

impl Cadence {
    /// Cadence that fires every `stride` ticks (`0` is treated as `1`).
    #[must_use]
    pub const fn new(stride: u32) -> Self {
        Self {
            stride: if stride == 0 { 1 } else { stride },
        }
    }

    /// Cadence for running a `slow_hz` stage inside a `fast_hz` loop.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_rates(fast_hz: f64, slow_hz: f64) -> Self {
        if slow_hz <= 0.0 || fast_hz <= slow_hz {
            return Self::new(1);
        }
        Self::new((fast_hz / slow_hz).round() as u32)
    }

    /// Ticks between two firings.
    #[must_use]
    pub const fn stride(&self) -> u32 {
        self.stride
    }

    /// Whether tick number `tick` (zero-based) fires the slow stage.
    #[must_use]
    pub const fn fires(&self, tick: u64) -> bool {
        tick % self.stride as u64 == 0
    }

    /// Ticks elapsed since the most recent firing at or before `tick`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn phase(&self, tick: u64) -> u32 {
        (tick % self.stride as u64) as u32
    }
}

// ---------------------------------------------------------------------------
// MonotonicClock
// ---------------------------------------------------------------------------

/// Source of monotonic wall-clock readings used for CPU budget accounting.
///
/// Readings are relative to an arbitrary origin; only differences matter.
pub trait MonotonicClock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// [`MonotonicClock`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
