//! Send-time resolution and clocks.
//!
//! All times are milliseconds in the same domain as inbound arrival
//! timestamps. A time that is not strictly in the future resolves to
//! [`SendTime::Now`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// When a message should leave the port.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SendTime {
    #[default]
    Now,
    At(f64),
}

impl SendTime {
    /// The absolute time, substituting `now` for [`SendTime::Now`].
    #[inline]
    pub fn or_now(self, now: f64) -> f64 {
        match self {
            SendTime::Now => now,
            SendTime::At(t) => t,
        }
    }
}

/// A requested send time before resolution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TimeSpec {
    #[default]
    Now,
    /// Delay in milliseconds from now.
    Relative(f64),
    /// Absolute timestamp in milliseconds.
    Absolute(f64),
}

impl From<&str> for TimeSpec {
    /// `"+N"` is a delay, a plain number an absolute time, anything else now.
    fn from(s: &str) -> Self {
        let s = s.trim();
        if let Some(delay) = s.strip_prefix('+') {
            return delay.parse().map(TimeSpec::Relative).unwrap_or(TimeSpec::Now);
        }
        s.parse().map(TimeSpec::Absolute).unwrap_or(TimeSpec::Now)
    }
}

impl From<f64> for TimeSpec {
    fn from(t: f64) -> Self {
        TimeSpec::Absolute(t)
    }
}

impl From<Option<f64>> for TimeSpec {
    fn from(t: Option<f64>) -> Self {
        t.map(TimeSpec::Absolute).unwrap_or(TimeSpec::Now)
    }
}

/// Resolves a requested time against the current clock reading.
pub fn resolve(spec: TimeSpec, now: f64) -> SendTime {
    match spec {
        TimeSpec::Now => SendTime::Now,
        TimeSpec::Relative(delay) if delay > 0.0 => SendTime::At(now + delay),
        TimeSpec::Relative(_) => SendTime::Now,
        TimeSpec::Absolute(t) if t > now => SendTime::At(t),
        TimeSpec::Absolute(_) => SendTime::Now,
    }
}

/// Millisecond time source shared by inbound timestamps and outbound scheduling.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Monotonic clock counting milliseconds since it was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
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

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ms: f64) -> Self {
        Self {
            bits: AtomicU64::new(now_ms.to_bits()),
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.bits.store(now_ms.to_bits(), Ordering::Release);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.set(self.now_ms() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}
