//! Global monotonic tick counter.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::config;

static TICKS: AtomicU64 = AtomicU64::new(0);

/// Advance by one tick and return the new count.
#[inline]
pub fn advance() -> u64 {
    TICKS.fetch_add(1, Ordering::Relaxed) + 1
}

/// Raw tick counter.
#[inline]
pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}

/// Milliseconds since the timer started ticking. Monotonic.
#[inline]
pub fn monotonic_ms() -> u64 {
    ticks() * 1000 / config::TIMER_HZ as u64
}
