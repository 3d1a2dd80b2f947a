//! ARM generic timer (virtual timer, PPI 27) as the system timer.

use core::sync::atomic::{AtomicU64, Ordering};

use aarch64_cpu::registers::{CNTFRQ_EL0, CNTV_CTL_EL0, CNTV_TVAL_EL0};
use tock_registers::interfaces::{Readable, Writeable};

use super::gic;
use crate::config;
use crate::time;

/// EL1 virtual timer PPI.
pub const TIMER_IRQ: u8 = 27;

/// Counter cycles between ticks, derived from CNTFRQ at init.
static INTERVAL: AtomicU64 = AtomicU64::new(0);

/// Program the virtual timer to fire at [`config::TIMER_HZ`] and
/// register the tick-backed timer device.
pub fn init() {
    let freq = CNTFRQ_EL0.get();
    let interval = freq / config::TIMER_HZ as u64;
    INTERVAL.store(interval, Ordering::Relaxed);

    CNTV_TVAL_EL0.set(interval);
    CNTV_CTL_EL0.write(CNTV_CTL_EL0::ENABLE::SET + CNTV_CTL_EL0::IMASK::CLEAR);
    gic::enable_line(TIMER_IRQ);

    time::register_device(&time::SYSTEM_TICK);
    log::info!(
        "generic timer at {} Hz (counter {} Hz)",
        config::TIMER_HZ,
        freq
    );
}

/// Per-tick work for the IRQ vector: rearm the compare value, advance
/// the clock and wake expired sleepers.
pub fn timer_interrupt() {
    CNTV_TVAL_EL0.set(INTERVAL.load(Ordering::Relaxed));
    time::timer_interrupt();
}
