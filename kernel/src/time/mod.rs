//! Timer service: the system tick, time snapshots and sleep deadlines.

mod tick;

pub use tick::{monotonic_ms, ticks};

use conquer_once::spin::OnceCell;

use crate::config;
use crate::process;

/// Snapshot of the system timer.
///
/// Used both to report "now" and to express sleep deadlines. `ticks`
/// counts timer interrupts at `frequency` Hz. `#[repr(C)]` because it
/// is copied across the user boundary by `InfoTimer`/`WaitTimer`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerInfo {
    pub ticks: u64,
    pub frequency: u32,
}

impl TimerInfo {
    /// True once `now` has caught up with this deadline.
    pub fn is_due(&self, now: TimerInfo) -> bool {
        now.ticks >= self.ticks
    }

    /// Deadline `ms` milliseconds after this snapshot.
    pub fn after_ms(&self, ms: u64) -> TimerInfo {
        TimerInfo {
            ticks: self.ticks + ms * self.frequency as u64 / 1000,
            frequency: self.frequency,
        }
    }
}

/// A system timer device.
///
/// One device registers at boot. Its interrupt handler is expected to
/// call [`timer_interrupt`] once per tick; `current` reports the
/// resulting counter.
pub trait TimerDevice: Sync {
    fn current(&self) -> TimerInfo;
}

static TIMER: OnceCell<&'static dyn TimerDevice> = OnceCell::uninit();

/// Register the boot timer device. A second registration is ignored.
pub fn register_device(device: &'static dyn TimerDevice) {
    if TIMER.try_init_once(|| device).is_err() {
        log::warn!("timer device already registered");
    }
}

/// The registered timer device, if any. `InfoTimer` reports `NotFound`
/// when this is `None`; the kernel itself keeps running.
pub fn device() -> Option<&'static dyn TimerDevice> {
    TIMER.get().copied()
}

/// Tick-counter-backed timer device.
///
/// Architecture timers program their hardware to fire at
/// [`config::TIMER_HZ`] and register this; snapshots then read the
/// shared tick counter.
pub struct SystemTick;

impl TimerDevice for SystemTick {
    fn current(&self) -> TimerInfo {
        TimerInfo {
            ticks: tick::ticks(),
            frequency: config::TIMER_HZ,
        }
    }
}

pub static SYSTEM_TICK: SystemTick = SystemTick;

/// Per-tick bookkeeping, invoked from the architecture timer vector:
/// advance the counter and release sleepers whose deadline passed.
pub fn timer_interrupt() {
    let now = TimerInfo {
        ticks: tick::advance(),
        frequency: config::TIMER_HZ,
    };
    process::with_table(|table| table.wake_sleepers(now));
}
