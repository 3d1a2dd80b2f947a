//! Interrupt routing between the controller, the timer and watching
//! processes.
//!
//! The controller itself (GIC, legacy PIC) lives in the architecture
//! layer; this module owns its registration and the portable half of
//! IRQ delivery: turning an acknowledged line into a `ProcessEvent`
//! on the process that asked for it via `WatchIrq`.

use conquer_once::spin::OnceCell;

use crate::process;

/// An interrupt controller, addressed by line number.
///
/// `enable`/`disable` must be idempotent: repeated calls with the same
/// line converge to the same controller state. Acknowledge/EOI are
/// architecture-internal and stay out of the portable surface.
pub trait InterruptController: Sync {
    fn enable(&self, line: u8);
    fn disable(&self, line: u8);
}

static CONTROLLER: OnceCell<&'static dyn InterruptController> = OnceCell::uninit();

/// Register the boot interrupt controller. A second registration is
/// ignored.
pub fn register_controller(controller: &'static dyn InterruptController) {
    if CONTROLLER.try_init_once(|| controller).is_err() {
        log::warn!("interrupt controller already registered");
    }
}

/// The registered controller, if bring-up installed one.
pub fn controller() -> Option<&'static dyn InterruptController> {
    CONTROLLER.get().copied()
}

/// Portable IRQ entry, called by the architecture vector once per
/// acknowledged line. Delivery is at-most-once and preserves raise
/// order per process; a line nobody watches is dropped quietly.
pub fn irq_occurred(line: u8) {
    let delivered = process::with_table(|table| table.raise_irq(line)).unwrap_or(false);
    if !delivered {
        log::trace!("irq {}: no watcher", line);
    }
}
