//! x86_64 port: saved-context layout, interrupt-mask primitives and
//! the legacy PIC/PIT drivers.
//!
//! Vector installation (IDT, GDT, trap gates) belongs to the boot
//! bring-up layer; this port supplies what the portable core consumes.

pub mod context;
pub mod pic;
pub mod pit;

pub use context::TrapContext;

/// Bootstrap processor. Secondary cores report their LAPIC-derived id
/// once SMP bring-up hands them over.
pub fn cpu_id() -> usize {
    0
}

pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    x86_64::instructions::interrupts::without_interrupts(f)
}

pub fn wait_for_interrupt() {
    x86_64::instructions::hlt();
}

/// Install the PIC and PIT and hook them into the portable registries.
pub fn init() {
    pic::init();
    pit::init();
}
