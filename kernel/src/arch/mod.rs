//! Architecture selection and the portable CPU-control surface.
//!
//! Each port exports the same narrow contract: an opaque
//! [`TrapContext`] register snapshot with init/patch accessors, the
//! executing core's id, and an interrupt-mask guard. Portable code
//! never interprets individual registers.

#[cfg(target_arch = "aarch64")]
pub mod aarch64;
#[cfg(target_arch = "aarch64")]
use self::aarch64 as imp;

#[cfg(target_arch = "x86_64")]
pub mod x86_64;
#[cfg(target_arch = "x86_64")]
use self::x86_64 as imp;

pub use imp::TrapContext;

/// Identifier of the executing core, in `0..config::MAX_CORES`.
pub fn cpu_id() -> usize {
    imp::cpu_id()
}

/// Run `f` with interrupts masked on the calling core. The previous
/// mask state is restored afterwards, so nesting is fine.
#[cfg(not(test))]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    imp::without_interrupts(f)
}

/// The host test harness runs in user mode, where the mask
/// instructions are privileged; tests drive the table directly.
#[cfg(test)]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Park the core until the next interrupt.
pub fn wait_for_interrupt() {
    imp::wait_for_interrupt()
}
