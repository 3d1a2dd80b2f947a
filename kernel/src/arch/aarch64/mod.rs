//! AArch64 port: the reference trap boundary.
//!
//! EL0 runs user processes; every exception enters the EL1 vector
//! table in `vectors`, which captures the full register snapshot
//! before any portable logic runs and restores whichever process is
//! current afterwards.

pub mod context;
pub mod gic;
pub mod timer;
pub mod vectors;

pub use context::TrapContext;

use aarch64_cpu::registers::{DAIF, MPIDR_EL1};
use tock_registers::interfaces::{Readable, ReadWriteable, Writeable};

/// Core id from MPIDR affinity 0.
pub fn cpu_id() -> usize {
    (MPIDR_EL1.get() & 0b11) as usize
}

pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let saved = DAIF.get();
    DAIF.modify(DAIF::I::Masked);
    let ret = f();
    DAIF.set(saved);
    ret
}

pub fn wait_for_interrupt() {
    aarch64_cpu::asm::wfi();
}

/// Install vectors, the GIC and the generic timer on the boot core.
pub fn init() {
    vectors::install();
    gic::init();
    timer::init();
    log::info!("aarch64 trap boundary installed");
}
