//! Process-management and system-call dispatch core.
//!
//! This crate owns the process table and its state machine, the
//! process-control trap dispatcher, interrupt/event delivery into
//! processes, and the architecture trap boundary. Virtual memory,
//! the boot path, and the console are external collaborators reached
//! through narrow interfaces (see `memory` and the `log` facade).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[cfg(all(target_arch = "aarch64", not(test)))]
extern crate rlibc;

pub mod arch;
pub mod config;
pub mod fault;
pub mod interrupts;
pub mod memory;
pub mod process;
pub mod syscall;
pub mod time;

#[cfg(test)]
mod tests;

use process::ProcessId;
use syscall::ApiError;

/// Bring up the portable core on the boot core.
///
/// The heap region comes from the boot path; everything else
/// (trap vectors, interrupt controller, timer device) is installed
/// by the architecture layer afterwards.
///
/// # Safety
///
/// `heap_start..heap_start + heap_len` must be unused, writable RAM.
pub unsafe fn init(heap_start: usize, heap_len: usize) {
    memory::heap::init(heap_start, heap_len);
    process::init();
    log::info!("process core initialized");
}

/// Install the idle process for `core` and make it current.
///
/// Must run once per core before the first trap can be taken on it.
pub fn init_core(core: usize, idle_entry: u64) -> Result<ProcessId, ApiError> {
    process::with_table(|table| table.init_core(core, idle_entry))
        .ok_or(ApiError::NotFound)?
}
