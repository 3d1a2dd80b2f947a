//! Terminal handling for hardware faults.
//!
//! Faults taken from a process (undefined instruction, prefetch or
//! data abort) are not recoverable at this layer: the full saved CPU
//! state is logged and the process goes through the same removal path
//! as `KillPid`, releasing its waiters with a fault status.

use crate::process;
use crate::syscall::FAULT_EXIT_STATUS;

/// Exception classes the trap boundary reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    UndefinedInstruction,
    PrefetchAbort,
    DataAbort,
    Unknown,
}

/// Kill the faulting process on `core` and hand the core to the next
/// runnable one.
///
/// Returns false when no process was current; a fault taken before
/// per-core init is fatal to the kernel and left to the caller.
pub fn handle(core: usize, kind: FaultKind, address: u64) -> bool {
    process::with_table(|table| {
        let Some(pid) = table.current(core) else {
            return false;
        };
        if let Some(process) = table.get(pid) {
            log::error!(
                "pid {}: {:?} at {:#x}",
                pid.as_u64(),
                kind,
                address
            );
            log::error!("saved state: {:?}", process.context);
        }
        let _ = table.remove(pid, FAULT_EXIT_STATUS);
        table.schedule(core);
        true
    })
    .unwrap_or(false)
}
