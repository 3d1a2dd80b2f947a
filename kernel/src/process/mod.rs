//! Process management.
//!
//! The process table is the only shared mutable structure in this
//! core. It lives behind a single spin lock that is only ever taken
//! with interrupts masked on the taking core, so a trap handler can
//! never deadlock against the code it interrupted.

use spin::Mutex;

pub mod manager;
pub mod process;

pub use manager::ProcessManager;
pub use process::{
    Process, ProcessEvent, ProcessEventKind, ProcessId, ProcessInfo, ProcessState, SleepResult,
};

use crate::arch;

/// Global process table.
pub static PROCESS_TABLE: Mutex<Option<ProcessManager>> = Mutex::new(None);

/// Initialize the process management system. Called once at kernel start.
pub fn init() {
    *PROCESS_TABLE.lock() = Some(ProcessManager::new());
    log::info!("process table initialized");
}

/// Run `f` on the shared table with interrupts masked on this core.
///
/// Returns `None` before `init` has run.
pub fn with_table<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut ProcessManager) -> R,
{
    arch::without_interrupts(|| {
        let mut guard = PROCESS_TABLE.lock();
        guard.as_mut().map(f)
    })
}

/// The process current on `core`, if the table is up.
pub fn current_pid(core: usize) -> Option<ProcessId> {
    with_table(|table| table.current(core)).flatten()
}
