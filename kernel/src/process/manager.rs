//! Process manager: the shared table, the ready queue and the
//! round-robin scheduler.

use alloc::collections::{BTreeMap, VecDeque};
use core::sync::atomic::{AtomicU64, Ordering};

use super::process::{Process, ProcessEvent, ProcessEventKind, ProcessId, ProcessState};
use crate::config;
use crate::memory::{self, MemoryMap};
use crate::syscall::ApiError;
use crate::time::TimerInfo;

/// Owns every live process and the per-core current slots.
///
/// All mutation happens under the table lock with interrupts masked on
/// the mutating core (`process::with_table`), so the ready queue is
/// never observed half-updated.
pub struct ProcessManager {
    /// All processes indexed by PID.
    table: BTreeMap<ProcessId, Process>,

    /// Queue of ready processes. Idle processes never enter it.
    ready: VecDeque<ProcessId>,

    /// Process currently mapped to each core.
    current: [Option<ProcessId>; config::MAX_CORES],

    /// Per-core idle process, run when nothing else is ready.
    idle: [Option<ProcessId>; config::MAX_CORES],

    /// Single watcher per interrupt line; re-registration overwrites.
    irq_watchers: [Option<ProcessId>; config::MAX_IRQ_LINES],

    /// Next available PID. PIDs start at 1.
    next_pid: AtomicU64,
}

impl ProcessManager {
    pub fn new() -> Self {
        ProcessManager {
            table: BTreeMap::new(),
            ready: VecDeque::new(),
            current: [None; config::MAX_CORES],
            idle: [None; config::MAX_CORES],
            irq_watchers: [None; config::MAX_IRQ_LINES],
            next_pid: AtomicU64::new(1),
        }
    }

    /// The process mapped to `core`. `None` only before `init_core`.
    pub fn current(&self, core: usize) -> Option<ProcessId> {
        self.current.get(core).copied().flatten()
    }

    pub fn current_process(&self, core: usize) -> Option<&Process> {
        self.current(core).and_then(|pid| self.table.get(&pid))
    }

    pub fn current_process_mut(&mut self, core: usize) -> Option<&mut Process> {
        let pid = self.current(core)?;
        self.table.get_mut(&pid)
    }

    pub fn get(&self, pid: ProcessId) -> Option<&Process> {
        self.table.get(&pid)
    }

    pub fn get_mut(&mut self, pid: ProcessId) -> Option<&mut Process> {
        self.table.get_mut(&pid)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Allocate a fresh process starting at `entry` and queue it.
    pub fn create(
        &mut self,
        entry: u64,
        map: &MemoryMap,
        parent: Option<ProcessId>,
        privileged: bool,
    ) -> Result<ProcessId, ApiError> {
        if self.table.len() >= config::MAX_PROCESSES {
            return Err(ApiError::CapacityExceeded);
        }

        let pid = ProcessId::new(self.next_pid.fetch_add(1, Ordering::SeqCst));
        let addr_space = memory::create_address_space(map);
        let process = Process::new(pid, parent, privileged, entry, map, addr_space);

        self.ready.push_back(pid);
        self.table.insert(pid, process);

        log::info!("created process {} (entry {:#x})", pid.as_u64(), entry);
        Ok(pid)
    }

    /// Install the idle process for `core` and make it current.
    pub fn init_core(&mut self, core: usize, idle_entry: u64) -> Result<ProcessId, ApiError> {
        if core >= config::MAX_CORES {
            return Err(ApiError::InvalidArgument);
        }
        if self.table.len() >= config::MAX_PROCESSES {
            return Err(ApiError::CapacityExceeded);
        }

        let pid = ProcessId::new(self.next_pid.fetch_add(1, Ordering::SeqCst));
        let map = MemoryMap::user_default();
        let addr_space = memory::create_address_space(&map);
        let mut idle = Process::new(pid, None, true, idle_entry, &map, addr_space);
        idle.state = ProcessState::Running;

        self.table.insert(pid, idle);
        self.idle[core] = Some(pid);
        self.current[core] = Some(pid);

        log::info!("core {}: idle process {}", core, pid.as_u64());
        Ok(pid)
    }

    /// Tear down `pid` and release everything that referenced it:
    /// every process waiting on it resumes with `status`, its IRQ
    /// registrations are dropped, and any core pointing at it loses
    /// its current slot (to be refilled by `schedule`).
    pub fn remove(&mut self, pid: ProcessId, status: u64) -> Result<(), ApiError> {
        let mut removed = self.table.remove(&pid).ok_or(ApiError::NotFound)?;
        removed.state = ProcessState::Terminated;

        for (id, process) in self.table.iter_mut() {
            if process.wait_target() == Some(pid) {
                process.complete_wait(status);
                self.ready.push_back(*id);
            }
        }

        self.ready.retain(|&id| id != pid);
        for watcher in self.irq_watchers.iter_mut() {
            if *watcher == Some(pid) {
                *watcher = None;
            }
        }
        for slot in self.current.iter_mut() {
            if *slot == Some(pid) {
                *slot = None;
            }
        }

        log::info!("removed process {} (status {})", pid.as_u64(), status);
        // Dropping the block hands stacks and address space back to
        // the memory subsystem.
        drop(removed);
        Ok(())
    }

    /// Pick the next process for `core` and make it current.
    ///
    /// Round-robin over the ready queue: the departing process, if
    /// still runnable, goes to the tail; the head runs next. Falls
    /// back to the per-core idle process, so after `init_core` this
    /// never leaves the core without a current process.
    pub fn schedule(&mut self, core: usize) -> Option<ProcessId> {
        if let Some(prev) = self.current(core) {
            if self.idle.get(core).copied().flatten() != Some(prev) {
                if let Some(process) = self.table.get_mut(&prev) {
                    if process.state == ProcessState::Running {
                        process.state = ProcessState::Ready;
                        self.ready.push_back(prev);
                    }
                }
            } else if let Some(idle) = self.table.get_mut(&prev) {
                idle.state = ProcessState::Ready;
            }
        }

        // Skip queue entries that went stale: removed processes, or
        // processes that blocked after being queued.
        let next = loop {
            match self.ready.pop_front() {
                Some(id) => match self.table.get(&id) {
                    Some(p) if p.state == ProcessState::Ready => break Some(id),
                    _ => continue,
                },
                None => break None,
            }
        };

        let next = next.or_else(|| self.idle.get(core).copied().flatten())?;
        if let Some(process) = self.table.get_mut(&next) {
            process.state = ProcessState::Running;
        }
        self.current[core] = Some(next);
        Some(next)
    }

    /// Release every timed sleeper whose deadline has passed.
    /// Called from the timer tick path. Returns how many woke.
    pub fn wake_sleepers(&mut self, now: TimerInfo) -> usize {
        let mut woken = 0;
        for (id, process) in self.table.iter_mut() {
            if process.sleep_expired(now) {
                process.begin_sleep(None);
                process.state = ProcessState::Ready;
                self.ready.push_back(*id);
                woken += 1;
            }
        }
        woken
    }

    /// Force `pid` runnable, counting the wakeup (`Resume`).
    pub fn resume(&mut self, pid: ProcessId) -> Result<(), ApiError> {
        let process = self.table.get_mut(&pid).ok_or(ApiError::NotFound)?;
        if process.wakeup() {
            self.ready.push_back(pid);
        }
        Ok(())
    }

    /// Register `pid` as the watcher for interrupt `line`.
    pub fn watch_irq(&mut self, line: u64, pid: ProcessId) -> Result<(), ApiError> {
        let slot = self
            .irq_watchers
            .get_mut(line as usize)
            .ok_or(ApiError::InvalidArgument)?;
        *slot = Some(pid);
        log::debug!("irq {}: watched by process {}", line, pid.as_u64());
        Ok(())
    }

    /// Deliver interrupt `line` to its watcher as a `ProcessEvent`.
    /// Returns true when a process received the event.
    pub fn raise_irq(&mut self, line: u8) -> bool {
        let Some(slot) = self.irq_watchers.get_mut(line as usize) else {
            return false;
        };
        let Some(pid) = *slot else {
            return false;
        };
        let Some(process) = self.table.get_mut(&pid) else {
            // Watcher exited without unregistering.
            *slot = None;
            return false;
        };
        let woke = process.raise_event(ProcessEvent {
            kind: ProcessEventKind::Interrupt,
            number: line as u64,
        });
        if woke {
            self.ready.push_back(pid);
        }
        true
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}
