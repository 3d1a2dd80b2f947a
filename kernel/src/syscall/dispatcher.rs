//! The process-control dispatcher.
//!
//! Every software trap lands here. The target process is resolved
//! before any operation-specific logic runs; an unresolvable ID fails
//! the whole call with `NotFound` and mutates nothing.
//!
//! Results are written into the *caller's* saved context, not the
//! live registers: by the time the trap returns, `schedule()` may
//! have handed the core to a different process. Blocking operations
//! (`WaitPid`, `WaitTimer`, `EnterSleep`) suspend the caller and
//! return [`Dispatch::Suspended`]; the caller resumes inside the same
//! logical call once its saved context, return value patched, is
//! restored.

use super::userptr;
use super::{encode, ApiError, ApiResult, ProcessOperation, SELF_PID};

use crate::config;
use crate::interrupts::{self, InterruptController};
use crate::memory::MemoryMap;
use crate::process::{self, Process, ProcessId, ProcessManager, SleepResult};
use crate::time::{self, TimerDevice, TimerInfo};

/// External devices the dispatcher consults. Collected from the boot
/// registries on the trap path; tests supply their own.
#[derive(Clone, Copy)]
pub struct Devices<'a> {
    pub timer: Option<&'a dyn TimerDevice>,
    pub intc: Option<&'a dyn InterruptController>,
}

impl Devices<'static> {
    /// The devices registered during bring-up.
    pub fn registered() -> Self {
        Devices {
            timer: time::device(),
            intc: interrupts::controller(),
        }
    }
}

/// Outcome of one dispatch, as seen by the trap boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The encoded result, already written to the caller's saved
    /// context.
    Completed(u64),
    /// The caller was suspended (or destroyed). Its saved context is
    /// completed elsewhere, or never if it was removed.
    Suspended,
}

/// Trap-path entry point: lock the table and dispatch.
pub fn process_ctl(
    core: usize,
    pid_arg: u64,
    op: ProcessOperation,
    addr: u64,
    output: u64,
) -> Dispatch {
    let devices = Devices::registered();
    process::with_table(|table| process_ctl_on(table, &devices, core, pid_arg, op, addr, output))
        .unwrap_or(Dispatch::Completed(encode(Err(ApiError::NotFound))))
}

/// Dispatch one operation against an explicit table and device set.
pub fn process_ctl_on(
    procs: &mut ProcessManager,
    devices: &Devices<'_>,
    core: usize,
    pid_arg: u64,
    op: ProcessOperation,
    addr: u64,
    output: u64,
) -> Dispatch {
    let Some(caller) = procs.current(core) else {
        return Dispatch::Completed(encode(Err(ApiError::NotFound)));
    };

    log::debug!(
        "#{} {:?} -> {} ({:#x})",
        caller.as_u64(),
        op,
        pid_arg as i64,
        addr
    );

    // Resolve the target before any operation-specific logic.
    let needs_target = !matches!(op, ProcessOperation::Spawn | ProcessOperation::GetPid);
    let target = if !needs_target || pid_arg == SELF_PID {
        caller
    } else {
        let id = ProcessId::new(pid_arg);
        if procs.get(id).is_none() {
            return finish(procs, caller, Err(ApiError::NotFound));
        }
        id
    };

    match op {
        ProcessOperation::Spawn => {
            let map = MemoryMap::user_default();
            let result = procs
                .create(addr, &map, Some(caller), false)
                .map(ProcessId::as_u64);
            finish(procs, caller, result)
        }

        ProcessOperation::KillPid => {
            // `addr` carries the exit status.
            if let Err(e) = procs.remove(target, addr) {
                return finish(procs, caller, Err(e));
            }
            procs.schedule(core);
            if target == caller {
                Dispatch::Suspended
            } else {
                finish(procs, caller, Ok(0))
            }
        }

        ProcessOperation::GetPid => finish(procs, caller, Ok(caller.as_u64())),

        ProcessOperation::GetParent => {
            let parent = procs
                .get(caller)
                .and_then(Process::parent)
                .map_or(0, ProcessId::as_u64);
            finish(procs, caller, Ok(parent))
        }

        ProcessOperation::Schedule => {
            procs.schedule(core);
            finish(procs, caller, Ok(0))
        }

        ProcessOperation::Resume => {
            let result = procs.resume(target).map(|_| 0);
            finish(procs, caller, result)
        }

        ProcessOperation::WatchIrq => {
            let result = procs.watch_irq(addr, target).map(|_| 0);
            finish(procs, caller, result)
        }

        ProcessOperation::EnableIrq | ProcessOperation::DisableIrq => {
            let result = match devices.intc {
                Some(intc) if addr < config::MAX_IRQ_LINES as u64 => {
                    if op == ProcessOperation::EnableIrq {
                        intc.enable(addr as u8);
                    } else {
                        intc.disable(addr as u8);
                    }
                    Ok(0)
                }
                Some(_) => Err(ApiError::InvalidArgument),
                None => Err(ApiError::NotFound),
            };
            finish(procs, caller, result)
        }

        ProcessOperation::InfoPid => {
            let result = procs
                .get(target)
                .map(Process::info)
                .ok_or(ApiError::NotFound)
                .and_then(|info| userptr::write_user(output, info).map(|_| 0));
            finish(procs, caller, result)
        }

        ProcessOperation::WaitPid => {
            match procs.get_mut(caller) {
                Some(p) => p.begin_wait(target),
                None => return finish(procs, caller, Err(ApiError::NotFound)),
            }
            procs.schedule(core);
            // The exit status lands in the caller's saved context when
            // the target is removed.
            Dispatch::Suspended
        }

        ProcessOperation::InfoTimer => {
            let result = match devices.timer {
                Some(timer) => userptr::write_user(output, timer.current()).map(|_| 0),
                None => Err(ApiError::NotFound),
            };
            finish(procs, caller, result)
        }

        ProcessOperation::WaitTimer => {
            let deadline: TimerInfo = match userptr::read_user(addr) {
                Ok(d) => d,
                Err(e) => return finish(procs, caller, Err(e)),
            };
            if let Some(p) = procs.get_mut(caller) {
                p.begin_sleep(Some(deadline));
                p.context.set_return_value(encode(Ok(0)));
            }
            procs.schedule(core);
            Dispatch::Suspended
        }

        ProcessOperation::EnterSleep => {
            let deadline = if addr == 0 {
                None
            } else {
                match userptr::read_user(addr) {
                    Ok(d) => Some(d),
                    Err(e) => return finish(procs, caller, Err(e)),
                }
            };
            let slept = match procs.get_mut(caller) {
                Some(p) => {
                    let outcome = p.try_sleep(deadline);
                    if outcome == SleepResult::Slept {
                        p.context.set_return_value(encode(Ok(0)));
                    }
                    outcome
                }
                None => return finish(procs, caller, Err(ApiError::NotFound)),
            };
            match slept {
                SleepResult::WakeupPending => finish(procs, caller, Ok(0)),
                SleepResult::Slept => {
                    procs.schedule(core);
                    Dispatch::Suspended
                }
            }
        }

        ProcessOperation::SetStack => {
            let result = procs
                .get_mut(target)
                .map(|p| {
                    p.set_user_stack(addr);
                    0
                })
                .ok_or(ApiError::NotFound);
            finish(procs, caller, result)
        }
    }
}

/// Write the encoded result into the caller's saved context.
fn finish(procs: &mut ProcessManager, caller: ProcessId, result: ApiResult) -> Dispatch {
    let word = encode(result);
    if let Some(p) = procs.get_mut(caller) {
        p.context.set_return_value(word);
    }
    Dispatch::Completed(word)
}
