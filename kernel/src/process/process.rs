//! Process control block and state machine.

use crossbeam_queue::ArrayQueue;

use crate::arch::TrapContext;
use crate::config;
use crate::memory::{AddressSpace, MemoryMap};
use crate::time::TimerInfo;

/// Process ID type. Assigned monotonically, never reused while the
/// process is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProcessId(u64);

impl ProcessId {
    pub const fn new(id: u64) -> Self {
        ProcessId(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Process scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ProcessState {
    /// Eligible to run, queued for the scheduler.
    Ready = 0,
    /// Current on some core.
    Running = 1,
    /// Blocked until another process exits.
    Waiting = 2,
    /// Blocked until a timer deadline or an explicit resume.
    Sleeping = 3,
    /// Exiting; the table slot is about to be reclaimed.
    Terminated = 4,
}

/// Kinds of events deliverable to a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessEventKind {
    Interrupt,
}

/// A pending event: delivered at most once, in raise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessEvent {
    pub kind: ProcessEventKind,
    pub number: u64,
}

/// Outcome of a checked sleep attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepResult {
    /// The process transitioned to Sleeping.
    Slept,
    /// A wakeup had already arrived; the process stays runnable.
    WakeupPending,
}

/// Read-only snapshot copied out to a caller-supplied buffer by the
/// `InfoPid` operation. A value copy, never a live reference.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo {
    pub id: u64,
    pub state: u32,
    pub user_stack: u64,
    pub kernel_stack: u64,
    pub page_directory: u64,
    /// Parent process ID, 0 for processes without one.
    pub parent: u64,
}

/// One control block per schedulable task.
pub struct Process {
    id: ProcessId,
    parent: Option<ProcessId>,
    privileged: bool,
    pub state: ProcessState,

    /// Saved register snapshot. Overwritten on every trap entry for
    /// this process, restored on every resume; authoritative only
    /// while the process is not running.
    pub context: TrapContext,

    user_stack: u64,
    kernel_stack: u64,
    addr_space: AddressSpace,

    /// Process this one is blocked on; `Some` iff state is Waiting.
    wait_on: Option<ProcessId>,

    /// Absolute wake deadline; `None` while sleeping without one.
    sleep_until: Option<TimerInfo>,

    /// Pending wakeups. A resume or interrupt may land before the
    /// process reaches its sleep check; the count must not be lost.
    wakeups: u32,

    events: ArrayQueue<ProcessEvent>,
}

impl Process {
    /// Build a Ready process executing from `entry` with the stacks
    /// and address space described by `map`.
    pub fn new(
        id: ProcessId,
        parent: Option<ProcessId>,
        privileged: bool,
        entry: u64,
        map: &MemoryMap,
        addr_space: AddressSpace,
    ) -> Self {
        let user_stack = map.user_stack.top();
        Process {
            id,
            parent,
            privileged,
            state: ProcessState::Ready,
            context: TrapContext::user_init(entry, user_stack),
            user_stack,
            kernel_stack: map.kernel_stack.top(),
            addr_space,
            wait_on: None,
            sleep_until: None,
            wakeups: 0,
            events: ArrayQueue::new(config::EVENT_QUEUE_DEPTH),
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn parent(&self) -> Option<ProcessId> {
        self.parent
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    pub fn addr_space(&self) -> AddressSpace {
        self.addr_space
    }

    pub fn user_stack(&self) -> u64 {
        self.user_stack
    }

    /// Overwrite the user stack pointer, both in the bookkeeping and
    /// in the saved context so the change takes effect on resume.
    pub fn set_user_stack(&mut self, sp: u64) {
        self.user_stack = sp;
        self.context.set_user_stack(sp);
    }

    pub fn wait_target(&self) -> Option<ProcessId> {
        self.wait_on
    }

    pub fn sleep_deadline(&self) -> Option<TimerInfo> {
        self.sleep_until
    }

    pub fn pending_wakeups(&self) -> u32 {
        self.wakeups
    }

    /// Value snapshot for `InfoPid`.
    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            id: self.id.as_u64(),
            state: self.state as u32,
            user_stack: self.user_stack,
            kernel_stack: self.kernel_stack,
            page_directory: self.addr_space.root(),
            parent: self.parent.map_or(0, ProcessId::as_u64),
        }
    }

    /// Append an event to the pending queue and wake the process.
    ///
    /// Returns true when the process left Sleeping and must be put
    /// back on the ready queue by the caller.
    pub fn raise_event(&mut self, event: ProcessEvent) -> bool {
        if self.events.push(event).is_err() {
            log::warn!("pid {}: event queue full, dropped {:?}", self.id.as_u64(), event);
        }
        self.wakeup()
    }

    /// Oldest undelivered event, removed from the queue.
    pub fn take_event(&mut self) -> Option<ProcessEvent> {
        self.events.pop()
    }

    /// Record a wakeup. Forces a Sleeping process back to Ready
    /// regardless of its deadline; otherwise only bumps the counter.
    ///
    /// Returns true when the process left Sleeping.
    pub fn wakeup(&mut self) -> bool {
        self.wakeups += 1;
        if self.state == ProcessState::Sleeping {
            self.sleep_until = None;
            self.state = ProcessState::Ready;
            true
        } else {
            false
        }
    }

    /// Unconditional sleep with an explicit deadline (`WaitTimer`).
    pub fn begin_sleep(&mut self, deadline: Option<TimerInfo>) {
        self.sleep_until = deadline;
        self.state = ProcessState::Sleeping;
    }

    /// Checked sleep (`EnterSleep`): consume pending wakeups instead
    /// of blocking when any have arrived.
    pub fn try_sleep(&mut self, deadline: Option<TimerInfo>) -> SleepResult {
        if self.wakeups > 0 {
            self.wakeups = 0;
            return SleepResult::WakeupPending;
        }
        self.begin_sleep(deadline);
        SleepResult::Slept
    }

    /// Block on `target`'s exit (`WaitPid`).
    pub fn begin_wait(&mut self, target: ProcessId) {
        self.wait_on = Some(target);
        self.state = ProcessState::Waiting;
    }

    /// Release a waiter: the awaited process exited with `status`.
    ///
    /// The status lands in the saved context's return register, so the
    /// waiter resumes from its `WaitPid` call observing it.
    pub fn complete_wait(&mut self, status: u64) {
        self.wait_on = None;
        self.context.set_return_value(status);
        self.state = ProcessState::Ready;
    }

    /// True when a timed sleep has expired at `now`.
    pub fn sleep_expired(&self, now: TimerInfo) -> bool {
        self.state == ProcessState::Sleeping
            && self.sleep_until.map_or(false, |deadline| deadline.is_due(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(id: u64) -> Process {
        Process::new(
            ProcessId::new(id),
            None,
            false,
            0x1000,
            &MemoryMap::user_default(),
            AddressSpace::new(7),
        )
    }

    #[test]
    fn new_process_is_ready_at_entry() {
        let p = process(1);
        assert_eq!(p.state, ProcessState::Ready);
        assert_eq!(p.context.instruction_pointer(), 0x1000);
        assert_eq!(p.context.user_stack(), MemoryMap::user_default().user_stack.top());
    }

    #[test]
    fn wakeup_before_sleep_is_not_lost() {
        let mut p = process(1);
        assert!(!p.wakeup());
        assert_eq!(p.try_sleep(None), SleepResult::WakeupPending);
        assert_eq!(p.state, ProcessState::Ready);
        assert_eq!(p.pending_wakeups(), 0);
    }

    #[test]
    fn checked_sleep_blocks_without_pending_wakeup() {
        let mut p = process(1);
        assert_eq!(p.try_sleep(None), SleepResult::Slept);
        assert_eq!(p.state, ProcessState::Sleeping);
        assert_eq!(p.sleep_deadline(), None);
    }

    #[test]
    fn wakeup_forces_sleeper_ready() {
        let mut p = process(1);
        let deadline = TimerInfo { ticks: 100, frequency: 250 };
        p.begin_sleep(Some(deadline));
        assert!(p.wakeup());
        assert_eq!(p.state, ProcessState::Ready);
        assert_eq!(p.sleep_deadline(), None);
    }

    #[test]
    fn events_deliver_in_raise_order() {
        let mut p = process(1);
        for n in 0..3 {
            p.raise_event(ProcessEvent { kind: ProcessEventKind::Interrupt, number: n });
        }
        assert_eq!(p.take_event().unwrap().number, 0);
        assert_eq!(p.take_event().unwrap().number, 1);
        assert_eq!(p.take_event().unwrap().number, 2);
        assert_eq!(p.take_event(), None);
    }

    #[test]
    fn event_queue_overflow_drops_newest() {
        let mut p = process(1);
        for n in 0..(config::EVENT_QUEUE_DEPTH as u64 + 4) {
            p.raise_event(ProcessEvent { kind: ProcessEventKind::Interrupt, number: n });
        }
        let mut delivered = 0;
        while let Some(event) = p.take_event() {
            assert_eq!(event.number, delivered);
            delivered += 1;
        }
        assert_eq!(delivered, config::EVENT_QUEUE_DEPTH as u64);
    }

    #[test]
    fn completed_wait_patches_return_register() {
        let mut p = process(1);
        p.begin_wait(ProcessId::new(9));
        assert_eq!(p.state, ProcessState::Waiting);
        assert_eq!(p.wait_target(), Some(ProcessId::new(9)));
        p.complete_wait(42);
        assert_eq!(p.state, ProcessState::Ready);
        assert_eq!(p.wait_target(), None);
        assert_eq!(p.context.return_value(), 42);
    }

    #[test]
    fn sleep_expiry_respects_deadline() {
        let mut p = process(1);
        p.begin_sleep(Some(TimerInfo { ticks: 10, frequency: 250 }));
        assert!(!p.sleep_expired(TimerInfo { ticks: 9, frequency: 250 }));
        assert!(p.sleep_expired(TimerInfo { ticks: 10, frequency: 250 }));
        // A sleep without deadline only ends via an explicit wakeup.
        let mut q = process(2);
        q.begin_sleep(None);
        assert!(!q.sleep_expired(TimerInfo { ticks: u64::MAX, frequency: 250 }));
    }

    #[test]
    fn set_user_stack_updates_saved_context() {
        let mut p = process(1);
        p.set_user_stack(0xdead_f000);
        assert_eq!(p.user_stack(), 0xdead_f000);
        assert_eq!(p.context.user_stack(), 0xdead_f000);
    }
}
