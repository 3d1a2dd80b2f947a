//! Shared fixtures: a process table wired to mock devices.

use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use crate::config;
use crate::interrupts::InterruptController;
use crate::memory::MemoryMap;
use crate::process::{ProcessId, ProcessManager};
use crate::syscall::{Devices, Dispatch, ProcessOperation};
use crate::time::{TimerDevice, TimerInfo};

/// Timer device with a hand-cranked counter.
pub struct MockTimer {
    ticks: AtomicU64,
    frequency: u32,
}

impl MockTimer {
    pub fn new(frequency: u32) -> Self {
        MockTimer { ticks: AtomicU64::new(0), frequency }
    }

    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    pub fn now(&self) -> TimerInfo {
        TimerInfo {
            ticks: self.ticks.load(Ordering::Relaxed),
            frequency: self.frequency,
        }
    }
}

impl TimerDevice for MockTimer {
    fn current(&self) -> TimerInfo {
        self.now()
    }
}

/// Interrupt controller that records per-line mask state.
pub struct MockIntc {
    enabled: Mutex<[bool; config::MAX_IRQ_LINES]>,
}

impl MockIntc {
    pub fn new() -> Self {
        MockIntc { enabled: Mutex::new([false; config::MAX_IRQ_LINES]) }
    }

    pub fn is_enabled(&self, line: u8) -> bool {
        self.enabled.lock()[line as usize]
    }
}

impl InterruptController for MockIntc {
    fn enable(&self, line: u8) {
        self.enabled.lock()[line as usize] = true;
    }

    fn disable(&self, line: u8) {
        self.enabled.lock()[line as usize] = false;
    }
}

/// A table with core 0 initialized, plus mock devices.
pub struct Fixture {
    pub procs: ProcessManager,
    pub timer: MockTimer,
    pub intc: MockIntc,
    pub idle: ProcessId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut procs = ProcessManager::new();
        let idle = procs.init_core(0, 0).unwrap();
        Fixture {
            procs,
            timer: MockTimer::new(config::TIMER_HZ),
            intc: MockIntc::new(),
            idle,
        }
    }

    /// New ready process with no parent.
    pub fn spawn(&mut self) -> ProcessId {
        self.procs
            .create(0x1000, &MemoryMap::user_default(), None, false)
            .unwrap()
    }

    /// Dispatch one operation on core 0 against the mock devices.
    pub fn dispatch(
        &mut self,
        pid_arg: u64,
        op: ProcessOperation,
        addr: u64,
        output: u64,
    ) -> Dispatch {
        let devices = Devices {
            timer: Some(&self.timer),
            intc: Some(&self.intc),
        };
        crate::syscall::dispatcher::process_ctl_on(
            &mut self.procs,
            &devices,
            0,
            pid_arg,
            op,
            addr,
            output,
        )
    }

    /// Dispatch with no devices registered at all.
    pub fn dispatch_deviceless(
        &mut self,
        pid_arg: u64,
        op: ProcessOperation,
        addr: u64,
        output: u64,
    ) -> Dispatch {
        let devices = Devices { timer: None, intc: None };
        crate::syscall::dispatcher::process_ctl_on(
            &mut self.procs,
            &devices,
            0,
            pid_arg,
            op,
            addr,
            output,
        )
    }
}
