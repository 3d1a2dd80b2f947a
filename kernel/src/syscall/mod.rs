//! Process-control trap interface.
//!
//! A single software-trap entry point multiplexes the closed set of
//! process operations. The ABI is one operation code, a target PID and
//! two machine words; the result comes back as a single word in the
//! caller's return register (non-negative payload on success, a
//! negative [`ApiError`] code on failure).

pub mod dispatcher;
pub mod userptr;

pub use dispatcher::{process_ctl, Devices, Dispatch};

/// Target PID meaning "the calling process".
pub const SELF_PID: u64 = u64::MAX;

/// Exit status recorded when a process is killed by a hardware fault.
pub const FAULT_EXIT_STATUS: u64 = 0xff;

/// Operations of the process-control trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum ProcessOperation {
    Spawn = 0,
    KillPid = 1,
    GetPid = 2,
    GetParent = 3,
    Schedule = 4,
    Resume = 5,
    WatchIrq = 6,
    EnableIrq = 7,
    DisableIrq = 8,
    InfoPid = 9,
    WaitPid = 10,
    InfoTimer = 11,
    WaitTimer = 12,
    EnterSleep = 13,
    SetStack = 14,
}

impl ProcessOperation {
    /// Decode an operation code from the trap registers.
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Spawn),
            1 => Some(Self::KillPid),
            2 => Some(Self::GetPid),
            3 => Some(Self::GetParent),
            4 => Some(Self::Schedule),
            5 => Some(Self::Resume),
            6 => Some(Self::WatchIrq),
            7 => Some(Self::EnableIrq),
            8 => Some(Self::DisableIrq),
            9 => Some(Self::InfoPid),
            10 => Some(Self::WaitPid),
            11 => Some(Self::InfoTimer),
            12 => Some(Self::WaitTimer),
            13 => Some(Self::EnterSleep),
            14 => Some(Self::SetStack),
            _ => None,
        }
    }
}

/// Error kinds observable through the trap return register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ApiError {
    /// Unresolved process ID, or a missing device.
    NotFound = -1,
    /// Process table full.
    CapacityExceeded = -2,
    /// Malformed operation argument.
    InvalidArgument = -3,
    /// Rejected user pointer.
    BadAddress = -4,
}

/// Result of one operation: a non-negative payload or an error code.
pub type ApiResult = Result<u64, ApiError>;

/// Fold a result into the single-word wire encoding.
pub fn encode(result: ApiResult) -> u64 {
    match result {
        Ok(value) => value,
        Err(error) => error as i64 as u64,
    }
}
