//! Saved register state for the AArch64 trap path.

/// Complete register snapshot of an interrupted context.
///
/// The layout is shared with the assembly save/restore macros in
/// `vectors`: x0..x30 first, then SP_EL0, ELR_EL1 and SPSR_EL1. Do
/// not rearrange.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TrapContext {
    /// General-purpose registers x0..x30.
    pub gpr: [u64; 31],
    /// User stack pointer.
    pub sp_el0: u64,
    /// Resume address.
    pub elr_el1: u64,
    /// Saved program status.
    pub spsr_el1: u64,
}

/// SPSR for a fresh EL0t context: all interrupts unmasked.
const SPSR_EL0T: u64 = 0;

impl TrapContext {
    /// Initial state for a process entering user mode at `entry`.
    pub fn user_init(entry: u64, user_stack: u64) -> Self {
        TrapContext {
            elr_el1: entry,
            sp_el0: user_stack,
            spsr_el1: SPSR_EL0T,
            ..TrapContext::default()
        }
    }

    /// Patch the trap return register.
    pub fn set_return_value(&mut self, value: u64) {
        self.gpr[0] = value;
    }

    pub fn return_value(&self) -> u64 {
        self.gpr[0]
    }

    pub fn instruction_pointer(&self) -> u64 {
        self.elr_el1
    }

    pub fn user_stack(&self) -> u64 {
        self.sp_el0
    }

    pub fn set_user_stack(&mut self, sp: u64) {
        self.sp_el0 = sp;
    }

    /// Decode `(operation, pid, addr, output)` from x0..x3.
    pub fn syscall_args(&self) -> (u64, u64, u64, u64) {
        (self.gpr[0], self.gpr[1], self.gpr[2], self.gpr[3])
    }
}
