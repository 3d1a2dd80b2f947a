//! Saved register state for the x86_64 software-trap path.

/// Complete register snapshot of an interrupted context.
///
/// Field order matches the trap entry stub's push sequence followed by
/// the CPU-pushed interrupt frame; the layout is part of the contract
/// with the assembly side and must not be rearranged.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TrapContext {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    // CPU-pushed interrupt frame.
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// Ring 3 code selector in the boot GDT.
const USER_CODE_SELECTOR: u64 = 0x33;
/// Ring 3 data selector in the boot GDT.
const USER_DATA_SELECTOR: u64 = 0x2b;
/// RFLAGS with IF set: interrupts enabled, everything else clear.
const RFLAGS_IF: u64 = 0x202;

impl TrapContext {
    /// Initial state for a process entering user mode at `entry`.
    pub fn user_init(entry: u64, user_stack: u64) -> Self {
        TrapContext {
            rip: entry,
            cs: USER_CODE_SELECTOR,
            rflags: RFLAGS_IF,
            rsp: user_stack,
            ss: USER_DATA_SELECTOR,
            ..TrapContext::default()
        }
    }

    /// Patch the trap return register.
    pub fn set_return_value(&mut self, value: u64) {
        self.rax = value;
    }

    pub fn return_value(&self) -> u64 {
        self.rax
    }

    pub fn instruction_pointer(&self) -> u64 {
        self.rip
    }

    pub fn user_stack(&self) -> u64 {
        self.rsp
    }

    pub fn set_user_stack(&mut self, sp: u64) {
        self.rsp = sp;
    }

    /// Decode `(operation, pid, addr, output)` from the software-trap
    /// argument registers.
    pub fn syscall_args(&self) -> (u64, u64, u64, u64) {
        (self.rax, self.rdi, self.rsi, self.rdx)
    }
}
