//! EL1 exception vector table and the trap entry/exit contract.
//!
//! Every vector funnels through the same shape: the assembly stub
//! saves x0..x30, SP_EL0, ELR_EL1 and SPSR_EL1 into a stack frame laid
//! out exactly like [`TrapContext`], hands a pointer to the Rust
//! handler, and on return restores the (possibly rewritten) frame and
//! ERETs. A reschedule inside the handler therefore lands in a
//! different process simply by rewriting the frame.

use aarch64_cpu::registers::{ESR_EL1, FAR_EL1, VBAR_EL1};
use tock_registers::interfaces::{Readable, Writeable};

use super::context::TrapContext;
use super::{gic, timer};
use crate::fault::{self, FaultKind};
use crate::interrupts;
use crate::memory;
use crate::process::{self, ProcessId};
use crate::syscall::{self, encode, ApiError, ProcessOperation};

// ESR_EL1 exception classes handled here.
const EC_UNKNOWN: u64 = 0b000000;
const EC_SVC64: u64 = 0b010101;
const EC_IABORT_LOWER: u64 = 0b100000;
const EC_DABORT_LOWER: u64 = 0b100100;

core::arch::global_asm!(
    r#"
.macro TRAP_SAVE
    sub sp, sp, #272
    stp x0, x1, [sp, #0]
    stp x2, x3, [sp, #16]
    stp x4, x5, [sp, #32]
    stp x6, x7, [sp, #48]
    stp x8, x9, [sp, #64]
    stp x10, x11, [sp, #80]
    stp x12, x13, [sp, #96]
    stp x14, x15, [sp, #112]
    stp x16, x17, [sp, #128]
    stp x18, x19, [sp, #144]
    stp x20, x21, [sp, #160]
    stp x22, x23, [sp, #176]
    stp x24, x25, [sp, #192]
    stp x26, x27, [sp, #208]
    stp x28, x29, [sp, #224]
    mrs x9, sp_el0
    stp x30, x9, [sp, #240]
    mrs x9, elr_el1
    mrs x10, spsr_el1
    stp x9, x10, [sp, #256]
.endm

.macro TRAP_RESTORE
    ldp x9, x10, [sp, #256]
    msr elr_el1, x9
    msr spsr_el1, x10
    ldp x30, x9, [sp, #240]
    msr sp_el0, x9
    ldp x28, x29, [sp, #224]
    ldp x26, x27, [sp, #208]
    ldp x24, x25, [sp, #192]
    ldp x22, x23, [sp, #176]
    ldp x20, x21, [sp, #160]
    ldp x18, x19, [sp, #144]
    ldp x16, x17, [sp, #128]
    ldp x14, x15, [sp, #112]
    ldp x12, x13, [sp, #96]
    ldp x10, x11, [sp, #80]
    ldp x8, x9, [sp, #64]
    ldp x6, x7, [sp, #48]
    ldp x4, x5, [sp, #32]
    ldp x2, x3, [sp, #16]
    ldp x0, x1, [sp, #0]
    add sp, sp, #272
    eret
.endm

.section .text
.align 11
.global exception_vector_table
exception_vector_table:
    // Current EL with SP_EL0: never used at EL1.
    .align 7
    b vector_hang
    .align 7
    b vector_hang
    .align 7
    b vector_hang
    .align 7
    b vector_hang

    // Current EL with SP_ELx: kernel-mode exceptions.
    .align 7
    b el1_sync_entry
    .align 7
    b el1_irq_entry
    .align 7
    b vector_hang
    .align 7
    b vector_hang

    // Lower EL, AArch64: user-mode traps.
    .align 7
    b el0_sync_entry
    .align 7
    b el0_irq_entry
    .align 7
    b vector_hang
    .align 7
    b vector_hang

    // Lower EL, AArch32: unsupported.
    .align 7
    b vector_hang
    .align 7
    b vector_hang
    .align 7
    b vector_hang
    .align 7
    b vector_hang

el0_sync_entry:
    TRAP_SAVE
    mov x0, sp
    bl aarch64_sync_from_user
    TRAP_RESTORE

el0_irq_entry:
    TRAP_SAVE
    mov x0, sp
    bl aarch64_irq
    TRAP_RESTORE

el1_sync_entry:
    TRAP_SAVE
    mov x0, sp
    bl aarch64_sync_from_kernel
    TRAP_RESTORE

el1_irq_entry:
    TRAP_SAVE
    mov x0, sp
    bl aarch64_irq
    TRAP_RESTORE

vector_hang:
    wfe
    b vector_hang
"#
);

extern "C" {
    static exception_vector_table: u8;
}

/// Point VBAR_EL1 at the vector table.
pub fn install() {
    unsafe {
        VBAR_EL1.set(&exception_vector_table as *const u8 as u64);
    }
    aarch64_cpu::asm::barrier::isb(aarch64_cpu::asm::barrier::SY);
}

/// Snapshot the live frame into the current process.
fn trap_entry(core: usize, frame: &TrapContext) -> Option<ProcessId> {
    process::with_table(|table| {
        let pid = table.current(core)?;
        if let Some(p) = table.get_mut(pid) {
            p.context = *frame;
        }
        Some(pid)
    })
    .flatten()
}

/// Rewrite the frame from whichever process is now current, switching
/// address spaces when dispatch moved the core to a different one.
fn trap_exit(core: usize, frame: &mut TrapContext, entered: Option<ProcessId>) {
    process::with_table(|table| {
        let Some(pid) = table.current(core) else {
            return;
        };
        let Some(p) = table.get(pid) else {
            return;
        };
        *frame = p.context;
        if entered != Some(pid) {
            memory::activate(p.addr_space());
        }
    });
}

/// Synchronous exception from EL0: system call or process fault.
#[no_mangle]
extern "C" fn aarch64_sync_from_user(frame: *mut TrapContext) {
    let frame = unsafe { &mut *frame };
    let core = super::cpu_id();
    let esr = ESR_EL1.get();
    let ec = (esr >> 26) & 0x3f;
    let far = FAR_EL1.get();

    let entered = trap_entry(core, frame);

    match ec {
        EC_SVC64 => {
            let (op, pid, addr, output) = frame.syscall_args();
            match ProcessOperation::from_u64(op) {
                Some(op) => {
                    syscall::process_ctl(core, pid, op, addr, output);
                }
                None => {
                    log::warn!("unknown process operation {}", op);
                    process::with_table(|table| {
                        if let Some(p) = table.current_process_mut(core) {
                            p.context
                                .set_return_value(encode(Err(ApiError::InvalidArgument)));
                        }
                    });
                }
            }
        }
        EC_IABORT_LOWER => {
            fault::handle(core, FaultKind::PrefetchAbort, far);
        }
        EC_DABORT_LOWER => {
            fault::handle(core, FaultKind::DataAbort, far);
        }
        EC_UNKNOWN => {
            fault::handle(core, FaultKind::UndefinedInstruction, frame.elr_el1);
        }
        _ => {
            log::error!("unhandled exception class {:#x} (esr {:#x})", ec, esr);
            fault::handle(core, FaultKind::Unknown, frame.elr_el1);
        }
    }

    trap_exit(core, frame, entered);
}

/// Synchronous exception taken at EL1: a kernel bug, not recoverable.
#[no_mangle]
extern "C" fn aarch64_sync_from_kernel(frame: *mut TrapContext) {
    let frame = unsafe { &*frame };
    panic!(
        "kernel fault: esr={:#x} elr={:#x} far={:#x}",
        ESR_EL1.get(),
        frame.elr_el1,
        FAR_EL1.get()
    );
}

/// IRQ entry: drain the GIC, tick the timer, deliver watched lines.
#[no_mangle]
extern "C" fn aarch64_irq(frame: *mut TrapContext) {
    let frame = unsafe { &mut *frame };
    let core = super::cpu_id();
    let entered = trap_entry(core, frame);

    while let Some(irq) = gic::acknowledge() {
        if irq == timer::TIMER_IRQ as u32 {
            timer::timer_interrupt();
            process::with_table(|table| table.schedule(core));
        } else if irq <= u8::MAX as u32 {
            interrupts::irq_occurred(irq as u8);
        } else {
            log::warn!("irq {} out of watchable range", irq);
        }
        gic::end_of_interrupt(irq);
    }

    trap_exit(core, frame, entered);
}
