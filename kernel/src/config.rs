//! Compile-time tunables for the process core.

/// Capacity of the process table, idle processes included.
pub const MAX_PROCESSES: usize = 1024;

/// Number of cores the table tracks a current process for.
pub const MAX_CORES: usize = 4;

/// Interrupt lines the watch table covers.
pub const MAX_IRQ_LINES: usize = 64;

/// Depth of each process's pending-event queue. Events raised while
/// the queue is full are dropped with a warning.
pub const EVENT_QUEUE_DEPTH: usize = 32;

/// Default user stack size in bytes.
pub const USER_STACK_SIZE: u64 = 64 * 1024;

/// Kernel stack size per process in bytes.
pub const KERNEL_STACK_SIZE: u64 = 16 * 1024;

/// Nominal system timer rate in Hz. One tick is 4 ms.
pub const TIMER_HZ: u32 = 250;
