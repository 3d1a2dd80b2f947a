//! Interfaces to the memory subsystem.
//!
//! Page tables, frame allocation and TLB maintenance are owned by the
//! memory collaborator; this core only carries opaque handles and the
//! layout descriptor handed to process creation.

pub mod heap;

use core::sync::atomic::{AtomicU64, Ordering};

use crate::config;

/// Opaque page-directory handle for a process address space.
///
/// Produced by the memory subsystem, referenced by exactly one process,
/// and released when that process is removed. The scheduler never
/// interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace(u64);

impl AddressSpace {
    pub const fn new(root: u64) -> Self {
        AddressSpace(root)
    }

    /// Raw page-directory root, as reported in process info snapshots.
    pub fn root(self) -> u64 {
        self.0
    }
}

/// A contiguous virtual region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub base: u64,
    pub size: u64,
}

impl Region {
    /// One past the highest address; initial stack pointers start here.
    pub fn top(self) -> u64 {
        self.base + self.size
    }
}

/// Virtual-memory layout for a new process.
#[derive(Debug, Clone, Copy)]
pub struct MemoryMap {
    pub user_code: Region,
    pub user_heap: Region,
    pub user_stack: Region,
    pub kernel_stack: Region,
}

impl MemoryMap {
    /// Default layout for user processes spawned through the dispatcher.
    pub fn user_default() -> Self {
        MemoryMap {
            user_code: Region { base: 0x1000_0000, size: 16 * 1024 * 1024 },
            user_heap: Region { base: 0x2000_0000, size: 16 * 1024 * 1024 },
            user_stack: Region { base: 0x8000_0000, size: config::USER_STACK_SIZE },
            kernel_stack: Region {
                base: 0xffff_8000_0000_0000,
                size: config::KERNEL_STACK_SIZE,
            },
        }
    }
}

static NEXT_SPACE: AtomicU64 = AtomicU64::new(1);

/// Ask the memory subsystem for an address space laid out per `map`.
///
/// The page-table construction itself happens on the other side of this
/// seam; the returned handle is all this core ever sees.
pub fn create_address_space(_map: &MemoryMap) -> AddressSpace {
    AddressSpace::new(NEXT_SPACE.fetch_add(1, Ordering::SeqCst))
}

/// Make `space` the active address space on the calling core.
///
/// Called by the trap boundary when the restored process differs from
/// the trapped one. Root switching and TLB maintenance live with the
/// memory collaborator.
pub fn activate(space: AddressSpace) {
    log::trace!("activate address space {:#x}", space.root());
}
