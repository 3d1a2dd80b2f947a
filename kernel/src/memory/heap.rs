//! Kernel heap bootstrap.
//!
//! The process table and event queues allocate from this heap. The
//! backing region is handed over once by the boot path.

use linked_list_allocator::LockedHeap;

#[cfg_attr(not(test), global_allocator)]
#[cfg_attr(test, allow(dead_code))]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Hand the allocator its backing region.
///
/// # Safety
///
/// The region must be unused, writable RAM and must not be passed in
/// twice.
pub unsafe fn init(start: usize, len: usize) {
    // The host test harness allocates from std; the kernel heap is
    // only wired up on bare-metal builds.
    #[cfg(not(test))]
    ALLOCATOR.lock().init(start as *mut u8, len);

    let _ = (start, len);
    log::info!("kernel heap: {} KiB at {:#x}", len / 1024, start);
}
