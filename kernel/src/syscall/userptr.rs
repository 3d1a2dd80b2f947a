//! Checked user-pointer access for the Info*/WaitTimer operations.
//!
//! Full user/kernel isolation is enforced by the memory subsystem's
//! mappings; this layer rejects what it can see locally (null,
//! misaligned and kernel-half addresses) before dereferencing.

use super::ApiError;

/// Userspace ends at the canonical split; anything at or above it is
/// kernel territory.
const USER_SPACE_END: u64 = 0x0000_8000_0000_0000;

fn check<T>(addr: u64) -> Result<(), ApiError> {
    let size = core::mem::size_of::<T>() as u64;
    let align = core::mem::align_of::<T>() as u64;

    if addr == 0 || addr % align != 0 {
        return Err(ApiError::BadAddress);
    }
    if addr
        .checked_add(size)
        .map_or(true, |end| end > USER_SPACE_END)
    {
        return Err(ApiError::BadAddress);
    }
    Ok(())
}

/// Copy a value in from a user-supplied address.
pub fn read_user<T: Copy>(addr: u64) -> Result<T, ApiError> {
    check::<T>(addr)?;
    Ok(unsafe { core::ptr::read(addr as *const T) })
}

/// Copy a value out to a user-supplied address.
pub fn write_user<T>(addr: u64, value: T) -> Result<(), ApiError> {
    check::<T>(addr)?;
    unsafe { core::ptr::write(addr as *mut T, value) };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_null_and_kernel_addresses() {
        assert_eq!(read_user::<u64>(0), Err(ApiError::BadAddress));
        assert_eq!(read_user::<u64>(USER_SPACE_END), Err(ApiError::BadAddress));
        assert_eq!(
            read_user::<u64>(USER_SPACE_END - 4),
            Err(ApiError::BadAddress)
        );
    }

    #[test]
    fn rejects_misaligned_addresses() {
        let value: u64 = 5;
        let addr = &value as *const u64 as u64;
        assert_eq!(read_user::<u64>(addr + 1), Err(ApiError::BadAddress));
    }

    #[test]
    fn round_trips_through_a_live_buffer() {
        let mut slot: u64 = 0;
        let addr = &mut slot as *mut u64 as u64;
        write_user(addr, 0xabcd_u64).unwrap();
        assert_eq!(slot, 0xabcd);
        assert_eq!(read_user::<u64>(addr).unwrap(), 0xabcd);
    }
}
