//! Guest page alignment helpers.
//!
//! Guest addresses are always `u64`, regardless of the guest bitness.

/// Guest page size (4 KiB).
pub const PAGE_SIZE: u64 = 0x1000;

const PAGE_MASK: u64 = PAGE_SIZE - 1;

/// Checks if a guest address or size is a multiple of [`PAGE_SIZE`].
#[inline]
pub const fn is_page_aligned(value: u64) -> bool {
    value & PAGE_MASK == 0
}

/// Rounds `value` up to the next page boundary.
///
/// Returns `None` on overflow.
#[inline]
pub const fn round_up_to_page(value: u64) -> Option<u64> {
    match value.checked_add(PAGE_MASK) {
        Some(v) => Some(v & !PAGE_MASK),
        None => None,
    }
}
