//! Guest thread stack memory.
//!
//! A guest thread owns exactly one [`StackRegion`], obtained from a
//! [`StackAllocator`] when the thread is created and never reallocated.
//! Stacks grow downward: the initial stack pointer is [`StackRegion::top`].
//!
//! # Memory Layout
//!
//! [`BumpStackAllocator`] carves regions out of a fixed guest address range,
//! leaving an unallocated guard gap below every stack:
//!
//! ```text
//! start                                                       end
//! ┌───────┬──────────────┬───────┬──────────────┬─────────────┐
//! │ guard │ stack 0      │ guard │ stack 1      │ free ...    │
//! └───────┴──────────────┴───────┴──────────────┴─────────────┘
//!          ^base      top^
//! ```

use crate::alignment::{PAGE_SIZE, is_page_aligned, round_up_to_page};

/// Size of a guest thread stack, 512 KiB.
pub const THREAD_STACK_SIZE: u64 = 0x80000;

/// Unmapped gap left below each allocated stack.
pub const GUARD_SIZE: u64 = 0x4000;

static_assertions::const_assert!(THREAD_STACK_SIZE % PAGE_SIZE == 0);
static_assertions::const_assert!(GUARD_SIZE % PAGE_SIZE == 0);

/// A guest memory region used as a thread stack.
///
/// The region has a single owner; it is intentionally not `Clone`.
#[derive(Debug, PartialEq, Eq)]
pub struct StackRegion {
    base: u64,
    size: u64,
}

impl StackRegion {
    /// Creates a region descriptor for `[base, base + size)`.
    ///
    /// Intended for [`StackAllocator`] implementations.
    pub const fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    /// Lowest guest address of the region.
    #[inline]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Size of the region in bytes.
    #[inline]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// One-past-the-end address, the initial stack pointer.
    #[inline]
    pub const fn top(&self) -> u64 {
        self.base + self.size
    }

    /// Returns `true` if `addr` lies inside the region.
    #[inline]
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.top()
    }
}

/// Source of guest stack regions.
pub trait StackAllocator {
    /// Allocates a stack region of exactly `size` bytes.
    fn allocate(&mut self, size: u64) -> Result<StackRegion, StackAllocError>;
}

/// Page-granular, grow-upward arena allocator over a guest address range.
///
/// Regions are never returned to the arena.
#[derive(Debug)]
pub struct BumpStackAllocator {
    next: u64,
    end: u64,
}

impl BumpStackAllocator {
    /// Creates an allocator over `[start, end)`.
    ///
    /// Both bounds must be page-aligned and `start <= end`.
    pub fn new(start: u64, end: u64) -> Result<Self, StackAllocError> {
        if !is_page_aligned(start) || !is_page_aligned(end) {
            return Err(StackAllocError::InvalidAlignment);
        }
        if start > end {
            return Err(StackAllocError::InvalidSize);
        }

        Ok(Self { next: start, end })
    }

    /// Bytes still available, guard gaps included.
    pub fn remaining(&self) -> u64 {
        self.end - self.next
    }
}

impl StackAllocator for BumpStackAllocator {
    fn allocate(&mut self, size: u64) -> Result<StackRegion, StackAllocError> {
        if size == 0 {
            return Err(StackAllocError::InvalidSize);
        }
        if !is_page_aligned(size) {
            return Err(StackAllocError::InvalidAlignment);
        }

        let out_of_memory = StackAllocError::OutOfMemory {
            requested: size,
            available: self.remaining().saturating_sub(GUARD_SIZE),
        };

        let base = self
            .next
            .checked_add(GUARD_SIZE)
            .and_then(round_up_to_page)
            .ok_or(out_of_memory.clone())?;
        let top = base.checked_add(size).ok_or(out_of_memory.clone())?;
        if top > self.end {
            return Err(out_of_memory);
        }

        self.next = top;
        Ok(StackRegion::new(base, size))
    }
}

/// Errors that can occur while allocating a guest stack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackAllocError {
    /// Size must be non-zero.
    #[error("Size must be non-zero")]
    InvalidSize,

    /// Size or address is not a multiple of the page size (4 KiB).
    #[error("Size must be page-aligned (0x1000)")]
    InvalidAlignment,

    /// The arena can't fit the requested region.
    #[error("Out of guest stack memory: requested {requested:#x}, available {available:#x}")]
    OutOfMemory {
        /// Requested size in bytes.
        requested: u64,
        /// Bytes left in the arena at the time of the request.
        available: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARENA_START: u64 = 0xe400_0000;

    #[test]
    fn top_is_base_plus_size() {
        let region = StackRegion::new(0x1_0000, THREAD_STACK_SIZE);
        assert_eq!(region.top(), 0x1_0000 + 0x80000);
        assert!(region.contains(0x1_0000));
        assert!(!region.contains(region.top()));
    }

    #[test]
    fn bump_allocations_do_not_overlap() {
        let mut alloc =
            BumpStackAllocator::new(ARENA_START, ARENA_START + 0x40_0000).expect("valid arena");

        let a = alloc.allocate(THREAD_STACK_SIZE).expect("first stack");
        let b = alloc.allocate(THREAD_STACK_SIZE).expect("second stack");

        assert_eq!(a.base(), ARENA_START + GUARD_SIZE);
        assert_eq!(b.base(), a.top() + GUARD_SIZE);
        assert!(!a.contains(b.base()));
    }

    #[test]
    fn bump_rejects_invalid_sizes() {
        let mut alloc = BumpStackAllocator::new(ARENA_START, ARENA_START + 0x10_0000).unwrap();

        assert_eq!(alloc.allocate(0), Err(StackAllocError::InvalidSize));
        assert_eq!(alloc.allocate(0x123), Err(StackAllocError::InvalidAlignment));
    }

    #[test]
    fn bump_reports_exhaustion() {
        let mut alloc = BumpStackAllocator::new(ARENA_START, ARENA_START + 0x80000).unwrap();

        let err = alloc.allocate(THREAD_STACK_SIZE).unwrap_err();
        assert_eq!(
            err,
            StackAllocError::OutOfMemory {
                requested: THREAD_STACK_SIZE,
                available: 0x80000 - GUARD_SIZE,
            }
        );
        // A failed request leaves the arena untouched.
        assert_eq!(alloc.remaining(), 0x80000);
    }

    #[test]
    fn arena_bounds_must_be_aligned() {
        assert!(matches!(
            BumpStackAllocator::new(0x1001, 0x2000),
            Err(StackAllocError::InvalidAlignment)
        ));
        assert!(matches!(
            BumpStackAllocator::new(0x3000, 0x2000),
            Err(StackAllocError::InvalidSize)
        ));
    }
}
