//! # Thread-Specific Data (TSD) records for emulated Darwin guests
//!
//! Every guest thread owns a thread record (the Darwin `pthread` structure).
//! The guest runtime locates the record through the read-only thread pointer
//! register, which holds the address of the record's **TSD array**:
//!
//! - AArch32: CP15 `c13, c0, 3` (`TPIDRURO`)
//! - AArch64: `TPIDRRO_EL0`
//!
//! Slot `n` of the TSD array lives at `tsd_address + n * pointer_size`. The
//! slot indices are architecture independent; only the slot width changes.
//!
//! ## Record Layout
//!
//! ```text
//! record base
//! 0x000  ┌────────────────────────────┐
//!        │ sig            (word)      │ "THRD" magic
//!        │ ...                        │
//! +stack │ stack_addr     (word)      │ lowest address of the thread stack
//!        │ stack_size     (word)      │ stack size in bytes
//!        │ ...                        │
//! +tsd   ├────────────────────────────┤ ← thread pointer register
//!        │ TSD slot   0 (THREAD_SELF) │ record base (self-reference)
//!        │ TSD slot   1 (ERRNO)       │
//!        │ TSD slot   2 (MIG_REPLY)   │
//!        │ ...                        │
//!        │ TSD slot 511               │
//!        └────────────────────────────┘
//! ```
//!
//! A word is 4 bytes on AArch32 and 8 bytes on AArch64. See [`PthreadLayout`]
//! for the per-bitness offsets.
//!
//! ## Initialization Order
//!
//! 1. The stack is allocated and announced with [`TlsRecord::set_stack`].
//! 2. The record is packed into its guest image ([`TlsRecord::pack`]).
//! 3. Before the first instruction of the thread executes, the self-reference
//!    is written into [`tsd::THREAD_SELF`] and the thread pointer register is
//!    loaded with [`TlsRecord::tsd_address`].
//!
//! Reading TSD before step 3 yields a null thread self, which the guest runtime
//! treats as a corrupt thread.

#![no_std]

extern crate alloc;

mod pthread;

pub use pthread::*;

/// Well-known TSD slot indices.
pub mod tsd {
    /// The thread's own record address.
    pub const THREAD_SELF: usize = 0;
    /// Per-thread `errno`.
    pub const ERRNO: usize = 1;
    /// MIG reply port.
    pub const MIG_REPLY: usize = 2;
    /// Mach thread port of the thread.
    pub const MACH_THREAD_SELF: usize = 3;
    /// QoS class of the thread.
    pub const THREAD_QOS_CLASS: usize = 4;
}

/// Number of TSD slots in a thread record.
pub const TSD_SLOT_COUNT: usize = 512;

static_assertions::const_assert!(tsd::THREAD_QOS_CLASS < TSD_SLOT_COUNT);

/// A guest thread record the runtime wires up before a thread starts.
pub trait TlsRecord {
    /// Guest address of the record; the value stored in [`tsd::THREAD_SELF`].
    fn base_address(&self) -> u64;

    /// Guest address of the TSD array; the value loaded into the thread
    /// pointer register.
    fn tsd_address(&self) -> u64;

    /// Records the thread's stack bounds so the guest runtime can validate
    /// stack accesses.
    fn set_stack(&mut self, base: u64, size: u64);

    /// Stores `value` in TSD slot `slot`.
    fn write_slot(&mut self, slot: usize, value: u64) -> Result<(), SlotError>;

    /// Loads the value of TSD slot `slot`.
    fn read_slot(&self, slot: usize) -> Result<u64, SlotError>;

    /// Serializes the record into its guest memory image.
    fn pack(&mut self);
}

/// Error type for TSD slot access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    /// Slot index is not below [`TSD_SLOT_COUNT`].
    #[error("TSD slot out of range: {slot}")]
    OutOfRange {
        /// The rejected slot index.
        slot: usize,
    },
}
