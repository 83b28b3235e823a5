//! CPU emulation backend interface.
//!
//! The thread runtime never executes guest instructions itself. Everything it
//! needs from the emulation engine is captured by the [`Backend`] trait:
//!
//! * [`Backend::reg_write`] / [`Backend::reg_read`] – access to named
//!   architectural registers.
//! * [`Backend::context_alloc`], [`Backend::context_save`] and
//!   [`Backend::context_restore`] – opaque full register-file snapshots.
//! * [`Backend::run_until`] – blocking run-to-address execution.
//! * [`Backend::begin_thread`] and [`Backend::resume_until`] – the
//!   time-sliced primitives used for cooperative thread switching.
//!
//! A backend executes at most one guest thread at any instant. Exclusive
//! access during a slice is expressed through `&mut self`.

use core::{fmt, num::NonZeroU64};

use crate::regs::{Bitness, Register};

/// An opaque register-file snapshot handle issued by [`Backend::context_alloc`].
///
/// The handle is an owned resource: it is neither `Clone` nor `Copy`, so a
/// snapshot has exactly one owner and its identity can't be duplicated.
#[derive(Debug, PartialEq, Eq)]
pub struct ContextHandle(NonZeroU64);

impl ContextHandle {
    /// Wraps a backend-specific handle value.
    ///
    /// Only backends should call this, from within [`Backend::context_alloc`].
    pub const fn from_raw(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// Returns the backend-specific handle value.
    pub const fn raw(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{:#x}", self.0.get())
    }
}

/// CPU emulation engine capability interface.
pub trait Backend {
    /// Architecture mode the backend emulates.
    fn bitness(&self) -> Bitness;

    /// Writes `value` into `reg`.
    fn reg_write(&mut self, reg: Register, value: u64) -> Result<(), BackendError>;

    /// Reads the current value of `reg`.
    fn reg_read(&mut self, reg: Register) -> Result<u64, BackendError>;

    /// Allocates storage for one full register-file snapshot.
    fn context_alloc(&mut self) -> Result<ContextHandle, BackendError>;

    /// Captures the current register file into `ctx`, overwriting its contents.
    fn context_save(&mut self, ctx: &ContextHandle) -> Result<(), BackendError>;

    /// Loads the register file from `ctx`.
    fn context_restore(&mut self, ctx: &ContextHandle) -> Result<(), BackendError>;

    /// Runs from `begin` until the PC reaches `until` or the guest exits.
    ///
    /// Blocks until the whole body has executed and returns the emulated
    /// return code.
    fn run_until(&mut self, begin: u64, until: u64) -> Result<u64, BackendError>;

    /// Starts a new guest thread at `entry` with `arg` in the first argument
    /// register and `stack_top` as the initial stack pointer, running it for
    /// at most `timeout`.
    ///
    /// Only AArch64 backends are required to support this.
    fn begin_thread(
        &mut self,
        entry: u64,
        arg: u64,
        stack_top: u64,
        timeout: u64,
    ) -> Result<(), BackendError>;

    /// Continues execution from the current PC for at most `timeout`.
    fn resume_until(&mut self, timeout: u64) -> Result<(), BackendError>;
}

/// Error type returned by [`Backend`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The guest faulted during an execution slice.
    ///
    /// The register state at the point of the fault is whatever the backend
    /// captured; the thread runtime does not interpret it.
    #[error("Guest fault at pc={pc:#x}: {kind}")]
    Fault {
        /// Program counter of the faulting instruction.
        pc: u64,
        /// What went wrong.
        kind: FaultKind,
    },

    /// No more context snapshot storage is available.
    #[error("Out of context snapshots")]
    OutOfContexts,

    /// The register is not valid for this backend's architecture.
    #[error("Invalid register: {0:?}")]
    InvalidRegister(Register),
}

/// Guest-level fault classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FaultKind {
    #[error("illegal instruction")]
    IllegalInstruction,

    #[error("unmapped memory access")]
    MemoryUnmapped,

    #[error("memory protection violation")]
    MemoryProtection,

    /// Backend-specific fault code.
    #[error("backend error code {0}")]
    Other(u32),
}
