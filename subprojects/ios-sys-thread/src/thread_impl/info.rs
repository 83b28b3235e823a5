use core::fmt;

use ios_cpu::{Bitness, ContextHandle, RegisterMap};
use ios_sys_mem::StackRegion;
use ios_sys_thread_tls::TlsRecord;

/// Guest thread descriptor.
///
/// Created by [`super::create`] and mutated only by
/// [`super::run_to_completion`] and [`super::advance`]. Dropping the descriptor
/// performs no guest-visible teardown.
pub struct Thread<T> {
    /// Guest address of the start routine.
    pub(crate) entry: u64,

    /// Argument passed to the start routine. `None` is passed as zero.
    pub(crate) arg: Option<u64>,

    /// Stack region, exclusively owned by this thread.
    pub(crate) stack: StackRegion,

    /// Thread record the guest runtime finds through the thread pointer.
    pub(crate) tls: T,

    /// Snapshot handle, allocated on the first cooperative slice and kept for
    /// the lifetime of the thread.
    pub(crate) context: Option<ContextHandle>,

    /// Whether `context` holds a saved register file.
    pub(crate) saved: bool,

    pub(crate) state: ThreadState,

    /// Address bound for [`super::run_to_completion`].
    pub(crate) until: u64,

    pub(crate) bitness: Bitness,
    pub(crate) regs: RegisterMap,
    pub(crate) strategy: DispatchStrategy,
}

impl<T> Thread<T> {
    pub fn entry(&self) -> u64 {
        self.entry
    }

    pub fn arg(&self) -> Option<u64> {
        self.arg
    }

    /// Value placed in the first argument register.
    #[inline]
    pub fn arg_value(&self) -> u64 {
        self.arg.unwrap_or(0)
    }

    pub fn stack(&self) -> &StackRegion {
        &self.stack
    }

    pub fn tls(&self) -> &T {
        &self.tls
    }

    pub fn until(&self) -> u64 {
        self.until
    }

    pub fn bitness(&self) -> Bitness {
        self.bitness
    }

    pub fn registers(&self) -> &RegisterMap {
        &self.regs
    }

    pub fn strategy(&self) -> DispatchStrategy {
        self.strategy
    }

    /// Snapshot handle holding the register file of the last completed slice.
    ///
    /// `None` until the first slice has been saved.
    pub fn saved_context(&self) -> Option<&ContextHandle> {
        self.context.as_ref().filter(|_| self.saved)
    }

    /// Current position in the cooperative lifecycle.
    ///
    /// Completion is observed by the driver through the backend and is not
    /// tracked here.
    pub fn state(&self) -> ThreadState {
        self.state
    }
}

impl<T: TlsRecord> fmt::Display for Thread<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DarwinThread start_routine={:#x}, arg=", self.entry)?;
        match self.arg {
            Some(arg) => write!(f, "{arg:#x}")?,
            None => f.write_str("null")?,
        }
        write!(f, ", stack={:#x}", self.stack.top())
    }
}

/// How a thread may be dispatched onto the backend.
///
/// Selected once from the guest [`Bitness`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStrategy {
    /// Only the blocking [`super::run_to_completion`] mode is available.
    RunToCompletion,
    /// Time-sliced [`super::advance`] is available, as well as
    /// [`super::run_to_completion`].
    Cooperative,
}

impl DispatchStrategy {
    pub const fn for_bitness(bitness: Bitness) -> Self {
        if bitness.is_64bit() {
            DispatchStrategy::Cooperative
        } else {
            DispatchStrategy::RunToCompletion
        }
    }
}

/// Cooperative lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// The guest has not been handed control yet.
    NotStarted,
    /// At least one slice has run and a snapshot is available to resume from.
    Running,
    /// A slice failed after the guest was handed control.
    ///
    /// The thread can't be advanced again; [`Thread::saved_context`] still
    /// holds the last good snapshot, if one was taken.
    Faulted,
}
