//! Run-to-completion dispatch.
//!
//! The thread body runs in a single blocking call to [`Backend::run_until`].
//! No context snapshot is used or produced, so this mode is available for
//! every [`DispatchStrategy`](super::DispatchStrategy).

use ios_cpu::{Backend, BackendError};
use ios_sys_thread_tls::{SlotError, TlsRecord};

use super::{info::Thread, tls::wire_tls};

/// Runs `thread` from its entry point until its `until` bound.
///
/// Programs the argument, stack pointer and thread pointer registers, then
/// blocks in the backend until the guest finishes. Returns the emulated exit
/// status.
pub fn run_to_completion<T, B>(
    thread: &mut Thread<T>,
    backend: &mut B,
) -> Result<u64, ThreadRunError>
where
    T: TlsRecord,
    B: Backend + ?Sized,
{
    debug_assert_eq!(backend.bitness(), thread.bitness);

    wire_tls(thread)?;

    let regs = thread.regs;
    backend.reg_write(regs.arg0, thread.arg_value())?;
    backend.reg_write(regs.sp, thread.stack.top())?;
    backend.reg_write(regs.thread_pointer, thread.tls.tsd_address())?;

    log::debug!("run to completion: {thread}, until={:#x}", thread.until);

    backend
        .run_until(thread.entry, thread.until)
        .map_err(Into::into)
}

/// Error type for [`run_to_completion`].
#[derive(Debug, thiserror::Error)]
pub enum ThreadRunError {
    /// The self-reference could not be stored in the thread record.
    #[error("Thread record wiring failed: {0}")]
    Slot(#[from] SlotError),

    /// The backend reported a failure, guest faults included.
    ///
    /// The error is passed through exactly as the backend reported it.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
