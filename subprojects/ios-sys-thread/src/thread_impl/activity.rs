//! Cooperative thread activity.
//!
//! [`advance`] runs one time slice of a thread and leaves its full register
//! state in the thread's snapshot so the next call can pick up exactly where
//! the slice stopped:
//!
//! * **First slice** – allocates the snapshot handle, wires the thread record,
//!   loads `TPIDRRO_EL0` and starts the guest at its entry point via
//!   [`Backend::begin_thread`].
//! * **Later slices** – restores the snapshot and continues from the restored
//!   PC via [`Backend::resume_until`].
//!
//! Every slice that returns control, the first one included, is followed by a
//! save into the same handle. The handle is allocated once and kept by the
//! thread from then on, even if the slice that follows fails.
//!
//! A failure after the guest was handed control moves the thread to
//! [`ThreadState::Faulted`]; later calls fail with
//! [`ThreadAdvanceError::Faulted`] instead of starting the guest over.
//!
//! Only AArch64 threads can be advanced. Calling [`advance`] on a thread whose
//! [`DispatchStrategy`] is [`DispatchStrategy::RunToCompletion`] fails with
//! [`ThreadAdvanceError::UnsupportedCapability`] before any side effect.
//!
//! Once the backend has reported that the guest thread finished, the driver
//! must stop calling [`advance`] for it; the thread itself does not track
//! completion.

use ios_cpu::{Backend, BackendError, Bitness, ContextHandle};
use ios_sys_thread_tls::{SlotError, TlsRecord};

use super::{
    info::{DispatchStrategy, Thread, ThreadState},
    tls::wire_tls,
};

/// Runs the next time slice of `thread` for at most `timeout`.
pub fn advance<T, B>(
    thread: &mut Thread<T>,
    backend: &mut B,
    timeout: u64,
) -> Result<(), ThreadAdvanceError>
where
    T: TlsRecord,
    B: Backend + ?Sized,
{
    if thread.strategy != DispatchStrategy::Cooperative {
        return Err(ThreadAdvanceError::UnsupportedCapability {
            bitness: thread.bitness,
        });
    }
    if thread.state == ThreadState::Faulted {
        return Err(ThreadAdvanceError::Faulted);
    }
    debug_assert_eq!(backend.bitness(), thread.bitness);

    let ctx = match thread.context.take() {
        Some(ctx) => ctx,
        None => {
            let ctx = backend
                .context_alloc()
                .map_err(ThreadAdvanceError::ContextAlloc)?;
            log::debug!("allocated {ctx} for {thread}");
            ctx
        }
    };

    let res = run_slice(thread, backend, &ctx, timeout);
    thread.context = Some(ctx);
    res
}

fn run_slice<T, B>(
    thread: &mut Thread<T>,
    backend: &mut B,
    ctx: &ContextHandle,
    timeout: u64,
) -> Result<(), ThreadAdvanceError>
where
    T: TlsRecord,
    B: Backend + ?Sized,
{
    let resumed = thread.state == ThreadState::Running;

    let slice = if resumed {
        backend.context_restore(ctx)?;
        let pc = backend.reg_read(thread.regs.pc)?;
        log::info!("resume thread: {thread}, pc={pc:#x}");

        backend.resume_until(timeout)
    } else {
        wire_tls(thread)?;
        backend.reg_write(thread.regs.thread_pointer, thread.tls.tsd_address())?;
        log::info!("run thread: {thread}");

        backend.begin_thread(
            thread.entry,
            thread.arg_value(),
            thread.stack.top(),
            timeout,
        )
    };

    // The guest has run; a failure from here on can't be retried.
    if let Err(err) = slice.and_then(|()| backend.context_save(ctx)) {
        thread.state = ThreadState::Faulted;
        return Err(err.into());
    }

    log::trace!(
        "saved {ctx} after {} slice",
        if resumed { "resumed" } else { "first" }
    );
    thread.saved = true;
    thread.state = ThreadState::Running;

    Ok(())
}

/// Error type for [`advance`].
#[derive(Debug, thiserror::Error)]
pub enum ThreadAdvanceError {
    /// The thread's architecture mode can't be time-sliced.
    ///
    /// This is a caller bug; such threads must be run with
    /// [`super::run_to_completion`].
    #[error("Cooperative dispatch is not supported for {bitness} threads")]
    UnsupportedCapability {
        /// Architecture mode of the thread.
        bitness: Bitness,
    },

    /// An earlier slice failed after the guest was handed control.
    #[error("Thread faulted in an earlier slice")]
    Faulted,

    /// The backend could not allocate a context snapshot.
    ///
    /// Reported before any register of the backend is written.
    #[error("Context allocation failed: {0}")]
    ContextAlloc(#[source] BackendError),

    /// The self-reference could not be stored in the thread record.
    #[error("Thread record wiring failed: {0}")]
    Slot(#[from] SlotError),

    /// The backend reported a failure, guest faults included.
    ///
    /// The error is passed through exactly as the backend reported it and no
    /// snapshot is taken for the failed slice.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
