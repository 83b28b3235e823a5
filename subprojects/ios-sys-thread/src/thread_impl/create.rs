//! Thread creation implementation
//!
//! Creating a thread allocates its stack and announces the stack bounds to the
//! thread record. No backend register is touched here; the first register
//! transfer happens on dispatch.

use ios_cpu::{Bitness, RegisterMap};
use ios_sys_mem::{StackAllocError, StackAllocator, THREAD_STACK_SIZE};
use ios_sys_thread_tls::TlsRecord;

use super::info::{DispatchStrategy, Thread, ThreadState};

/// Creates a new guest thread descriptor.
///
/// # Arguments
/// * `allocator` - Source of the thread's [`THREAD_STACK_SIZE`] stack
/// * `entry` - Guest address of the start routine
/// * `arg` - Argument for the start routine (`None` is passed as zero)
/// * `until` - Address bound used by [`super::run_to_completion`]
/// * `bitness` - Guest architecture mode
/// * `tls` - The thread record to wire up on dispatch
///
/// On allocation failure the thread record is dropped untouched.
pub fn create<A, T>(
    allocator: &mut A,
    entry: u64,
    arg: Option<u64>,
    until: u64,
    bitness: Bitness,
    mut tls: T,
) -> Result<Thread<T>, ThreadCreateError>
where
    A: StackAllocator + ?Sized,
    T: TlsRecord,
{
    let stack = allocator.allocate(THREAD_STACK_SIZE)?;

    tls.set_stack(stack.base(), stack.size());
    tls.pack();

    let thread = Thread {
        entry,
        arg,
        stack,
        tls,
        context: None,
        saved: false,
        state: ThreadState::NotStarted,
        until,
        bitness,
        regs: RegisterMap::for_bitness(bitness),
        strategy: DispatchStrategy::for_bitness(bitness),
    };

    log::debug!(
        "created thread: {thread}, stack_base={:#x}, tsd={:#x}",
        thread.stack.base(),
        thread.tls.tsd_address()
    );

    Ok(thread)
}

/// Thread creation errors
#[derive(Debug, thiserror::Error)]
pub enum ThreadCreateError {
    /// Stack memory allocation failed.
    ///
    /// Nothing has been written to the thread record or to the backend.
    #[error("Stack allocation failed: {0}")]
    StackAlloc(#[from] StackAllocError),
}
