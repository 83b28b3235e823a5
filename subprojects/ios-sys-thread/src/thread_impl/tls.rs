//! Thread record wiring.

use ios_sys_thread_tls::{SlotError, TlsRecord, tsd};

use super::info::Thread;

/// Stores the thread's self-reference in the [`tsd::THREAD_SELF`] slot and
/// repacks the record.
///
/// Must run before the thread pointer register is loaded for the first
/// dispatch. Repeating it writes the same value again.
pub fn wire_tls<T: TlsRecord>(thread: &mut Thread<T>) -> Result<(), SlotError> {
    let self_ref = thread.tls.base_address();
    thread.tls.write_slot(tsd::THREAD_SELF, self_ref)?;
    thread.tls.pack();
    Ok(())
}
