//! Serialisation for tests that touch process-wide state.
//!
//! The active flag, signal dispositions and the debug level are shared by
//! every test thread in a binary. Tests that flip them hold
//! [`serial_guard`] for their whole body.

use std::sync::{Mutex, MutexGuard};

static PROCESS_STATE: Mutex<()> = Mutex::new(());

/// Take the process-wide test lock. A test that panicked while holding it
/// does not poison it for the rest.
pub fn serial_guard() -> MutexGuard<'static, ()> {
    PROCESS_STATE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
