//! Cross-thread synchronization between the render thread and workers

pub mod barrier;

pub use barrier::{SyncBarrier, SyncObserver};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock `mutex`, recovering the guard if a panicking thread poisoned it.
///
/// Every structure guarded this way stays consistent between statements, so
/// a panic on another thread never leaves it half-updated.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
