use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a bookkeeping mutex. Every critical section guarded this way only
/// updates counters or tables, so a poisoned lock still holds usable data.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
