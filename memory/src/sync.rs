//! Lock helpers. Poisoned locks are recovered, not propagated as panics.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned: PoisonError<_>| {
        tracing::warn!("Recovering poisoned lock (read)");
        poisoned.into_inner()
    })
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned: PoisonError<_>| {
        tracing::warn!("Recovering poisoned lock (write)");
        poisoned.into_inner()
    })
}
