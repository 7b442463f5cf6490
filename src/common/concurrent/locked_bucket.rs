use super::super::sentinel::{Slot, WideSlot};

use parking_lot::{Mutex, MutexGuard};

/// A bucket guarded by its own lock.
///
/// The slot is only ever written while the lock is held, but it is an atomic
/// word so that it can also be peeked at without the lock (by the optimistic
/// set and by the unsynchronized key scans).
#[derive(Debug, Default)]
pub(crate) struct LockedBucket {
    lock: Mutex<()>,
    slot: WideSlot,
}

impl LockedBucket {
    #[inline]
    pub(crate) fn peek(&self) -> Slot {
        self.slot.load()
    }

    #[inline]
    pub(crate) fn lock(&self) -> LockedSlot<'_> {
        LockedSlot {
            _guard: self.lock.lock(),
            slot: &self.slot,
        }
    }
}

/// Exclusive access to a bucket's slot. The bucket is unlocked on drop.
pub(crate) struct LockedSlot<'a> {
    _guard: MutexGuard<'a, ()>,
    slot: &'a WideSlot,
}

impl LockedSlot<'_> {
    #[inline]
    pub(crate) fn get(&self) -> Slot {
        self.slot.load()
    }

    #[inline]
    pub(crate) fn set(&self, slot: Slot) {
        self.slot.store(slot);
    }
}
