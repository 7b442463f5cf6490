use std::fmt;

pub(crate) mod builder_utils;
pub(crate) mod concurrent;
pub(crate) mod error;
pub(crate) mod hash;
pub(crate) mod probe;
pub(crate) mod sentinel;

#[cfg(test)]
#[macro_use]
pub(crate) mod test_utils;

use self::sentinel::Slot;

/// The operations shared by every set in this crate.
///
/// All sets take `&self`, so a set is shared between the worker threads with
/// an `Arc` (or a scoped borrow). Each worker identifies itself with a thread
/// id `tid` in `0..num_threads`, which the sets use to pick per-thread
/// counter slots. Thread ids are managed by the caller. Two threads must not
/// use the same id at the same time.
pub trait IntSet: Send + Sync {
    /// Creates a set for `num_threads` workers with room for
    /// `initial_capacity` keys.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` or `initial_capacity` is zero, or if
    /// `initial_capacity` is larger than the maximum initial capacity. Use
    /// [`SetBuilder`][builder] to get these as a `BuildError` instead.
    ///
    /// [builder]: ./struct.SetBuilder.html
    fn new(num_threads: usize, initial_capacity: usize) -> Self
    where
        Self: Sized;

    /// Inserts `key` if it is not present.
    ///
    /// Returns `true` if the key was inserted, and `false` if it was already
    /// present or if a fixed-capacity table has no room left for it.
    fn insert_if_absent(&self, tid: usize, key: i32) -> bool;

    /// Removes `key`. Returns `true` if it was present.
    fn erase(&self, tid: usize, key: i32) -> bool;

    /// Returns the sum of all keys in the set.
    ///
    /// This is an unsynchronized scan. Keys inserted or removed while the scan
    /// runs may or may not be counted, so the result is only exact when no
    /// other thread is modifying the set.
    fn sum_of_keys(&self) -> i64;

    fn num_threads(&self) -> usize;

    /// Returns the number of slots in the current table.
    fn capacity(&self) -> usize;

    /// Returns a snapshot of the table occupancy. It is weakly consistent in
    /// the same way as [`sum_of_keys`](Self::sum_of_keys).
    fn details(&self) -> SetDetails;
}

/// Occupancy of a set's current table, as returned by [`IntSet::details`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetDetails {
    /// Number of slots in the current table.
    pub capacity: usize,
    /// Number of slots holding a key.
    pub keys: usize,
    /// Number of slots holding a tombstone.
    pub tombstones: usize,
    /// Number of times the table has been replaced by a larger one. Always `0`
    /// for the fixed-capacity sets.
    pub expansions: u64,
}

impl fmt::Display for SetDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity: {}, keys: {}, tombstones: {}, empty: {}, expansions: {}",
            self.capacity,
            self.keys,
            self.tombstones,
            self.capacity
                .saturating_sub(self.keys)
                .saturating_sub(self.tombstones),
            self.expansions
        )
    }
}

/// Sum and counts of a pass over a table's slots.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    pub(crate) sum: i64,
    pub(crate) keys: usize,
    pub(crate) tombstones: usize,
}

impl Tally {
    /// A key that has been marked by a migration is still in the set (it has
    /// been, or is being, copied into the next table), so it is counted.
    pub(crate) fn of(slots: impl IntoIterator<Item = Slot>) -> Self {
        let mut tally = Self::default();
        for slot in slots {
            match slot {
                Slot::Key(k) | Slot::Marked(Some(k)) => {
                    tally.sum += k as i64;
                    tally.keys += 1;
                }
                Slot::Tombstone => tally.tombstones += 1,
                Slot::Empty | Slot::Marked(None) => (),
            }
        }
        tally
    }

    pub(crate) fn into_details(self, capacity: usize, expansions: u64) -> SetDetails {
        SetDetails {
            capacity,
            keys: self.keys,
            tombstones: self.tombstones,
            expansions,
        }
    }
}
