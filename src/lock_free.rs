//! Provides [`LockFreeSet`], a fixed-capacity set built on compare-and-swap.

use crate::common::{
    builder_utils,
    hash::murmur3,
    probe::Probe,
    sentinel::{Slot, WideSlot},
    IntSet, SetDetails, Tally,
};

use crossbeam_utils::CachePadded;

/// A lock-free linear-probing integer set.
///
/// Each bucket is a single atomic word. Inserts claim an empty bucket with a
/// compare-and-swap from empty to the key, and erases replace the key with a
/// tombstone with a compare-and-swap from the key to the tombstone. The
/// successful compare-and-swap is the linearization point of the operation.
///
/// The table never grows, and every `i32` is a valid key.
///
/// # Examples
///
/// ```rust
/// use probeset::{lock_free::LockFreeSet, IntSet};
///
/// let set = LockFreeSet::new(1, 2);
/// assert!(set.insert_if_absent(0, 1));
/// assert!(set.insert_if_absent(0, 2));
/// // The table is full.
/// assert!(!set.insert_if_absent(0, 3));
/// ```
pub struct LockFreeSet {
    num_threads: usize,
    buckets: Box<[CachePadded<WideSlot>]>,
}

impl IntSet for LockFreeSet {
    fn new(num_threads: usize, initial_capacity: usize) -> Self {
        builder_utils::ensure_configuration_or_panic(num_threads, initial_capacity);

        let buckets = std::iter::repeat_with(Default::default)
            .take(initial_capacity)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            num_threads,
            buckets,
        }
    }

    fn insert_if_absent(&self, tid: usize, key: i32) -> bool {
        debug_assert!(tid < self.num_threads);

        for index in Probe::new(murmur3(key), self.buckets.len()) {
            let bucket = &self.buckets[index];
            match bucket.load() {
                Slot::Key(k) if k == key => return false,
                Slot::Empty => match bucket.compare_exchange(Slot::Empty, Slot::Key(key)) {
                    Ok(_) => return true,
                    // Lost the race to an identical insert.
                    Err(Slot::Key(k)) if k == key => return false,
                    // A different key won the bucket. Try next bucket.
                    Err(_) => (),
                },
                _ => (),
            }
        }

        #[cfg(feature = "logging")]
        log::trace!(
            "LockFreeSet: probed all {} buckets for key {key} without finding room",
            self.buckets.len()
        );

        false
    }

    fn erase(&self, tid: usize, key: i32) -> bool {
        debug_assert!(tid < self.num_threads);

        for index in Probe::new(murmur3(key), self.buckets.len()) {
            let bucket = &self.buckets[index];
            match bucket.load() {
                Slot::Empty => return false,
                Slot::Key(k) if k == key => {
                    // A failure means a concurrent erase tombstoned it first.
                    return bucket
                        .compare_exchange(Slot::Key(key), Slot::Tombstone)
                        .is_ok();
                }
                _ => (),
            }
        }

        false
    }

    fn sum_of_keys(&self) -> i64 {
        Tally::of(self.buckets.iter().map(|b| b.load())).sum
    }

    fn num_threads(&self) -> usize {
        self.num_threads
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn details(&self) -> SetDetails {
        Tally::of(self.buckets.iter().map(|b| b.load())).into_details(self.capacity(), 0)
    }
}

impl std::fmt::Debug for LockFreeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockFreeSet")
            .field("num_threads", &self.num_threads)
            .field("details", &self.details())
            .finish()
    }
}
