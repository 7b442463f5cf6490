//! Provides [`LockedSet`], a fixed-capacity set with one lock per bucket.

use crate::common::{
    builder_utils,
    concurrent::locked_bucket::LockedBucket,
    hash::murmur3,
    probe::Probe,
    sentinel::Slot,
    IntSet, SetDetails, Tally,
};

use crossbeam_utils::CachePadded;

/// A linear-probing integer set where every bucket has its own mutex.
///
/// Each probe step locks the bucket, inspects it, and (if needed) writes it
/// before unlocking, so the whole check-then-act on a bucket is serialized
/// with every other operation that reaches the same bucket. There is no
/// table-wide lock and no ordering between different buckets.
///
/// The table never grows. When an insert has probed every slot without finding
/// the key or an empty slot, it returns `false`.
///
/// Every `i32` is a valid key.
///
/// # Examples
///
/// ```rust
/// use probeset::{locked::LockedSet, IntSet};
///
/// let set = LockedSet::new(1, 8);
/// assert!(set.insert_if_absent(0, -3));
/// assert!(!set.insert_if_absent(0, -3));
/// assert!(set.insert_if_absent(0, 10));
/// assert_eq!(set.sum_of_keys(), 7);
/// assert!(set.erase(0, -3));
/// ```
pub struct LockedSet {
    num_threads: usize,
    buckets: Box<[CachePadded<LockedBucket>]>,
}

impl IntSet for LockedSet {
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
            let slot = self.buckets[index].lock();
            match slot.get() {
                Slot::Key(k) if k == key => return false,
                Slot::Empty => {
                    slot.set(Slot::Key(key));
                    return true;
                }
                // A different key or a tombstone. Try next bucket.
                _ => (),
            }
        }

        #[cfg(feature = "logging")]
        log::trace!(
            "LockedSet: probed all {} buckets for key {key} without finding room",
            self.buckets.len()
        );

        false
    }

    fn erase(&self, tid: usize, key: i32) -> bool {
        debug_assert!(tid < self.num_threads);

        for index in Probe::new(murmur3(key), self.buckets.len()) {
            let slot = self.buckets[index].lock();
            match slot.get() {
                // Keys are never moved, so the key cannot be further along.
                Slot::Empty => return false,
                Slot::Key(k) if k == key => {
                    slot.set(Slot::Tombstone);
                    return true;
                }
                _ => (),
            }
        }

        false
    }

    fn sum_of_keys(&self) -> i64 {
        Tally::of(self.buckets.iter().map(|b| b.peek())).sum
    }

    fn num_threads(&self) -> usize {
        self.num_threads
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn details(&self) -> SetDetails {
        Tally::of(self.buckets.iter().map(|b| b.peek())).into_details(self.capacity(), 0)
    }
}

impl std::fmt::Debug for LockedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockedSet")
            .field("num_threads", &self.num_threads)
            .field("details", &self.details())
            .finish()
    }
}
