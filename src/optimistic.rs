//! Provides [`OptimisticSet`], a fixed-capacity set that peeks at buckets
//! before locking them.

use crate::common::{
    builder_utils,
    concurrent::locked_bucket::LockedBucket,
    hash::murmur3,
    probe::Probe,
    sentinel::Slot,
    IntSet, SetDetails, Tally,
};

use crossbeam_utils::CachePadded;

/// A linear-probing integer set with per-bucket locks that are only taken when
/// a bucket looks like it needs to change.
///
/// Every probe step first reads the bucket without its lock:
///
/// - an insert locks the bucket only when it reads an empty slot, and returns
///   `false` without locking when it reads its own key,
/// - an erase locks the bucket only when it reads its own key, and returns
///   `false` without locking when it reads an empty slot.
///
/// After taking the lock the bucket is read again, and the mutation only
/// happens if the condition still holds. Buckets that hold other keys or
/// tombstones are passed over without ever touching their locks.
///
/// Like [`LockedSet`](crate::locked::LockedSet) the table never grows, and
/// every `i32` is a valid key.
///
/// # Examples
///
/// ```rust
/// use probeset::{optimistic::OptimisticSet, IntSet};
/// use std::sync::Arc;
///
/// let set = Arc::new(OptimisticSet::new(2, 64));
///
/// let handles: Vec<_> = (0..2)
///     .map(|tid| {
///         let set = Arc::clone(&set);
///         std::thread::spawn(move || {
///             for k in 0..10 {
///                 set.insert_if_absent(tid, tid as i32 * 10 + k);
///             }
///         })
///     })
///     .collect();
///
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(set.sum_of_keys(), (0..20).sum::<i64>());
/// ```
pub struct OptimisticSet {
    num_threads: usize,
    buckets: Box<[CachePadded<LockedBucket>]>,
}

impl IntSet for OptimisticSet {
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
            match bucket.peek() {
                Slot::Key(k) if k == key => return false,
                Slot::Empty => {
                    let slot = bucket.lock();
                    match slot.get() {
                        Slot::Empty => {
                            slot.set(Slot::Key(key));
                            return true;
                        }
                        Slot::Key(k) if k == key => return false,
                        // Another key won the bucket. Try next bucket.
                        _ => (),
                    }
                }
                _ => (),
            }
        }

        #[cfg(feature = "logging")]
        log::trace!(
            "OptimisticSet: probed all {} buckets for key {key} without finding room",
            self.buckets.len()
        );

        false
    }

    fn erase(&self, tid: usize, key: i32) -> bool {
        debug_assert!(tid < self.num_threads);

        for index in Probe::new(murmur3(key), self.buckets.len()) {
            let bucket = &self.buckets[index];
            match bucket.peek() {
                Slot::Empty => return false,
                Slot::Key(k) if k == key => {
                    let slot = bucket.lock();
                    if slot.get() == Slot::Key(key) {
                        slot.set(Slot::Tombstone);
                        return true;
                    }
                    // Erased by someone else in the meantime. The key may have
                    // been inserted again further along, so keep probing.
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

impl std::fmt::Debug for OptimisticSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimisticSet")
            .field("num_threads", &self.num_threads)
            .field("details", &self.details())
            .finish()
    }
}
