use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// A counter split into one padded slot per thread.
///
/// Threads only ever add to their own slot, so increments never contend. Every
/// `batch` local increments a thread also publishes `batch` into a shared
/// total, which gives two ways to read the counter:
///
/// - [`approximate_total`](Self::approximate_total) reads the shared total. It
///   is O(1) and never fences. It can lag behind the true value by less than
///   `num_threads * batch`, and never runs ahead of it.
/// - [`exact_total`](Self::exact_total) sums every slot. It is O(num_threads)
///   and is authoritative once no increments are in flight.
///
/// With a batch of 1 both totals are equal.
pub(crate) struct ShardedCounter {
    slots: Box<[CachePadded<AtomicU64>]>,
    total: CachePadded<AtomicU64>,
    batch: u64,
}

impl ShardedCounter {
    pub(crate) fn new(num_threads: usize, batch: u64) -> Self {
        assert!(num_threads > 0);
        assert!(batch > 0);

        let slots = std::iter::repeat_with(Default::default)
            .take(num_threads)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            total: Default::default(),
            batch,
        }
    }

    #[inline]
    pub(crate) fn increment(&self, tid: usize) {
        self.add(tid, 1);
    }

    /// Adds `n` to the slot of thread `tid`.
    ///
    /// # Panics
    ///
    /// Panics if `tid` is not less than the number of threads.
    pub(crate) fn add(&self, tid: usize, n: u64) {
        let prev = self.slots[tid].fetch_add(n, Ordering::Relaxed);
        let crossed = (prev + n) / self.batch - prev / self.batch;
        if crossed > 0 {
            self.total.fetch_add(crossed * self.batch, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn approximate_total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub(crate) fn exact_total(&self) -> u64 {
        self.slots.iter().map(|s| s.load(Ordering::Acquire)).sum()
    }

    /// The maximum amount by which `approximate_total` may trail
    /// `exact_total`.
    pub(crate) fn staleness_bound(&self) -> u64 {
        self.slots.len() as u64 * (self.batch - 1)
    }
}

impl std::fmt::Debug for ShardedCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedCounter")
            .field("approximate", &self.approximate_total())
            .field("exact", &self.exact_total())
            .field("staleness_bound", &self.staleness_bound())
            .finish()
    }
}
