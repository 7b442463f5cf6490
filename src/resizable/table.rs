use crate::common::{
    concurrent::{
        constants::{
            COUNTER_STALENESS_DIVISOR, EXPANSION_PATIENCE, GROWTH_FACTOR, MIGRATION_CHUNK_SIZE,
        },
        sharded_counter::ShardedCounter,
    },
    hash::murmur3,
    probe::Probe,
    sentinel::{PackedSlot, Slot},
    Tally,
};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};
use crossbeam_utils::{Backoff, CachePadded};

/// The outcome of one probe step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// The operation is over and returns this value.
    Done(bool),
    /// The slot is not the one. Try next slot.
    Next,
    /// The slot has been marked by a migration. The table is being replaced,
    /// so the operation must start over on the current table.
    Restart,
}

/// One generation of the resizable set's table.
///
/// A table is *migrating* while `prev` points to the table it replaced, and
/// *stable* once every slot of that table has been marked and copied over and
/// `prev` has been cleared.
pub(crate) struct Table {
    slots: Box<[PackedSlot]>,
    /// The table being migrated into this one. Null once the migration is
    /// complete.
    prev: Atomic<Table>,
    prev_capacity: usize,
    total_chunks: usize,
    chunks_claimed: CachePadded<AtomicUsize>,
    chunks_done: CachePadded<AtomicUsize>,
    inserts: ShardedCounter,
    deletes: ShardedCounter,
    /// Keys copied in from `prev`. They occupy slots just like inserts do.
    migrated: CachePadded<AtomicU64>,
    /// Number of tables this one has replaced, directly or not.
    generation: u64,
}

impl Table {
    pub(crate) fn new(capacity: usize, num_threads: usize) -> Self {
        Self::with_generation(capacity, num_threads, 0)
    }

    fn with_generation(capacity: usize, num_threads: usize, generation: u64) -> Self {
        assert!(capacity > 0);

        let slots = std::iter::repeat_with(PackedSlot::default)
            .take(capacity)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        // Keep the approximate insert count within an eighth of the capacity
        // of the exact one.
        let batch = (capacity / (COUNTER_STALENESS_DIVISOR * num_threads)).max(1) as u64;

        Self {
            slots,
            prev: Atomic::null(),
            prev_capacity: 0,
            total_chunks: 0,
            chunks_claimed: Default::default(),
            chunks_done: Default::default(),
            inserts: ShardedCounter::new(num_threads, batch),
            deletes: ShardedCounter::new(num_threads, batch),
            migrated: Default::default(),
            generation,
        }
    }

    /// Allocates the table that will replace `prev`. It is not reachable by
    /// anyone until it is installed as the current table.
    pub(crate) fn successor<'g>(
        prev: &'g Table,
        prev_ptr: Shared<'g, Table>,
        num_threads: usize,
    ) -> Owned<Table> {
        let prev_capacity = prev.capacity();
        let mut table =
            Self::with_generation(prev.next_capacity(), num_threads, prev.generation + 1);

        table.prev = Atomic::from(prev_ptr);
        table.prev_capacity = prev_capacity;
        table.total_chunks = (prev_capacity + MIGRATION_CHUNK_SIZE - 1) / MIGRATION_CHUNK_SIZE;

        Owned::new(table)
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    fn next_capacity(&self) -> usize {
        let occupied = self.inserts.exact_total() + self.migrated.load(Ordering::Relaxed);
        let live = occupied as i64 - self.deletes.exact_total() as i64;
        grown_capacity(self.capacity(), live)
    }

    #[inline]
    pub(crate) fn record_insert(&self, tid: usize) {
        self.inserts.increment(tid);
    }

    #[inline]
    pub(crate) fn record_delete(&self, tid: usize) {
        self.deletes.increment(tid);
    }

    /// Whether more than half of the slots have been used. Tombstones are
    /// never reused, so every insert and every migrated key uses up a slot.
    ///
    /// The cheap approximate count is checked on every call. The exact count
    /// is only paid for once a probe has taken more than `EXPANSION_PATIENCE`
    /// steps.
    pub(crate) fn needs_expansion(&self, probe_step: usize) -> bool {
        let half = (self.capacity() / 2) as u64;
        let migrated = self.migrated.load(Ordering::Relaxed);

        self.inserts.approximate_total() + migrated > half
            || (probe_step > EXPANSION_PATIENCE && self.inserts.exact_total() + migrated > half)
    }

    pub(crate) fn try_insert_at(&self, index: usize, key: i32) -> Step {
        let slot = &self.slots[index];
        match slot.load() {
            Slot::Marked(_) => Step::Restart,
            Slot::Key(k) if k == key => Step::Done(false),
            Slot::Empty => match slot.compare_exchange(Slot::Empty, Slot::Key(key)) {
                Ok(_) => Step::Done(true),
                Err(Slot::Marked(_)) => Step::Restart,
                // Lost the race to an identical insert.
                Err(Slot::Key(k)) if k == key => Step::Done(false),
                Err(_) => Step::Next,
            },
            _ => Step::Next,
        }
    }

    pub(crate) fn try_erase_at(&self, index: usize, key: i32) -> Step {
        let slot = &self.slots[index];
        match slot.load() {
            Slot::Marked(_) => Step::Restart,
            Slot::Empty => Step::Done(false),
            Slot::Key(k) if k == key => match slot.compare_exchange(Slot::Key(key), Slot::Tombstone)
            {
                Ok(_) => Step::Done(true),
                Err(Slot::Marked(_)) => Step::Restart,
                // Tombstoned by a concurrent erase.
                Err(_) => Step::Done(false),
            },
            _ => Step::Next,
        }
    }

    /// Runs the migration into this table until it is complete.
    ///
    /// Every caller claims and migrates chunks of the previous table until none
    /// are left, then waits until every claimed chunk has been migrated. When
    /// this returns the table is stable.
    pub(crate) fn help_expansion(&self, guard: &Guard) {
        let prev_ptr = self.prev.load(Ordering::Acquire, guard);
        // SAFETY: `prev` is only retired through `guard.defer_destroy`, and we
        // are pinned.
        let Some(prev) = (unsafe { prev_ptr.as_ref() }) else {
            // Stable.
            return;
        };

        while self.chunks_claimed.load(Ordering::Relaxed) < self.total_chunks {
            let chunk = self.chunks_claimed.fetch_add(1, Ordering::AcqRel);
            if chunk < self.total_chunks {
                self.migrate(prev, chunk);
                self.complete_chunk(guard);
            }
        }

        let backoff = Backoff::new();
        while !self.prev.load(Ordering::Acquire, guard).is_null() {
            backoff.snooze();
        }
    }

    /// Marks every slot in `chunk` of `prev` and copies its key (if any) into
    /// this table.
    ///
    /// Marking is the commit point. Once a slot is marked, any operation that
    /// reads it from `prev` restarts on the current table instead of acting on
    /// it, so nothing written to `prev` after the copy can be lost.
    pub(crate) fn migrate(&self, prev: &Table, chunk: usize) {
        let start = chunk * MIGRATION_CHUNK_SIZE;
        let end = (start + MIGRATION_CHUNK_SIZE).min(prev.capacity());
        let mut moved = 0;

        for slot in &prev.slots[start..end] {
            let mut current = slot.load();
            loop {
                match current {
                    Slot::Tombstone => break,
                    Slot::Marked(_) => unreachable!("A chunk is migrated only once"),
                    _ => match slot.compare_exchange(current, current.marked()) {
                        Ok(_) => {
                            if let Some(key) = current.key() {
                                self.insert_for_migration(key);
                                moved += 1;
                            }
                            break;
                        }
                        // An insert or erase got in first. Mark what it left.
                        Err(actual) => current = actual,
                    },
                }
            }
        }

        self.migrated.fetch_add(moved, Ordering::Relaxed);

        #[cfg(feature = "logging")]
        log::trace!(
            "ResizableSet: migrated chunk {chunk} ({moved} keys) of a {}-slot table",
            prev.capacity()
        );
    }

    /// Inserts a key copied from `prev`. Keys are unique in `prev`, and nothing
    /// but migration writes to this table before it is stable, so the first
    /// empty slot on the probe sequence is the key's slot.
    fn insert_for_migration(&self, key: i32) {
        for index in Probe::new(murmur3(key), self.capacity()) {
            match self.slots[index].compare_exchange(Slot::Empty, Slot::Key(key)) {
                Ok(_) => return,
                Err(other) => debug_assert_ne!(other, Slot::Key(key)),
            }
        }

        unreachable!("A successor table has room for every key of its predecessor");
    }

    /// Counts a migrated chunk. The thread that completes the last chunk
    /// detaches the previous table and retires it, which makes this table
    /// stable.
    pub(crate) fn complete_chunk(&self, guard: &Guard) {
        let done = self.chunks_done.fetch_add(1, Ordering::AcqRel) + 1;
        if done < self.total_chunks {
            return;
        }

        let prev = self.prev.swap(Shared::null(), Ordering::AcqRel, guard);
        assert!(!prev.is_null());

        #[cfg(feature = "logging")]
        log::debug!(
            "ResizableSet: migrated {} keys from a {}-slot table into a {}-slot table",
            self.migrated.load(Ordering::Relaxed),
            self.prev_capacity,
            self.capacity()
        );

        // SAFETY: `prev` is no longer reachable. The set points at this table
        // (or a newer one) and this table no longer points at `prev`. Threads
        // that loaded it earlier are pinned, and the destruction waits for them.
        unsafe { guard.defer_destroy(prev) };
    }

    /// Clears `prev` on a table that lost the race to be installed, so that
    /// dropping it does not free the table it was meant to replace.
    pub(crate) fn forget_prev(&self) {
        self.prev.store(Shared::null(), Ordering::Relaxed);
    }

    pub(crate) fn tally(&self) -> Tally {
        Tally::of(self.slots.iter().map(PackedSlot::load))
    }

    #[cfg(test)]
    pub(crate) fn claim_chunk(&self) -> usize {
        self.chunks_claimed.fetch_add(1, Ordering::AcqRel)
    }

    #[cfg(test)]
    pub(crate) fn slot(&self, index: usize) -> Slot {
        self.slots[index].load()
    }

    #[cfg(test)]
    pub(crate) fn is_stable(&self, guard: &Guard) -> bool {
        self.prev.load(Ordering::Acquire, guard).is_null()
    }
}

/// `GROWTH_FACTOR` times the larger of `capacity` and the estimated number of
/// live keys. A non-positive estimate (more deletes than inserts observed)
/// falls back to the capacity. Growth is not bounded by `MAX_CAPACITY`, which
/// only limits the initial capacity.
fn grown_capacity(capacity: usize, live: i64) -> usize {
    let base = if live > capacity as i64 {
        live as usize
    } else {
        capacity
    };

    match base.checked_mul(GROWTH_FACTOR) {
        Some(capacity) => capacity,
        None => panic!("Capacity overflow while growing a {base}-slot table"),
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        // Only reached with a migration still pending when the whole set is
        // dropped. Retired tables always have a null `prev`.
        let guard = unsafe { crossbeam_epoch::unprotected() };
        let prev = self.prev.swap(Shared::null(), Ordering::Relaxed, guard);
        if !prev.is_null() {
            // SAFETY: we have exclusive access to this table, and `prev` is
            // reachable only through it.
            unsafe { drop(prev.into_owned()) };
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("capacity", &self.capacity())
            .field("generation", &self.generation)
            .field("prev_capacity", &self.prev_capacity)
            .field("inserts", &self.inserts)
            .field("deletes", &self.deletes)
            .field("migrated", &self.migrated.load(Ordering::Relaxed))
            .finish()
    }
}
