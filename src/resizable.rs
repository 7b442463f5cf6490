//! Provides [`ResizableSet`], a lock-free set whose table grows while it is in
//! use.
//!
//! The set points at one current table. When an insert finds that more than
//! half of the current table's slots have been used, it allocates a table four
//! times as large that refers back to the current one, and tries to install it
//! with a single compare-and-swap on the set's table pointer. Exactly one
//! thread wins. From then on the two tables coexist until every slot of the old
//! table has been migrated:
//!
//! 1. The old table is split into chunks of 4096 slots. Any thread that calls
//!    an operation claims the next unclaimed chunk with a fetch-and-add and
//!    migrates it. Migration is only ever done by threads calling operations.
//!    There is no background thread, and a single thread can complete a
//!    migration by itself.
//! 2. Migrating a slot sets its mark bit with a compare-and-swap, then copies
//!    its key (if any) into the new table. Tombstones are left alone.
//! 3. Once every chunk has been migrated, the thread that completed the last
//!    one detaches the old table from the new one and retires it through
//!    `crossbeam-epoch`. It is freed once every thread that might still be
//!    reading it has unpinned.
//!
//! An operation never acts on a marked slot. If it reads one, the table it is
//! probing has been replaced, and it starts over on the current table. Before
//! an operation touches the new table it waits until the migration is
//! complete, so the new table is never read while it is missing keys.

pub(crate) mod table;

use self::table::{Step, Table};
use crate::common::{
    builder_utils,
    hash::murmur3,
    probe::Probe,
    sentinel::{is_packed_key, MAX_PACKED_KEY, MIN_PACKED_KEY},
    IntSet, SetDetails,
};

use std::sync::atomic::Ordering;

use crossbeam_epoch::{Atomic, CompareExchangeError, Guard, Owned, Shared};
use crossbeam_utils::CachePadded;

/// Whether an insert may grow the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Expansion {
    /// The insert checks the load of the table on every probe step and grows
    /// it when more than half of its slots are used.
    #[default]
    Enabled,
    /// The insert never grows the table. It returns `false` when it probed the
    /// whole table without finding the key or an empty slot. It still helps
    /// to complete a migration that is already running.
    Disabled,
}

/// A lock-free linear-probing integer set that grows by incremental,
/// cooperative migration.
///
/// Keys must be in `MIN_PACKED_KEY..=MAX_PACKED_KEY` (`1..=0x7FFF_FFFE`). The
/// mark bit, the empty slot and the tombstone use the remaining values. This
/// is checked only in debug builds.
///
/// # Examples
///
/// ```rust
/// use probeset::{resizable::ResizableSet, IntSet};
///
/// let set = ResizableSet::new(1, 4);
/// for key in [10, 11, 12] {
///     assert!(set.insert_if_absent(0, key));
/// }
///
/// // More than half of the 4 slots were used, so the table grew.
/// assert_eq!(set.capacity(), 16);
/// assert_eq!(set.sum_of_keys(), 33);
/// ```
pub struct ResizableSet {
    num_threads: usize,
    current: CachePadded<Atomic<Table>>,
}

impl IntSet for ResizableSet {
    fn new(num_threads: usize, initial_capacity: usize) -> Self {
        builder_utils::ensure_configuration_or_panic(num_threads, initial_capacity);

        Self {
            num_threads,
            current: CachePadded::new(Atomic::new(Table::new(initial_capacity, num_threads))),
        }
    }

    fn insert_if_absent(&self, tid: usize, key: i32) -> bool {
        self.insert_if_absent_with(tid, key, Expansion::Enabled)
    }

    fn erase(&self, tid: usize, key: i32) -> bool {
        debug_assert!(tid < self.num_threads);
        debug_assert!(is_packed_key(key), "{}", key_out_of_range(key));

        let guard = &crossbeam_epoch::pin();
        let hash = murmur3(key);

        'restart: loop {
            let table = self.current_table(guard);

            for index in Probe::new(hash, table.capacity()) {
                // Erases never grow the table, but they keep migrations moving.
                table.help_expansion(guard);

                match table.try_erase_at(index, key) {
                    Step::Done(erased) => {
                        if erased {
                            table.record_delete(tid);
                        }
                        return erased;
                    }
                    Step::Next => (),
                    Step::Restart => continue 'restart,
                }
            }

            return false;
        }
    }

    fn sum_of_keys(&self) -> i64 {
        let guard = &crossbeam_epoch::pin();
        let table = self.stable_table(guard);
        table.tally().sum
    }

    fn num_threads(&self) -> usize {
        self.num_threads
    }

    fn capacity(&self) -> usize {
        let guard = &crossbeam_epoch::pin();
        self.current_table(guard).capacity()
    }

    fn details(&self) -> SetDetails {
        let guard = &crossbeam_epoch::pin();
        let table = self.stable_table(guard);
        table
            .tally()
            .into_details(table.capacity(), table.generation())
    }
}

impl ResizableSet {
    /// Inserts `key` if it is not present, growing the table only if
    /// `expansion` is [`Expansion::Enabled`].
    ///
    /// With expansion enabled the insert always finds room: if it probes the
    /// whole table without finding an empty slot, it forces an expansion and
    /// tries again on the larger table.
    pub fn insert_if_absent_with(&self, tid: usize, key: i32, expansion: Expansion) -> bool {
        debug_assert!(tid < self.num_threads);
        debug_assert!(is_packed_key(key), "{}", key_out_of_range(key));

        let guard = &crossbeam_epoch::pin();
        let hash = murmur3(key);
        let may_expand = expansion == Expansion::Enabled;

        'restart: loop {
            let table = self.current_table(guard);
            table.help_expansion(guard);

            for (probe_step, index) in Probe::new(hash, table.capacity()).enumerate() {
                if may_expand && self.expand_as_needed(table, probe_step, guard) {
                    continue 'restart;
                }

                match table.try_insert_at(index, key) {
                    Step::Done(inserted) => {
                        if inserted {
                            table.record_insert(tid);
                            if may_expand {
                                // Grow right away if this insert crossed the
                                // threshold. The key is migrated either way.
                                self.expand_as_needed(table, 0, guard);
                            }
                        }
                        return inserted;
                    }
                    Step::Next => (),
                    Step::Restart => continue 'restart,
                }
            }

            if !may_expand {
                #[cfg(feature = "logging")]
                log::trace!(
                    "ResizableSet: probed all {} slots for key {key} without finding room",
                    table.capacity()
                );

                return false;
            }

            // Every slot is taken, most likely by tombstones. Grow anyway.
            self.start_expansion(table, guard);
        }
    }

    /// Returns the current table. It may still be migrating.
    fn current_table<'g>(&self, guard: &'g Guard) -> &'g Table {
        let table_ptr = self.current.load(Ordering::Acquire, guard);
        // SAFETY: the current table is never null, and a table is retired only
        // after it has been replaced, through `guard.defer_destroy`.
        unsafe { table_ptr.deref() }
    }

    /// Returns the current table after helping its migration to complete.
    fn stable_table<'g>(&self, guard: &'g Guard) -> &'g Table {
        let table = self.current_table(guard);
        table.help_expansion(guard);
        table
    }

    /// Helps the migration into `table`, then starts an expansion if the table
    /// is more than half used. Returns `true` if an expansion was started (by
    /// this thread or another), in which case the caller must start over on
    /// the current table.
    fn expand_as_needed<'g>(&self, table: &'g Table, probe_step: usize, guard: &'g Guard) -> bool {
        table.help_expansion(guard);

        if table.needs_expansion(probe_step) {
            self.start_expansion(table, guard);
            true
        } else {
            false
        }
    }

    /// Replaces `table` with a larger one, unless someone already did, then
    /// helps migrate into whichever table is current.
    fn start_expansion<'g>(&self, table: &'g Table, guard: &'g Guard) {
        // A table must be stable before it can be replaced.
        table.help_expansion(guard);

        let table_ptr: Shared<'g, Table> = (table as *const Table).into();

        if self.current.load(Ordering::Acquire, guard) == table_ptr {
            let successor = Table::successor(table, table_ptr, self.num_threads);

            match self.current.compare_exchange(
                table_ptr,
                successor,
                Ordering::AcqRel,
                Ordering::Acquire,
                guard,
            ) {
                Ok(_new) => {
                    #[cfg(feature = "logging")]
                    log::debug!(
                        "ResizableSet: expanding a {}-slot table to {} slots (expansion #{})",
                        table.capacity(),
                        // SAFETY: we just installed it and are pinned.
                        unsafe { _new.deref() }.capacity(),
                        table.generation() + 1
                    );
                }
                Err(CompareExchangeError { new, .. }) => discard_successor(new),
            }
        }

        self.current_table(guard).help_expansion(guard);
    }
}

/// Drops a successor table that lost the race to be installed.
fn discard_successor(successor: Owned<Table>) {
    // It must not take the table it was meant to replace down with it.
    successor.forget_prev();
    drop(successor);
}

fn key_out_of_range(key: i32) -> String {
    format!("Key {key} is outside of {MIN_PACKED_KEY}..={MAX_PACKED_KEY}")
}

impl Drop for ResizableSet {
    fn drop(&mut self) {
        let guard = unsafe { crossbeam_epoch::unprotected() };
        let table = self.current.swap(Shared::null(), Ordering::Relaxed, guard);
        if !table.is_null() {
            // SAFETY: we have exclusive access to the set, so no thread can be
            // reading the current table.
            unsafe { drop(table.into_owned()) };
        }
    }
}

impl std::fmt::Debug for ResizableSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = &crossbeam_epoch::pin();
        f.debug_struct("ResizableSet")
            .field("num_threads", &self.num_threads)
            .field("table", self.current_table(guard))
            .finish()
    }
}
