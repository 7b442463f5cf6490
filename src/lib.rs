#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

//! Concurrent open-addressed integer sets under four synchronization
//! strategies.
//!
//! Every set stores `i32` keys in a linear-probing hash table and implements
//! the [`IntSet`] trait: `insert_if_absent`, `erase` and `sum_of_keys`. The
//! sets differ only in how concurrent operations are synchronized:
//!
//! | Set | Synchronization | Capacity |
//! |:----|:----------------|:---------|
//! | [`LockedSet`][locked] | A mutex per bucket, taken at every probe step. | Fixed |
//! | [`OptimisticSet`][optimistic] | A mutex per bucket, taken only when the bucket looks like it must change. | Fixed |
//! | [`LockFreeSet`][lock-free] | Compare-and-swap on each bucket. | Fixed |
//! | [`ResizableSet`][resizable] | Compare-and-swap, with cooperative incremental growth. | Grows 4× when half full |
//!
//! [locked]: ./locked/struct.LockedSet.html
//! [optimistic]: ./optimistic/struct.OptimisticSet.html
//! [lock-free]: ./lock_free/struct.LockFreeSet.html
//! [resizable]: ./resizable/struct.ResizableSet.html
//!
//! Erased keys leave a tombstone behind, and tombstones are never reused. A
//! fixed-capacity set therefore accepts at most `capacity` successful inserts
//! over its lifetime. The resizable set drops its tombstones when it migrates
//! to a larger table.
//!
//! Callers assign each worker thread an id in `0..num_threads` and pass it to
//! every operation. The ids select per-thread counter slots, so two threads
//! must not share an id at the same time.
//!
//! # Example
//!
//! ```rust
//! use probeset::{resizable::ResizableSet, IntSet, SetBuilder};
//! use std::sync::Arc;
//!
//! const NUM_THREADS: usize = 4;
//!
//! let set: Arc<ResizableSet> = Arc::new(
//!     SetBuilder::new()
//!         .num_threads(NUM_THREADS)
//!         .initial_capacity(16)
//!         .build()
//!         .expect("a valid configuration"),
//! );
//!
//! let handles: Vec<_> = (0..NUM_THREADS)
//!     .map(|tid| {
//!         let set = Arc::clone(&set);
//!         std::thread::spawn(move || {
//!             // Each thread owns a disjoint range of keys.
//!             let start = (tid * 1000 + 1) as i32;
//!             for key in start..start + 1000 {
//!                 assert!(set.insert_if_absent(tid, key));
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for h in handles {
//!     h.join().unwrap();
//! }
//!
//! assert_eq!(set.sum_of_keys(), (1..=4000).sum::<i64>());
//! println!("{}", set.details());
//! ```
//!
//! # Logging
//!
//! With the default `logging` feature, the sets log through the [`log`][log]
//! facade. The resizable set logs each expansion and completed migration at the
//! `debug` level and each migrated chunk at the `trace` level. The
//! fixed-capacity sets log at the `trace` level when an insert finds the table
//! full.
//!
//! [log]: https://docs.rs/log

#[macro_use]
pub(crate) mod common;

pub mod lock_free;
pub mod locked;
pub mod optimistic;
pub mod resizable;

mod builder;

pub use builder::SetBuilder;
pub use common::{
    error::BuildError,
    hash::murmur3,
    sentinel::{MAX_PACKED_KEY, MIN_PACKED_KEY},
    IntSet, SetDetails,
};
