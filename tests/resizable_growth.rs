use std::sync::{Arc, Barrier};

use probeset::{
    resizable::{Expansion, ResizableSet},
    IntSet, SetBuilder, MAX_PACKED_KEY, MIN_PACKED_KEY,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn small_table_grows_fourfold() {
    init_logger();

    let set: ResizableSet = SetBuilder::new()
        .num_threads(1)
        .initial_capacity(4)
        .build()
        .expect("Cannot build the set");

    for key in [10, 11, 12] {
        assert!(set.insert_if_absent(0, key));
    }

    let details = set.details();
    assert_eq!(details.capacity, 16);
    assert_eq!(details.keys, 3);
    assert_eq!(details.tombstones, 0);
    assert_eq!(details.expansions, 1);
    assert_eq!(set.sum_of_keys(), 33);
    assert_eq!(
        details.to_string(),
        "capacity: 16, keys: 3, tombstones: 0, empty: 13, expansions: 1"
    );
}

#[test]
fn expansion_can_be_disabled_per_insert() {
    init_logger();

    let set = ResizableSet::new(1, 2);

    assert!(set.insert_if_absent_with(0, 1, Expansion::Disabled));
    assert!(set.insert_if_absent_with(0, 2, Expansion::Disabled));
    assert!(!set.insert_if_absent_with(0, 3, Expansion::Disabled));
    assert_eq!(set.capacity(), 2);
    assert_eq!(set.sum_of_keys(), 3);

    assert!(set.insert_if_absent_with(0, 3, Expansion::default()));
    assert!(set.capacity() > 2);
    assert_eq!(set.sum_of_keys(), 6);
}

#[test]
fn packed_key_range_ends_are_usable() {
    let set = ResizableSet::new(1, 8);

    assert!(set.insert_if_absent(0, MIN_PACKED_KEY));
    assert!(set.insert_if_absent(0, MAX_PACKED_KEY));
    assert!(!set.insert_if_absent(0, MIN_PACKED_KEY));
    assert_eq!(
        set.sum_of_keys(),
        MIN_PACKED_KEY as i64 + MAX_PACKED_KEY as i64
    );
    assert!(set.erase(0, MAX_PACKED_KEY));
    assert!(set.erase(0, MIN_PACKED_KEY));
    assert_eq!(set.sum_of_keys(), 0);
}

/// Eight threads grow a table from 16 slots to well past several migration
/// chunks while they insert, erase and re-insert their own keys.
#[test]
#[cfg_attr(skip_large_mem_tests, ignore)]
fn concurrent_growth_keeps_every_key() {
    const NUM_THREADS: usize = 8;
    const KEYS_PER_THREAD: i32 = 50_000;

    init_logger();

    let set: Arc<ResizableSet> = Arc::new(
        SetBuilder::new()
            .num_threads(NUM_THREADS)
            .initial_capacity(16)
            .build()
            .expect("Cannot build the set"),
    );
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let threads: Vec<_> = (0..NUM_THREADS)
        .map(|tid| {
            let set = Arc::clone(&set);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let base = tid as i32 * KEYS_PER_THREAD;
                barrier.wait();

                for key in base + 1..=base + KEYS_PER_THREAD {
                    assert!(set.insert_if_absent(tid, key));
                }
                for key in (base + 1..=base + KEYS_PER_THREAD).step_by(4) {
                    assert!(set.erase(tid, key));
                }
                for key in base + 1..=base + KEYS_PER_THREAD {
                    assert_eq!(set.insert_if_absent(tid, key), (key - base - 1) % 4 == 0);
                }
            })
        })
        .collect();

    threads
        .into_iter()
        .for_each(|t| t.join().expect("Thread failed"));

    let n = NUM_THREADS as i64 * KEYS_PER_THREAD as i64;
    assert_eq!(set.sum_of_keys(), n * (n + 1) / 2);

    let details = set.details();
    assert_eq!(details.keys as i64, n);
    // The approximate insert count may lag, so the load can exceed one half.
    assert!(details.capacity > n as usize);
    assert!(details.expansions >= 6);
    println!("{details}");
}

/// Threads toggle the same few keys while the table grows from a single slot.
/// Every toggle leaves a tombstone, so migrations keep running under the
/// contended inserts and erases, and stale operations hit marked slots.
#[test]
fn shared_keys_toggled_during_growth_stay_consistent() {
    const NUM_THREADS: usize = 8;
    const KEYS: i32 = 8;
    const ROUNDS: usize = 300;

    init_logger();

    let set: Arc<ResizableSet> = Arc::new(
        SetBuilder::new()
            .num_threads(NUM_THREADS)
            .initial_capacity(1)
            .build()
            .expect("Cannot build the set"),
    );
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let threads: Vec<_> = (0..NUM_THREADS)
        .map(|tid| {
            let set = Arc::clone(&set);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let mut balance = vec![0i64; KEYS as usize];
                barrier.wait();
                for _ in 0..ROUNDS {
                    for key in 1..=KEYS {
                        if set.insert_if_absent(tid, key) {
                            balance[key as usize - 1] += 1;
                        }
                        if set.erase(tid, key) {
                            balance[key as usize - 1] -= 1;
                        }
                    }
                }
                balance
            })
        })
        .collect();

    let mut balance = vec![0i64; KEYS as usize];
    for t in threads {
        for (total, b) in balance.iter_mut().zip(t.join().expect("Thread failed")) {
            *total += b;
        }
    }

    let mut expected_sum = 0;
    for (i, &b) in balance.iter().enumerate() {
        assert!(b == 0 || b == 1, "key {} has balance {}", i + 1, b);
        expected_sum += b * (i as i64 + 1);
    }
    assert_eq!(set.sum_of_keys(), expected_sum);

    let details = set.details();
    assert_eq!(details.keys as i64, balance.iter().sum::<i64>());
    assert!(details.expansions > 0);
    println!("{details}");
}
