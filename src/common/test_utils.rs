use std::thread::JoinHandle;

use crossbeam_epoch::Owned;

pub(crate) fn join_all<T>(threads: Vec<JoinHandle<T>>) -> Vec<T> {
    threads
        .into_iter()
        .map(|t| t.join().expect("a worker thread panicked"))
        .collect()
}

/// Pushes enough garbage through the global epoch collector that everything
/// retired so far gets destroyed.
pub(crate) fn run_deferred() {
    for _ in 0..65536 {
        let guard = crossbeam_epoch::pin();

        unsafe { guard.defer_destroy(Owned::new(0).into_shared(&guard)) };

        guard.flush();
    }
}

/// Writes the test cases every `IntSet` must pass. Keys stay in
/// `1..0x7FFF_FFFE` so the resizable set can run them too.
macro_rules! write_set_test_cases {
    ($s:ty) => {
        fn new_set(num_threads: usize, capacity: usize) -> $s {
            <$s as $crate::IntSet>::new(num_threads, capacity)
        }

        #[test]
        fn insert_then_erase_toggles() {
            let set = new_set(1, 16);

            assert!(set.insert_if_absent(0, 42));
            assert!(set.erase(0, 42));
            assert!(set.insert_if_absent(0, 42));

            assert_eq!(set.sum_of_keys(), 42);
        }

        #[test]
        fn insert_present_and_erase_absent_report_false() {
            let set = new_set(1, 16);

            assert!(!set.erase(0, 5));
            assert!(set.insert_if_absent(0, 5));
            assert!(!set.insert_if_absent(0, 5));
            assert!(set.erase(0, 5));
            assert!(!set.erase(0, 5));

            assert_eq!(set.sum_of_keys(), 0);
        }

        #[test]
        fn sequential_insertion_and_removal() {
            const MAX_VALUE: i32 = 512;

            let set = new_set(1, 2 * MAX_VALUE as usize);

            for i in 1..=MAX_VALUE {
                assert!(set.insert_if_absent(0, i));
                for j in 1..=i {
                    assert!(!set.insert_if_absent(0, j));
                }
            }

            let expected = (MAX_VALUE as i64) * (MAX_VALUE as i64 + 1) / 2;
            assert_eq!(set.sum_of_keys(), expected);
            assert_eq!(set.details().keys, MAX_VALUE as usize);

            for i in (1..=MAX_VALUE).step_by(2) {
                assert!(set.erase(0, i));
            }
            for i in 1..=MAX_VALUE {
                assert_eq!(set.insert_if_absent(0, i), i % 2 == 1);
            }
            assert_eq!(set.sum_of_keys(), expected);
        }

        #[test]
        fn concurrent_disjoint_insertion() {
            const MAX_VALUE: i32 = 512;
            const NUM_THREADS: usize = 8;
            const MAX_INSERTED_VALUE: i32 = (NUM_THREADS as i32) * MAX_VALUE;

            let set = std::sync::Arc::new(new_set(NUM_THREADS, 2 * MAX_INSERTED_VALUE as usize));
            let barrier = std::sync::Arc::new(std::sync::Barrier::new(NUM_THREADS));

            let threads: Vec<_> = (0..NUM_THREADS)
                .map(|tid| {
                    let set = std::sync::Arc::clone(&set);
                    let barrier = std::sync::Arc::clone(&barrier);

                    std::thread::spawn(move || {
                        barrier.wait();

                        for j in (1..=MAX_VALUE).map(|j| j + (tid as i32 * MAX_VALUE)) {
                            assert!(set.insert_if_absent(tid, j));
                        }
                    })
                })
                .collect();

            $crate::common::test_utils::join_all(threads);

            let n = MAX_INSERTED_VALUE as i64;
            assert_eq!(set.sum_of_keys(), n * (n + 1) / 2);
            assert_eq!(set.details().keys, MAX_INSERTED_VALUE as usize);

            $crate::common::test_utils::run_deferred();
        }

        #[test]
        fn concurrent_insertion_of_the_same_keys() {
            const MAX_VALUE: i32 = 1024;
            const NUM_THREADS: usize = 8;

            let set = std::sync::Arc::new(new_set(NUM_THREADS, 4 * MAX_VALUE as usize));
            let barrier = std::sync::Arc::new(std::sync::Barrier::new(NUM_THREADS));

            let threads: Vec<_> = (0..NUM_THREADS)
                .map(|tid| {
                    let set = std::sync::Arc::clone(&set);
                    let barrier = std::sync::Arc::clone(&barrier);

                    std::thread::spawn(move || {
                        barrier.wait();

                        (1..=MAX_VALUE)
                            .filter(|&k| set.insert_if_absent(tid, k))
                            .count()
                    })
                })
                .collect();

            let inserted: usize = $crate::common::test_utils::join_all(threads)
                .into_iter()
                .sum();

            // Every key has exactly one winner.
            assert_eq!(inserted, MAX_VALUE as usize);
            assert_eq!(set.details().keys, MAX_VALUE as usize);

            let n = MAX_VALUE as i64;
            assert_eq!(set.sum_of_keys(), n * (n + 1) / 2);

            $crate::common::test_utils::run_deferred();
        }

        #[test]
        fn racing_inserts_have_one_winner() {
            const ROUNDS: i32 = 200;

            let set = std::sync::Arc::new(new_set(2, 4 * ROUNDS as usize));

            for key in 1..=ROUNDS {
                let barrier = std::sync::Arc::new(std::sync::Barrier::new(2));
                let threads: Vec<_> = (0..2)
                    .map(|tid| {
                        let set = std::sync::Arc::clone(&set);
                        let barrier = std::sync::Arc::clone(&barrier);
                        std::thread::spawn(move || {
                            barrier.wait();
                            set.insert_if_absent(tid, key)
                        })
                    })
                    .collect();

                let results = $crate::common::test_utils::join_all(threads);
                assert_eq!(results.iter().filter(|&&won| won).count(), 1);
            }

            assert_eq!(set.details().keys, ROUNDS as usize);

            $crate::common::test_utils::run_deferred();
        }

        #[test]
        fn concurrent_insertion_and_removal() {
            const MAX_VALUE: i32 = 512;
            const NUM_THREADS: usize = 8;
            const MAX_INSERTED_VALUE: i32 = (NUM_THREADS as i32) * MAX_VALUE;

            let set = std::sync::Arc::new(new_set(NUM_THREADS, 4 * MAX_INSERTED_VALUE as usize));
            let barrier = std::sync::Arc::new(std::sync::Barrier::new(NUM_THREADS));

            let threads: Vec<_> = (0..NUM_THREADS)
                .map(|tid| {
                    let set = std::sync::Arc::clone(&set);
                    let barrier = std::sync::Arc::clone(&barrier);

                    std::thread::spawn(move || {
                        barrier.wait();

                        let keys = (1..=MAX_VALUE).map(|j| j + (tid as i32 * MAX_VALUE));
                        for j in keys.clone() {
                            assert!(set.insert_if_absent(tid, j));
                        }
                        // Keep the odd keys.
                        for j in keys.filter(|j| j % 2 == 0) {
                            assert!(set.erase(tid, j));
                            assert!(!set.erase(tid, j));
                        }
                    })
                })
                .collect();

            $crate::common::test_utils::join_all(threads);

            let expected: i64 = (1..=MAX_INSERTED_VALUE)
                .filter(|j| j % 2 == 1)
                .map(i64::from)
                .sum();
            assert_eq!(set.sum_of_keys(), expected);
            assert_eq!(set.details().keys, MAX_INSERTED_VALUE as usize / 2);

            $crate::common::test_utils::run_deferred();
        }

        #[test]
        fn contended_erase_has_one_winner() {
            const MAX_VALUE: i32 = 1024;
            const NUM_THREADS: usize = 8;

            let set = new_set(NUM_THREADS, 4 * MAX_VALUE as usize);
            for k in 1..=MAX_VALUE {
                assert!(set.insert_if_absent(0, k));
            }

            let set = std::sync::Arc::new(set);
            let barrier = std::sync::Arc::new(std::sync::Barrier::new(NUM_THREADS));

            let threads: Vec<_> = (0..NUM_THREADS)
                .map(|tid| {
                    let set = std::sync::Arc::clone(&set);
                    let barrier = std::sync::Arc::clone(&barrier);

                    std::thread::spawn(move || {
                        barrier.wait();
                        (1..=MAX_VALUE).filter(|&k| set.erase(tid, k)).count()
                    })
                })
                .collect();

            let erased: usize = $crate::common::test_utils::join_all(threads)
                .into_iter()
                .sum();

            assert_eq!(erased, MAX_VALUE as usize);
            assert_eq!(set.sum_of_keys(), 0);
            assert_eq!(set.details().keys, 0);

            $crate::common::test_utils::run_deferred();
        }
    };
}
