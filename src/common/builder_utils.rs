use super::{concurrent::constants::MAX_CAPACITY, error::BuildError};

pub(crate) fn validate_configuration(
    num_threads: usize,
    initial_capacity: usize,
) -> Result<(), BuildError> {
    if num_threads == 0 {
        return Err(BuildError::ZeroThreads);
    }
    if initial_capacity == 0 {
        return Err(BuildError::ZeroCapacity);
    }
    if initial_capacity > MAX_CAPACITY {
        return Err(BuildError::CapacityTooLarge {
            requested: initial_capacity,
            max: MAX_CAPACITY,
        });
    }
    Ok(())
}

pub(crate) fn ensure_configuration_or_panic(num_threads: usize, initial_capacity: usize) {
    if let Err(e) = validate_configuration(num_threads, initial_capacity) {
        panic!("{e}");
    }
}

pub(crate) fn available_parallelism() -> usize {
    use std::{num::NonZeroUsize, thread::available_parallelism};
    available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}
