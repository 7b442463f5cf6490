use crate::common::{
    builder_utils, concurrent::constants::DEFAULT_INITIAL_CAPACITY, error::BuildError, IntSet,
};

use std::marker::PhantomData;

/// Builds any of the sets in this crate, with the configuration checked up
/// front.
///
/// [`IntSet::new`] panics on a bad configuration. `SetBuilder::build` returns
/// it as a [`BuildError`] instead.
///
/// # Examples
///
/// ```rust
/// use probeset::{resizable::ResizableSet, IntSet, SetBuilder};
///
/// let set: ResizableSet = SetBuilder::new()
///     // Thread ids 0..4 will be used.
///     .num_threads(4)
///     // Start with room for 64 keys. The table grows as needed.
///     .initial_capacity(64)
///     .build()
///     .expect("a valid configuration");
///
/// assert_eq!(set.num_threads(), 4);
/// assert_eq!(set.capacity(), 64);
/// ```
///
/// A zero capacity is rejected:
///
/// ```rust
/// use probeset::{locked::LockedSet, BuildError, SetBuilder};
///
/// let result = SetBuilder::<LockedSet>::new().initial_capacity(0).build();
/// assert_eq!(result.unwrap_err(), BuildError::ZeroCapacity);
/// ```
pub struct SetBuilder<S> {
    num_threads: Option<usize>,
    initial_capacity: Option<usize>,
    set_type: PhantomData<fn() -> S>,
}

impl<S> Default for SetBuilder<S>
where
    S: IntSet,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SetBuilder<S>
where
    S: IntSet,
{
    /// Constructs a new `SetBuilder` with the default configuration: one
    /// thread id per available CPU and an initial capacity of 1024.
    pub fn new() -> Self {
        Self {
            num_threads: None,
            initial_capacity: None,
            set_type: PhantomData,
        }
    }

    /// Sets the number of worker threads. Operations must be called with a
    /// `tid` in `0..num_threads`.
    pub fn num_threads(self, num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..self
        }
    }

    /// Sets the number of slots of the table. The fixed-capacity sets never
    /// hold more keys than this.
    pub fn initial_capacity(self, initial_capacity: usize) -> Self {
        Self {
            initial_capacity: Some(initial_capacity),
            ..self
        }
    }

    /// Builds the set.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of threads or the initial capacity is
    /// zero, or if the initial capacity is larger than the maximum initial
    /// capacity.
    pub fn build(self) -> Result<S, BuildError> {
        let num_threads = self
            .num_threads
            .unwrap_or_else(builder_utils::available_parallelism);
        let initial_capacity = self.initial_capacity.unwrap_or(DEFAULT_INITIAL_CAPACITY);

        builder_utils::validate_configuration(num_threads, initial_capacity)?;
        Ok(S::new(num_threads, initial_capacity))
    }
}

impl<S> std::fmt::Debug for SetBuilder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetBuilder")
            .field("num_threads", &self.num_threads)
            .field("initial_capacity", &self.initial_capacity)
            .finish()
    }
}
