/// The error type returned by [`SetBuilder::build`][build] when the requested
/// configuration cannot be used to create a set.
///
/// [build]: ./struct.SetBuilder.html#method.build
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A set must be shared by at least one thread.
    #[error("The number of threads must be at least 1")]
    ZeroThreads,

    /// A set must have room for at least one key.
    #[error("The initial capacity must be at least 1")]
    ZeroCapacity,

    /// The requested table is larger than the largest initial table a set
    /// accepts.
    #[error("The initial capacity {requested} exceeds the maximum initial capacity {max}")]
    CapacityTooLarge {
        /// The initial capacity that was asked for.
        requested: usize,
        /// The largest initial capacity a set accepts.
        max: usize,
    },
}
