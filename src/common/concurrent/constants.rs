/// The initial capacity used by `SetBuilder` when none is given.
pub(crate) const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// The largest initial capacity a set accepts. It does not limit growth: the
/// resizable set keeps growing past it until `usize` overflows.
pub(crate) const MAX_CAPACITY: usize = 1 << 30;

/// The resizable set grows its table by this factor.
pub(crate) const GROWTH_FACTOR: usize = 4;

/// Number of probe steps an insert takes before it pays for the exact
/// occupancy count instead of trusting the approximate one.
pub(crate) const EXPANSION_PATIENCE: usize = 10;

/// Number of old-table slots a thread migrates per claimed chunk.
pub(crate) const MIGRATION_CHUNK_SIZE: usize = 4096;

/// The approximate insert count of a resizable table may trail the exact count
/// by at most `capacity / COUNTER_STALENESS_DIVISOR`.
pub(crate) const COUNTER_STALENESS_DIVISOR: usize = 8;
