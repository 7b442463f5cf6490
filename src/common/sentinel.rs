//! Slot states and their single-word encodings.
//!
//! Every bucket of every set holds exactly one [`Slot`]. The slot is stored
//! in-band in a single atomic word so that a state transition (for example
//! `Empty -> Key(k)` or `Key(k) -> Tombstone`) is one compare-and-swap over the
//! whole encoded representation.
//!
//! Two encodings exist:
//!
//! - [`WideSlot`] is used by the locked, optimistic and lock-free sets. It
//!   stores the key in an `i64` and reserves two values just above `i32::MAX`
//!   for the sentinels, so every `i32` is a valid key.
//! - [`PackedSlot`] is used by the resizable set. It stores the key in a `u32`
//!   whose most significant bit is the migration mark. `0` is the empty slot
//!   and `0x7FFF_FFFF` is the tombstone, which restricts keys to
//!   `MIN_PACKED_KEY..=MAX_PACKED_KEY`.
//!
//! Decoding is total: every raw word maps to some `Slot`. A thread may decode
//! a value that is stale by the time it acts on it, so callers always
//! re-validate with a compare-and-swap before mutating.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Empty,
    Tombstone,
    Key(i32),
    /// Frozen by a migration. Carries the key the slot held when it was
    /// marked, or `None` if it was empty.
    Marked(Option<i32>),
}

impl Slot {
    #[inline]
    pub(crate) fn key(self) -> Option<i32> {
        match self {
            Slot::Key(k) => Some(k),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_marked(self) -> bool {
        matches!(self, Slot::Marked(_))
    }

    /// Returns the marked form of this slot. Tombstones are never marked.
    #[inline]
    pub(crate) fn marked(self) -> Slot {
        match self {
            Slot::Empty => Slot::Marked(None),
            Slot::Key(k) => Slot::Marked(Some(k)),
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Wide encoding (i64, every i32 is a key)
// ---------------------------------------------------------------------------

pub(crate) const WIDE_EMPTY: i64 = i32::MAX as i64 + 1;
pub(crate) const WIDE_TOMBSTONE: i64 = i32::MAX as i64 + 2;

#[inline]
fn decode_wide(raw: i64) -> Slot {
    match raw {
        WIDE_EMPTY => Slot::Empty,
        WIDE_TOMBSTONE => Slot::Tombstone,
        k => Slot::Key(k as i32),
    }
}

#[inline]
fn encode_wide(slot: Slot) -> i64 {
    match slot {
        Slot::Empty => WIDE_EMPTY,
        Slot::Tombstone => WIDE_TOMBSTONE,
        Slot::Key(k) => k as i64,
        Slot::Marked(_) => unreachable!("The wide slot encoding has no mark bit"),
    }
}

#[derive(Debug)]
pub(crate) struct WideSlot(AtomicI64);

impl Default for WideSlot {
    fn default() -> Self {
        Self(AtomicI64::new(WIDE_EMPTY))
    }
}

impl WideSlot {
    #[inline]
    pub(crate) fn load(&self) -> Slot {
        decode_wide(self.0.load(Ordering::Acquire))
    }

    /// Plain store. Only the locked sets use it, and only while holding the
    /// bucket lock.
    #[inline]
    pub(crate) fn store(&self, slot: Slot) {
        self.0.store(encode_wide(slot), Ordering::Release);
    }

    #[inline]
    pub(crate) fn compare_exchange(&self, current: Slot, new: Slot) -> Result<Slot, Slot> {
        self.0
            .compare_exchange(
                encode_wide(current),
                encode_wide(new),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(decode_wide)
            .map_err(decode_wide)
    }
}

// ---------------------------------------------------------------------------
// Packed encoding (u32 with a mark bit)
// ---------------------------------------------------------------------------

pub(crate) const MARK_BIT: u32 = 0x8000_0000;
pub(crate) const PACKED_EMPTY: u32 = 0;
pub(crate) const PACKED_TOMBSTONE: u32 = 0x7FFF_FFFF;

/// The smallest key the resizable set accepts.
pub const MIN_PACKED_KEY: i32 = 1;
/// The largest key the resizable set accepts.
pub const MAX_PACKED_KEY: i32 = PACKED_TOMBSTONE as i32 - 1;

#[inline]
pub(crate) fn is_packed_key(key: i32) -> bool {
    (MIN_PACKED_KEY..=MAX_PACKED_KEY).contains(&key)
}

#[inline]
fn decode_packed(raw: u32) -> Slot {
    let marked = raw & MARK_BIT != 0;
    match (marked, raw & !MARK_BIT) {
        (_, PACKED_TOMBSTONE) => Slot::Tombstone,
        (false, PACKED_EMPTY) => Slot::Empty,
        (false, k) => Slot::Key(k as i32),
        (true, PACKED_EMPTY) => Slot::Marked(None),
        (true, k) => Slot::Marked(Some(k as i32)),
    }
}

#[inline]
fn encode_packed(slot: Slot) -> u32 {
    match slot {
        Slot::Empty => PACKED_EMPTY,
        Slot::Tombstone => PACKED_TOMBSTONE,
        Slot::Key(k) => k as u32,
        Slot::Marked(None) => MARK_BIT,
        Slot::Marked(Some(k)) => k as u32 | MARK_BIT,
    }
}

#[derive(Debug)]
pub(crate) struct PackedSlot(AtomicU32);

impl Default for PackedSlot {
    fn default() -> Self {
        Self(AtomicU32::new(PACKED_EMPTY))
    }
}

impl PackedSlot {
    #[inline]
    pub(crate) fn load(&self) -> Slot {
        decode_packed(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn compare_exchange(&self, current: Slot, new: Slot) -> Result<Slot, Slot> {
        self.0
            .compare_exchange(
                encode_packed(current),
                encode_packed(new),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(decode_packed)
            .map_err(decode_packed)
    }
}
