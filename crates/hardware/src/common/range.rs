//! Address ranges.
//!
//! This module defines `AddressRange`, the span type used to describe the
//! region a memory component answers for. It provides:
//! 1. **Normalization:** Inverted endpoint pairs are swapped on every mutation.
//! 2. **Queries:** Containment, offset-from-start, and inclusive overlap tests.
//! 3. **Set Operations:** Intersection (empty when disjoint) and envelope.
//!
//! Ranges are stored half-open as `[start, end)`. The exclusive end is kept in
//! a `u128` so a range may include the highest address of the space.

use std::fmt;

use super::addr::{ADDRESS_SPACE, Address};

/// A contiguous, normalized span of addresses.
///
/// Endpoints passed to constructors and setters are inclusive; a range built
/// from `(a, b)` is identical to one built from `(b, a)`. A range is empty when
/// its start equals its exclusive end. All empty ranges compare equal.
#[derive(Clone, Copy, Debug, Default, Eq)]
pub struct AddressRange {
    start: Address,
    end: u128,
}

impl AddressRange {
    /// Returns the canonical empty range, anchored at address zero.
    pub const fn empty() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Creates a range covering both inclusive endpoints, in either order.
    ///
    /// # Arguments
    ///
    /// * `start` - First endpoint (inclusive).
    /// * `end` - Second endpoint (inclusive).
    pub fn new(start: Address, end: Address) -> Self {
        let mut range = Self::empty();
        range.set_range(start, end);
        range
    }

    /// Creates a range of `length` addresses beginning at `start`.
    ///
    /// A zero length yields an empty range anchored at `start`. Lengths running
    /// past the top of the address space are clamped to it.
    pub fn with_length(start: Address, length: u128) -> Self {
        let mut range = Self::empty();
        range.set_start_and_length(start, length);
        range
    }

    /// Returns the first address of the range (the anchor when empty).
    #[inline]
    pub const fn start(&self) -> Address {
        self.start
    }

    /// Returns the last address of the range, or `None` when it is empty.
    #[inline]
    pub const fn end(&self) -> Option<Address> {
        if self.is_empty() {
            None
        } else {
            Some((self.end - 1) as Address)
        }
    }

    /// Returns one past the last address, widened so the top of the space fits.
    #[inline]
    pub const fn end_exclusive(&self) -> u128 {
        self.end
    }

    /// Returns the number of addresses covered.
    #[inline]
    pub const fn len(&self) -> u128 {
        self.end - self.start as u128
    }

    /// Returns `true` when the range covers no address.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start as u128
    }

    /// Moves the start to `start`, keeping the current end.
    ///
    /// On an empty range this only moves the anchor. If the new start lies past
    /// the end the endpoints are swapped.
    pub fn set_start(&mut self, start: Address) {
        match self.end() {
            Some(end) => self.set_range(start, end),
            None => {
                self.start = start;
                self.end = start as u128;
            }
        }
    }

    /// Moves the end to `end` (inclusive), keeping the current start.
    ///
    /// On an empty range this produces the range spanning the anchor and `end`.
    pub fn set_end(&mut self, end: Address) {
        self.set_range(self.start, end);
    }

    /// Resizes the range to `length` addresses from the current start.
    pub fn set_length(&mut self, length: u128) {
        self.end = (self.start as u128).saturating_add(length).min(ADDRESS_SPACE);
    }

    /// Replaces both endpoints (inclusive, any order).
    pub fn set_range(&mut self, start: Address, end: Address) {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        self.start = lo;
        self.end = hi as u128 + 1;
    }

    /// Replaces the start and the length at once.
    pub fn set_start_and_length(&mut self, start: Address, length: u128) {
        self.start = start;
        self.set_length(length);
    }

    /// Returns `true` if `addr` lies inside the range.
    #[inline]
    pub const fn contains(&self, addr: Address) -> bool {
        addr >= self.start && (addr as u128) < self.end
    }

    /// Returns the offset of `addr` from the start of the range.
    ///
    /// The subtraction wraps, so callers check [`contains`](Self::contains)
    /// first when the address may lie outside.
    #[inline]
    pub const fn offset(&self, addr: Address) -> Address {
        addr.wrapping_sub(self.start)
    }

    /// Returns `true` if both ranges share at least one address.
    ///
    /// Endpoints are inclusive, so ranges that touch at a single address
    /// overlap. An empty range overlaps nothing, itself included.
    pub const fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.start as u128) < other.end
            && (other.start as u128) < self.end
    }

    /// Returns the addresses common to both ranges; empty when disjoint.
    pub fn intersection(&self, other: &Self) -> Self {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end <= start as u128 {
            Self::empty()
        } else {
            Self { start, end }
        }
    }

    /// Narrows this range to its intersection with `other`.
    pub fn intersect(&mut self, other: &Self) {
        *self = self.intersection(other);
    }

    /// Returns the smallest range covering both ranges.
    ///
    /// Empty operands contribute nothing; the envelope of two empty ranges is
    /// empty.
    pub fn envelope(&self, other: &Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Self::empty(),
            (true, false) => *other,
            (false, true) => *self,
            (false, false) => Self {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            },
        }
    }
}

impl PartialEq for AddressRange {
    fn eq(&self, other: &Self) -> bool {
        (self.is_empty() && other.is_empty()) || (self.start == other.start && self.end == other.end)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            None => f.write_str("[empty]"),
            Some(end) => write!(f, "[{:016X}, {end:016X}]", self.start),
        }
    }
}
