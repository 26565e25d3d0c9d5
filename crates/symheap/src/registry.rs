//! Bookkeeping of live allocations.
//!
//! Records are keyed by the displacement of the address handed to the
//! caller. Since the bump region only grows upward and spans never overlap,
//! key order is also placement order: the last record is the most recent live
//! allocation, and its span end is the high-water mark of the heap.

use alloc::collections::BTreeMap;
use core::ops::Range;

/// One live allocation.
///
/// ```text
///  span_start        offset                           span_end
///      │               │                                  │
///      ▼               ▼                                  ▼
///      ┌───────────────┬──────────────────┬───────────────┐
///      │ align padding │ requested bytes  │ rounding tail │
///      └───────────────┴──────────────────┴───────────────┘
///      ◄──────────────────── reserved ───────────────────►
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRecord {
    offset: usize,
    span_start: usize,
    reserved: usize,
    requested: usize,
}

impl AllocationRecord {
    pub(crate) fn new(offset: usize, span_start: usize, reserved: usize, requested: usize) -> Self {
        debug_assert!(span_start <= offset);
        debug_assert!(offset + requested <= span_start + reserved);
        Self {
            offset,
            span_start,
            reserved,
            requested,
        }
    }

    /// Displacement of the address returned to the caller.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn span_start(&self) -> usize {
        self.span_start
    }

    #[must_use]
    pub const fn span_end(&self) -> usize {
        self.span_start + self.reserved
    }

    #[must_use]
    pub const fn span(&self) -> Range<usize> {
        self.span_start..self.span_end()
    }

    /// Bytes taken from the bump region, including rounding and padding.
    #[must_use]
    pub const fn reserved(&self) -> usize {
        self.reserved
    }

    /// Bytes the caller asked for.
    #[must_use]
    pub const fn requested(&self) -> usize {
        self.requested
    }

    /// Bytes the caller may use from the returned address on.
    #[must_use]
    pub const fn usable(&self) -> usize {
        self.span_end() - self.offset
    }
}

#[derive(Debug, Default, Clone)]
pub struct AllocationRegistry {
    records: BTreeMap<usize, AllocationRecord>,
}

impl AllocationRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Adds a record, returning the one previously stored at the same offset.
    pub fn insert(&mut self, record: AllocationRecord) -> Option<AllocationRecord> {
        self.records.insert(record.offset, record)
    }

    #[must_use]
    pub fn get(&self, offset: usize) -> Option<&AllocationRecord> {
        self.records.get(&offset)
    }

    pub fn remove(&mut self, offset: usize) -> Option<AllocationRecord> {
        self.records.remove(&offset)
    }

    /// The most recently placed live allocation.
    #[must_use]
    pub fn last(&self) -> Option<&AllocationRecord> {
        self.records.last_key_value().map(|(_, record)| record)
    }

    /// End of the highest live span, or zero when nothing is live.
    #[must_use]
    pub fn high_water(&self) -> usize {
        self.last().map_or(0, AllocationRecord::span_end)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over live records in address order.
    pub fn iter(&self) -> impl Iterator<Item = &AllocationRecord> + '_ {
        self.records.values()
    }

    #[must_use]
    pub fn reserved_bytes(&self) -> usize {
        self.iter().map(AllocationRecord::reserved).sum()
    }

    #[must_use]
    pub fn requested_bytes(&self) -> usize {
        self.iter().map(AllocationRecord::requested).sum()
    }
}
