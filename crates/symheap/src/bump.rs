//! Bump-pointer reservation over a heap segment.
//!
//! # Algorithm
//!
//! The allocator keeps a single offset, `current`, measured from the heap
//! base. Every request takes the bytes right above `current` and advances it:
//!
//! ```text
//!  base                                  current              base + capacity
//!   │                                       │                        │
//!   ▼                                       ▼                        ▼
//!   ┌───────────┬───────────┬───────────────┬────────────────────────┐
//!   │  page 0   │  page 1   │  page 2 .. 3  │       unreserved       │
//!   └───────────┴───────────┴───────────────┴────────────────────────┘
//! ```
//!
//! Plain allocations are rounded up to whole pages. A request that would move
//! `current` beyond the end of the segment is rolled back and reported as
//! [`AllocError::InsufficientMemory`]; filling the segment exactly to its last
//! byte is allowed.
//!
//! # Reclamation
//!
//! A bump region can only give space back from the top. Freeing the most
//! recent allocation retracts `current` to the end of the highest allocation
//! still live, which also reclaims older allocations freed earlier. Freeing an
//! older allocation only drops its record; `current` stays where it is until
//! everything above has been freed too.
//!
//! After every operation `current` equals the registry's high-water mark.

use core::ptr::NonNull;

use snafu::{OptionExt as _, ensure};

use crate::{
    error::{
        AllocError, FreeError, InsufficientMemorySnafu, NullPointerSnafu, OutsideHeapSnafu,
        SizeOverflowSnafu, UnknownPointerSnafu, ZeroSizeSnafu,
    },
    registry::{AllocationRecord, AllocationRegistry},
    translate::AddressTranslator,
};

/// Allocator state of one symmetric heap segment.
///
/// The allocator is `Send` but not `Sync`; sharing it between threads needs
/// external locking such as [`LockedHeap`](crate::LockedHeap).
#[derive(Debug)]
pub struct BumpAllocator {
    base: NonNull<u8>,
    translator: AddressTranslator,
    page_size: usize,
    current: usize,
    registry: AllocationRegistry,
}

unsafe impl Send for BumpAllocator {}

impl BumpAllocator {
    /// Creates an allocator with nothing reserved.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - `base..base + capacity` is valid for reads and writes
    /// - the region is used by nothing but this allocator and the callers it
    ///   hands memory to
    /// - the region outlives the allocator
    /// - `page_size` is a power of two
    #[must_use]
    pub unsafe fn new(base: NonNull<u8>, capacity: usize, page_size: usize) -> Self {
        assert!(page_size.is_power_of_two(), "page size must be a power of two");
        Self {
            base,
            translator: AddressTranslator::new(base.as_ptr().addr(), capacity),
            page_size,
            current: 0,
            registry: AllocationRegistry::new(),
        }
    }

    #[must_use]
    pub const fn base(&self) -> NonNull<u8> {
        self.base
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.translator.capacity()
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Displacement of the next byte to be reserved.
    #[must_use]
    pub const fn current_offset(&self) -> usize {
        self.current
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.capacity() - self.current
    }

    #[must_use]
    pub const fn translator(&self) -> &AddressTranslator {
        &self.translator
    }

    #[must_use]
    pub const fn registry(&self) -> &AllocationRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut AllocationRegistry {
        &mut self.registry
    }

    /// Returns the record of the live allocation starting at `ptr`.
    #[must_use]
    pub fn lookup(&self, ptr: *const u8) -> Option<&AllocationRecord> {
        let offset = self.translator.try_translate(ptr).ok()?;
        self.registry.get(offset)
    }

    /// Reserves `size` bytes, rounded up to a whole number of pages.
    pub fn alloc(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
        ensure!(size > 0, ZeroSizeSnafu);
        let reserved = size
            .checked_next_multiple_of(self.page_size)
            .context(SizeOverflowSnafu {
                size,
                granularity: self.page_size,
            })?;

        let candidate = self.reserve(size, reserved)?;
        let previous = self
            .registry
            .insert(AllocationRecord::new(candidate, candidate, reserved, size));
        debug_assert!(previous.is_none(), "overlapping allocation at {candidate}");

        Ok(self.ptr_at(candidate))
    }

    /// Releases the live allocation starting at `ptr`.
    ///
    /// Returns the removed record. On error nothing is changed.
    pub fn free(&mut self, ptr: *mut u8) -> Result<AllocationRecord, FreeError> {
        ensure!(!ptr.is_null(), NullPointerSnafu);
        let address = ptr.addr();
        let offset = self
            .translator
            .try_translate(ptr)
            .ok()
            .filter(|&offset| offset < self.capacity())
            .context(OutsideHeapSnafu { address })?;
        self.release(offset)
            .context(UnknownPointerSnafu { address, offset })
    }

    /// Advances `current` by `span` bytes and returns its previous value.
    ///
    /// The new top of the heap is validated through the address translator;
    /// if it falls outside the segment the advance is undone.
    pub(crate) fn reserve(&mut self, requested: usize, span: usize) -> Result<usize, AllocError> {
        let candidate = self.current;
        let available = self.remaining();
        let end = candidate
            .checked_add(span)
            .context(InsufficientMemorySnafu {
                requested,
                reserved: span,
                available,
            })?;

        self.current = end;
        let top = self.base.as_ptr().wrapping_add(end);
        if self.translator.try_translate(top).is_err() {
            self.current = candidate;
            return InsufficientMemorySnafu {
                requested,
                reserved: span,
                available,
            }
            .fail();
        }

        Ok(candidate)
    }

    /// Drops the record at `offset` and retracts `current` to the high-water
    /// mark of what is still live.
    pub(crate) fn release(&mut self, offset: usize) -> Option<AllocationRecord> {
        let record = self.registry.remove(offset)?;
        let high_water = self.registry.high_water();
        debug_assert!(high_water <= self.current);
        self.current = high_water;
        Some(record)
    }

    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.capacity());
        // `offset` never exceeds the capacity, so the result stays within (or
        // one past the end of) the segment.
        unsafe { self.base.add(offset) }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
pub(crate) mod tests {
    use alloc::vec::Vec;
    use core::ptr;

    use super::*;
    use crate::segment::HeapSegment;

    pub(crate) const PAGE: usize = 4096;

    pub(crate) fn with_test_allocator<F>(capacity: usize, test_fn: F)
    where
        F: FnOnce(&mut BumpAllocator),
    {
        let segment = HeapSegment::allocate(capacity, PAGE).unwrap();
        let mut allocator = unsafe { BumpAllocator::new(segment.base(), capacity, PAGE) };
        test_fn(&mut allocator);
        assert_eq!(
            allocator.current_offset(),
            allocator.registry().high_water(),
            "bump offset diverged from the registry"
        );
    }

    fn offset_of(allocator: &BumpAllocator, ptr: NonNull<u8>) -> usize {
        allocator.translator().try_translate(ptr.as_ptr()).unwrap()
    }

    #[test]
    fn test_alloc_rounds_to_pages() {
        with_test_allocator(16 * PAGE, |allocator| {
            for (size, reserved) in [(1, PAGE), (PAGE, PAGE), (PAGE + 1, 2 * PAGE)] {
                let before = allocator.current_offset();
                let ptr = allocator.alloc(size).unwrap();
                assert_eq!(offset_of(allocator, ptr), before);
                assert_eq!(allocator.current_offset(), before + reserved);

                let record = allocator.lookup(ptr.as_ptr()).unwrap();
                assert_eq!(record.reserved(), reserved);
                assert_eq!(record.requested(), size);
            }
        });
    }

    #[test]
    fn test_alloc_memory_is_writable() {
        with_test_allocator(4 * PAGE, |allocator| unsafe {
            let ptr = allocator.alloc(3000).unwrap();
            ptr.as_ptr().write_bytes(0xa5, 3000);
            assert_eq!(ptr.as_ptr().add(2999).read(), 0xa5);
        });
    }

    #[test]
    fn test_exhaustion_rolls_back() {
        with_test_allocator(4 * PAGE, |allocator| {
            let ptrs = (0..4).map(|_| allocator.alloc(100).unwrap()).collect::<Vec<_>>();
            assert_eq!(ptrs.len(), 4);
            assert_eq!(allocator.current_offset(), 4 * PAGE);

            let err = allocator.alloc(1).unwrap_err();
            assert!(matches!(
                err,
                AllocError::InsufficientMemory {
                    requested: 1,
                    reserved: PAGE,
                    available: 0,
                    ..
                }
            ));
            assert_eq!(allocator.current_offset(), 4 * PAGE);
            assert_eq!(allocator.registry().len(), 4);
        });
    }

    #[test]
    fn test_oversized_request_fails_without_advancing() {
        with_test_allocator(4 * PAGE, |allocator| {
            allocator.alloc(PAGE).unwrap();
            assert!(matches!(
                allocator.alloc(4 * PAGE),
                Err(AllocError::InsufficientMemory { .. })
            ));
            assert!(matches!(
                allocator.alloc(usize::MAX),
                Err(AllocError::SizeOverflow { .. })
            ));
            assert!(matches!(
                allocator.alloc(usize::MAX - 2 * PAGE),
                Err(AllocError::InsufficientMemory { .. })
            ));
            assert_eq!(allocator.current_offset(), PAGE);
        });
    }

    #[test]
    fn test_zero_size() {
        with_test_allocator(PAGE, |allocator| {
            assert!(matches!(allocator.alloc(0), Err(AllocError::ZeroSize { .. })));
            assert_eq!(allocator.current_offset(), 0);
            assert!(allocator.registry().is_empty());
        });
    }

    #[test]
    fn test_free_most_recent_retracts() {
        with_test_allocator(4 * PAGE, |allocator| {
            let a = allocator.alloc(PAGE).unwrap();
            let b = allocator.alloc(2 * PAGE).unwrap();
            let record = allocator.free(b.as_ptr()).unwrap();
            assert_eq!(record.reserved(), 2 * PAGE);
            assert_eq!(allocator.current_offset(), PAGE);

            allocator.free(a.as_ptr()).unwrap();
            assert_eq!(allocator.current_offset(), 0);
            assert!(allocator.registry().is_empty());
        });
    }

    #[test]
    fn test_free_out_of_order_keeps_later_allocations() {
        with_test_allocator(8 * PAGE, |allocator| {
            let a = allocator.alloc(PAGE).unwrap();
            let b = allocator.alloc(PAGE).unwrap();
            let c = allocator.alloc(PAGE).unwrap();

            allocator.free(a.as_ptr()).unwrap();
            assert_eq!(allocator.current_offset(), 3 * PAGE);
            allocator.free(b.as_ptr()).unwrap();
            assert_eq!(allocator.current_offset(), 3 * PAGE);

            // The next allocation must not land on `c`.
            let d = allocator.alloc(PAGE).unwrap();
            assert_eq!(offset_of(allocator, d), 3 * PAGE);
            assert_ne!(d, c);

            allocator.free(d.as_ptr()).unwrap();
            allocator.free(c.as_ptr()).unwrap();
            assert_eq!(allocator.current_offset(), 0);
        });
    }

    #[test]
    fn test_free_rejections_change_nothing() {
        with_test_allocator(4 * PAGE, |allocator| {
            assert!(matches!(
                allocator.free(ptr::null_mut()),
                Err(FreeError::NullPointer { .. })
            ));
            assert!(matches!(
                allocator.free(allocator.ptr_at(0).as_ptr()),
                Err(FreeError::UnknownPointer { offset: 0, .. })
            ));

            let a = allocator.alloc(10).unwrap();
            let inner = unsafe { a.as_ptr().add(5) };
            assert!(matches!(
                allocator.free(inner),
                Err(FreeError::UnknownPointer { offset: 5, .. })
            ));

            let end = allocator.ptr_at(4 * PAGE).as_ptr();
            assert!(matches!(
                allocator.free(end),
                Err(FreeError::OutsideHeap { .. })
            ));
            let mut outside = 0_u8;
            assert!(matches!(
                allocator.free(&raw mut outside),
                Err(FreeError::OutsideHeap { .. })
            ));

            assert_eq!(allocator.current_offset(), PAGE);
            assert_eq!(allocator.registry().len(), 1);

            allocator.free(a.as_ptr()).unwrap();
            assert!(matches!(
                allocator.free(a.as_ptr()),
                Err(FreeError::UnknownPointer { .. })
            ));
        });
    }
}
