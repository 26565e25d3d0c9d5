//! Allocation with caller-chosen alignment.
//!
//! The bump offset is only page-aligned after plain allocations, so an aligned
//! request reserves `size + alignment - 1` bytes, enough to slide the start of
//! the block up to the next multiple of `alignment` wherever the candidate
//! lands. The whole reserved span is recorded, so freeing the block gives all
//! of it back.

use core::ptr::NonNull;

use snafu::{OptionExt as _, ensure};

use crate::{
    bump::BumpAllocator,
    error::{AllocError, InvalidAlignmentSnafu, SizeOverflowSnafu, ZeroSizeSnafu},
    registry::AllocationRecord,
};

impl BumpAllocator {
    /// Reserves `size` bytes starting at an address that is a multiple of
    /// `alignment`.
    ///
    /// `alignment` must be a power of two. On failure the bump offset is left
    /// unchanged.
    pub fn aligned_alloc(
        &mut self,
        alignment: usize,
        size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        ensure!(
            alignment.is_power_of_two(),
            InvalidAlignmentSnafu { alignment }
        );
        ensure!(size > 0, ZeroSizeSnafu);
        let span = size.checked_add(alignment - 1).context(SizeOverflowSnafu {
            size,
            granularity: alignment,
        })?;

        let candidate = self.reserve(size, span)?;
        let candidate_addr = self.ptr_at(candidate).as_ptr().addr();
        let mask = !(alignment - 1);
        let aligned_addr = (candidate_addr + alignment - 1) & mask;
        let offset = candidate + (aligned_addr - candidate_addr);

        let previous = self
            .registry_mut()
            .insert(AllocationRecord::new(offset, candidate, span, size));
        debug_assert!(previous.is_none(), "overlapping allocation at {offset}");

        Ok(self.ptr_at(offset))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::bump::tests::{PAGE, with_test_allocator};

    #[test]
    fn test_result_is_aligned_within_slack() {
        with_test_allocator(16 * PAGE, |allocator| {
            // Knock the bump offset off page alignment first.
            allocator.aligned_alloc(1, 3).unwrap();

            for alignment in [1, 2, 8, 64, 256, 4096] {
                let candidate = allocator.current_offset();
                let ptr = allocator.aligned_alloc(alignment, 10).unwrap();
                let offset = allocator.translator().try_translate(ptr.as_ptr()).unwrap();

                assert_eq!(ptr.as_ptr().addr() % alignment, 0);
                assert!(candidate <= offset && offset < candidate + alignment);
                assert_eq!(allocator.current_offset(), candidate + 10 + alignment - 1);

                let record = allocator.lookup(ptr.as_ptr()).unwrap();
                assert_eq!(record.span_start(), candidate);
                assert_eq!(record.reserved(), 10 + alignment - 1);
                assert!(record.usable() >= 10);
            }
        });
    }

    #[test]
    fn test_free_returns_whole_span() {
        with_test_allocator(4 * PAGE, |allocator| {
            allocator.aligned_alloc(1, 5).unwrap();
            let base_offset = allocator.current_offset();

            for _ in 0..100 {
                let ptr = allocator.aligned_alloc(64, 100).unwrap();
                allocator.free(ptr.as_ptr()).unwrap();
                assert_eq!(allocator.current_offset(), base_offset);
            }
        });
    }

    #[test]
    fn test_rejects_bad_arguments() {
        with_test_allocator(PAGE, |allocator| {
            assert!(matches!(
                allocator.aligned_alloc(0, 8),
                Err(AllocError::InvalidAlignment { alignment: 0, .. })
            ));
            assert!(matches!(
                allocator.aligned_alloc(24, 8),
                Err(AllocError::InvalidAlignment { alignment: 24, .. })
            ));
            assert!(matches!(
                allocator.aligned_alloc(8, 0),
                Err(AllocError::ZeroSize { .. })
            ));
            assert!(matches!(
                allocator.aligned_alloc(8, usize::MAX),
                Err(AllocError::SizeOverflow { .. })
            ));
            assert_eq!(allocator.current_offset(), 0);
        });
    }

    #[test]
    fn test_failure_rolls_back() {
        with_test_allocator(PAGE, |allocator| {
            allocator.aligned_alloc(1, PAGE - 8).unwrap();
            assert!(matches!(
                allocator.aligned_alloc(16, 8),
                Err(AllocError::InsufficientMemory { .. })
            ));
            assert_eq!(allocator.current_offset(), PAGE - 8);

            // An exact fit still succeeds.
            let ptr = allocator.aligned_alloc(1, 8).unwrap();
            assert_eq!(
                allocator.translator().try_translate(ptr.as_ptr()).unwrap(),
                PAGE - 8
            );
            assert_eq!(allocator.current_offset(), PAGE);
        });
    }

    #[test]
    fn test_mixed_with_plain_allocations() {
        with_test_allocator(8 * PAGE, |allocator| {
            let a = allocator.aligned_alloc(32, 40).unwrap();
            let b = allocator.alloc(100).unwrap();
            let b_offset = allocator.translator().try_translate(b.as_ptr()).unwrap();
            assert_eq!(b_offset, 40 + 31);
            assert_eq!(allocator.current_offset(), 40 + 31 + PAGE);

            allocator.free(b.as_ptr()).unwrap();
            allocator.free(a.as_ptr()).unwrap();
            assert_eq!(allocator.current_offset(), 0);
        });
    }
}
