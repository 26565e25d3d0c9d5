//! The per-rank symmetric heap.

use alloc::string::ToString as _;
use core::{error::Error, ptr::NonNull};

use snafu::{OptionExt as _, ensure};
use snafu_utils::{Located, Report};

use crate::{
    bump::BumpAllocator,
    collective::Collective,
    config::HeapConfig,
    error::{AllocError, ArrayOverflowSnafu, InitError, InvalidPageSizeSnafu},
    log,
    registry::AllocationRecord,
    segment::HeapSegment,
    translate::TranslateError,
};

/// A snapshot of heap usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Size of the segment in bytes.
    pub capacity: usize,
    /// Bytes below the bump offset, holes left by out-of-order frees
    /// included.
    pub used: usize,
    pub live_allocations: usize,
    /// Bytes reserved by live allocations.
    pub reserved_bytes: usize,
    /// Bytes requested by live allocations.
    pub requested_bytes: usize,
}

/// The symmetric heap of the calling rank.
///
/// Owns the segment, the allocator working on it, and the handle to the job's
/// [`Collective`] services. All operations follow the same pattern: delegate
/// to the [`BumpAllocator`], log the outcome, and, if
/// [`HeapConfig::end_with_barrier`] is set, finish with a barrier across all
/// ranks. The barrier is reached whether the operation succeeded or not, so
/// ranks calling the heap in lock-step stay in lock-step.
///
/// ```
/// use symheap::{HeapConfig, HeapSegment, SingleRank, SymmetricHeap};
///
/// let segment = HeapSegment::allocate(16 * 4096, 4096).unwrap();
/// let config = HeapConfig::default().with_page_size(4096);
/// let mut heap = SymmetricHeap::new(segment, SingleRank, config).unwrap();
///
/// let ptr = heap.malloc(100).unwrap();
/// assert_eq!(heap.translate(ptr.as_ptr()), 0);
/// assert_eq!(heap.current_offset(), 4096);
///
/// heap.free(ptr.as_ptr());
/// assert_eq!(heap.current_offset(), 0);
/// ```
#[derive(Debug)]
pub struct SymmetricHeap<C> {
    allocator: BumpAllocator,
    collective: C,
    config: HeapConfig,
    segment: HeapSegment,
}

impl<C> SymmetricHeap<C>
where
    C: Collective,
{
    pub fn new(segment: HeapSegment, collective: C, config: HeapConfig) -> Result<Self, InitError> {
        let page_size = config.page_size();
        ensure!(
            page_size.is_power_of_two(),
            InvalidPageSizeSnafu { page_size }
        );

        log::set_rank(collective.rank());
        if let Some(level) = config.log_level() {
            log::set_max_level(level);
        }

        let base = segment.active_base(config.smp_fast_path());
        let allocator = unsafe { BumpAllocator::new(base, segment.size(), page_size) };
        info!(
            "symmetric heap ready: base={:p}, capacity={}, page_size={page_size}",
            base,
            segment.size()
        );

        Ok(Self {
            allocator,
            collective,
            config,
            segment,
        })
    }

    /// Returns the displacement of `address` from the heap base.
    ///
    /// An address outside the heap means the caller is about to hand a peer
    /// an offset it cannot safely access. That is not recoverable: the whole
    /// job is aborted through [`Collective::abort`].
    pub fn translate(&self, address: *const u8) -> usize {
        match self.try_translate(address) {
            Ok(offset) => offset,
            Err(err) => self.fatal(err),
        }
    }

    pub fn try_translate(&self, address: *const u8) -> Result<usize, TranslateError> {
        self.allocator.translator().try_translate(address)
    }

    /// Allocates `size` bytes, rounded up to whole pages.
    pub fn malloc(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let result = self.allocator.alloc(size);
        self.finish("malloc", &result);
        result
    }

    /// Allocates room for `count` elements of `size` bytes, zero-filled.
    pub fn calloc(&mut self, count: usize, size: usize) -> Result<NonNull<u8>, AllocError> {
        let result = count
            .checked_mul(size)
            .context(ArrayOverflowSnafu { count, size })
            .and_then(|total| {
                let ptr = self.allocator.alloc(total)?;
                unsafe { ptr.as_ptr().write_bytes(0, total) };
                Ok(ptr)
            });
        self.finish("calloc", &result);
        result
    }

    /// Allocates `size` bytes at a multiple of `alignment`.
    pub fn align(&mut self, alignment: usize, size: usize) -> Result<NonNull<u8>, AllocError> {
        let result = self.allocator.aligned_alloc(alignment, size);
        self.finish("align", &result);
        result
    }

    /// Moves the allocation at `ptr` into a block of `new_size` bytes.
    ///
    /// See [`BumpAllocator::realloc`] for the exact semantics.
    pub fn realloc(&mut self, ptr: *mut u8, new_size: usize) -> Result<NonNull<u8>, AllocError> {
        let result = self.allocator.realloc(ptr, new_size);
        self.finish("realloc", &result);
        result
    }

    /// Frees the allocation at `ptr`.
    ///
    /// Freeing a null pointer, a pointer outside the heap, or a pointer that
    /// is not a live allocation is logged as a warning and otherwise ignored.
    pub fn free(&mut self, ptr: *mut u8) {
        match self.allocator.free(ptr) {
            Ok(record) => trace!(
                "free: ptr={ptr:p}, reserved={}, current_offset={}",
                record.reserved(),
                self.allocator.current_offset()
            ),
            Err(err) => warn!("{err}"),
        }
        self.end_of_call();
    }

    /// Returns `true` if `ptr` points into the heap segment.
    #[must_use]
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.allocator.translator().contains(ptr)
    }

    /// Number of bytes usable from `ptr` on, if `ptr` is a live allocation.
    #[must_use]
    pub fn usable_size(&self, ptr: *const u8) -> Option<usize> {
        self.allocator.lookup(ptr).map(AllocationRecord::usable)
    }

    #[must_use]
    pub fn current_offset(&self) -> usize {
        self.allocator.current_offset()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.allocator.capacity()
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.allocator.page_size()
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.collective.rank()
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let registry = self.allocator.registry();
        HeapStats {
            capacity: self.allocator.capacity(),
            used: self.allocator.current_offset(),
            live_allocations: registry.len(),
            reserved_bytes: registry.reserved_bytes(),
            requested_bytes: registry.requested_bytes(),
        }
    }

    #[must_use]
    pub fn allocator(&self) -> &BumpAllocator {
        &self.allocator
    }

    #[must_use]
    pub fn collective(&self) -> &C {
        &self.collective
    }

    #[must_use]
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    #[must_use]
    pub fn segment(&self) -> &HeapSegment {
        &self.segment
    }

    fn finish(&self, op: &str, result: &Result<NonNull<u8>, AllocError>) {
        match result {
            Ok(ptr) => trace!(
                "{op}: ptr={:p}, current_offset={}",
                *ptr,
                self.allocator.current_offset()
            ),
            Err(err @ AllocError::ZeroSize { .. }) => debug!("{op}: {err}"),
            Err(err) => warn!("{op}: {err}"),
        }
        self.end_of_call();
    }

    fn end_of_call(&self) {
        if self.config.end_with_barrier() {
            self.collective.barrier_all();
        }
    }

    fn fatal<E>(&self, err: E) -> !
    where
        E: Error + Located,
    {
        error!("{err}");
        let report = Report::located(err);
        self.collective.abort(&report.to_string())
    }
}
