//! The memory region backing a symmetric heap.

use alloc::alloc::{alloc_zeroed, dealloc};
use core::{
    alloc::{Layout, LayoutError},
    ptr::NonNull,
};

use snafu::{OptionExt as _, ResultExt as _, Snafu, ensure};
use snafu_utils::{Located, Location};

#[derive(Debug, Snafu)]
pub enum SegmentError {
    #[snafu(display("symmetric heap segment must not be empty"))]
    EmptySegment {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("invalid segment layout: size={size}, align={align}"))]
    InvalidLayout {
        size: usize,
        align: usize,
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        source: LayoutError,
    },
    #[snafu(display("failed to allocate segment memory: size={size}"))]
    OutOfMemory {
        size: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for SegmentError {
    fn location(&self) -> Location {
        match self {
            Self::EmptySegment { location }
            | Self::InvalidLayout { location, .. }
            | Self::OutOfMemory { location, .. } => *location,
        }
    }
}

/// A contiguous region of `size` bytes that every rank maps at a congruent
/// relative address.
///
/// The region either comes from the runtime ([`from_raw_parts`]) or is owned
/// by the segment ([`allocate`]) and released when the segment is dropped.
///
/// The segment may also know a second mapping of the same memory: the address
/// at which the region is reachable through the same-node shared-memory
/// window. Which of the two bases the heap works with is decided by
/// [`HeapConfig::smp_fast_path`](crate::HeapConfig::smp_fast_path).
///
/// [`from_raw_parts`]: Self::from_raw_parts
/// [`allocate`]: Self::allocate
#[derive(Debug)]
pub struct HeapSegment {
    base: NonNull<u8>,
    smp_base: Option<NonNull<u8>>,
    size: usize,
    owned: Option<Layout>,
}

unsafe impl Send for HeapSegment {}

impl HeapSegment {
    /// Wraps a region mapped by the runtime.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - `base..base + size` is valid for reads and writes
    /// - the region is not used by anything but the heap built on it
    /// - the region stays mapped for the lifetime of the segment
    #[must_use]
    pub const unsafe fn from_raw_parts(base: NonNull<u8>, size: usize) -> Self {
        Self {
            base,
            smp_base: None,
            size,
            owned: None,
        }
    }

    /// Records the same-node shared-memory mapping of the region.
    ///
    /// # Safety
    ///
    /// `smp_base..smp_base + self.size()` must satisfy the same requirements
    /// as the region passed to [`from_raw_parts`](Self::from_raw_parts) and
    /// must map the same memory.
    #[must_use]
    pub unsafe fn with_smp_base(mut self, smp_base: NonNull<u8>) -> Self {
        self.smp_base = Some(smp_base);
        self
    }

    /// Allocates a zero-filled region of `size` bytes aligned to `align`.
    pub fn allocate(size: usize, align: usize) -> Result<Self, SegmentError> {
        ensure!(size > 0, EmptySegmentSnafu);
        let layout =
            Layout::from_size_align(size, align).context(InvalidLayoutSnafu { size, align })?;
        let base =
            NonNull::new(unsafe { alloc_zeroed(layout) }).context(OutOfMemorySnafu { size })?;
        Ok(Self {
            base,
            smp_base: None,
            size,
            owned: Some(layout),
        })
    }

    #[must_use]
    pub const fn base(&self) -> NonNull<u8> {
        self.base
    }

    #[must_use]
    pub const fn smp_base(&self) -> Option<NonNull<u8>> {
        self.smp_base
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub const fn is_owned(&self) -> bool {
        self.owned.is_some()
    }

    /// Returns the base the allocator should hand out addresses from.
    pub(crate) fn active_base(&self, smp_fast_path: bool) -> NonNull<u8> {
        match self.smp_base {
            Some(smp_base) if smp_fast_path => smp_base,
            _ => self.base,
        }
    }
}

impl Drop for HeapSegment {
    fn drop(&mut self) {
        if let Some(layout) = self.owned {
            unsafe { dealloc(self.base.as_ptr(), layout) }
        }
    }
}
