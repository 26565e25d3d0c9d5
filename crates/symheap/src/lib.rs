//! Local allocator for a symmetric heap.
//!
//! In a partitioned global address space job every rank owns a heap segment
//! of the same size, and an object allocated by all ranks in the same order
//! lands at the same displacement from each rank's heap base. Remote accesses
//! therefore only need the displacement of a local address, which peers add
//! to their own idea of the target rank's base.
//!
//! This crate manages one rank's segment. It keeps the allocation sequence
//! deterministic, so ranks issuing the same calls get the same offsets back.
//!
//! # Components
//!
//! - [`AddressTranslator`] turns local addresses into heap offsets and rejects
//!   anything outside the segment.
//! - [`AllocationRegistry`] maps the offset of every live allocation to its
//!   [`AllocationRecord`].
//! - [`BumpAllocator`] reserves page-rounded blocks from the top of the heap,
//!   hands out blocks at a requested alignment, and moves blocks on resize.
//! - [`SymmetricHeap`] ties the allocator to a [`HeapSegment`] and the job's
//!   [`Collective`] services. It logs every operation and can end each call
//!   with a job-wide barrier.
//! - [`LockedHeap`] shares a [`SymmetricHeap`] between threads of one rank.
//!
//! # Example
//!
//! ```rust
//! use symheap::{HeapConfig, HeapSegment, LogLevel, SingleRank, SymmetricHeap};
//!
//! let segment = HeapSegment::allocate(2 * 4096, 4096).unwrap();
//! let config = HeapConfig::default()
//!     .with_page_size(4096)
//!     .with_log_level(LogLevel::Error);
//! let mut heap = SymmetricHeap::new(segment, SingleRank, config).unwrap();
//!
//! let a = heap.malloc(100).unwrap();
//! let b = heap.malloc(100).unwrap();
//! assert_eq!(heap.translate(b.as_ptr()), 4096);
//!
//! // The heap is full now.
//! assert!(heap.malloc(1).is_err());
//!
//! heap.free(b.as_ptr());
//! heap.free(a.as_ptr());
//! assert_eq!(heap.current_offset(), 0);
//! ```
//!
//! # Features
//!
//! - `std` (default): log to stderr when no [`LogSink`] is installed.
//! - `end-with-barrier`: turn on [`HeapConfig::end_with_barrier`] by default.
//! - `smp-fast-path`: turn on [`HeapConfig::smp_fast_path`] by default.

#![no_std]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[macro_use]
pub mod log;

mod aligned;
mod bump;
mod collective;
mod config;
mod error;
mod heap;
mod realloc;
mod registry;
mod segment;
mod sync;
pub mod sys;
mod translate;

pub use self::{
    bump::BumpAllocator,
    collective::{Collective, SingleRank},
    config::HeapConfig,
    error::{AllocError, FreeError, InitError},
    heap::{HeapStats, SymmetricHeap},
    log::{LogLevel, LogSink},
    registry::{AllocationRecord, AllocationRegistry},
    segment::{HeapSegment, SegmentError},
    sync::LockedHeap,
    translate::{AddressTranslator, TranslateError},
};
