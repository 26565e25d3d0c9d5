//! A symmetric heap shared between threads of one rank.

use core::ptr::NonNull;

use spin::{Mutex, MutexGuard};

use crate::{
    collective::Collective,
    error::AllocError,
    heap::{HeapStats, SymmetricHeap},
};

/// [`SymmetricHeap`] behind a spin lock.
///
/// Every call takes the lock for its whole duration, barrier included. Use
/// [`lock`](Self::lock) to run several operations without other threads
/// interleaving.
#[derive(Debug)]
pub struct LockedHeap<C> {
    inner: Mutex<SymmetricHeap<C>>,
}

impl<C> LockedHeap<C>
where
    C: Collective,
{
    pub const fn new(heap: SymmetricHeap<C>) -> Self {
        Self {
            inner: Mutex::new(heap),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, SymmetricHeap<C>> {
        self.inner.lock()
    }

    pub fn into_inner(self) -> SymmetricHeap<C> {
        self.inner.into_inner()
    }

    pub fn malloc(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.lock().malloc(size)
    }

    pub fn calloc(&self, count: usize, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.lock().calloc(count, size)
    }

    pub fn align(&self, alignment: usize, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.lock().align(alignment, size)
    }

    pub fn realloc(&self, ptr: *mut u8, new_size: usize) -> Result<NonNull<u8>, AllocError> {
        self.lock().realloc(ptr, new_size)
    }

    pub fn free(&self, ptr: *mut u8) {
        self.lock().free(ptr);
    }

    pub fn translate(&self, address: *const u8) -> usize {
        self.lock().translate(address)
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        self.lock().stats()
    }
}
