//! Resizing live allocations.

use core::ptr::{self, NonNull};

use crate::{
    bump::BumpAllocator,
    error::{AllocError, ZeroSizeSnafu},
};

impl BumpAllocator {
    /// Moves the allocation at `ptr` into a fresh block of `new_size` bytes.
    ///
    /// The new block is always placed at the top of the heap, the first
    /// `min(usable, new_size)` bytes are copied over, and the old block is
    /// freed. Growing in place is never attempted.
    ///
    /// - If `ptr` is not a live allocation (null and foreign pointers
    ///   included), this is exactly [`alloc(new_size)`](Self::alloc).
    /// - If `new_size` is zero, the old block is freed and
    ///   [`AllocError::ZeroSize`] is returned.
    /// - If the new block cannot be reserved, the old one is left untouched.
    pub fn realloc(&mut self, ptr: *mut u8, new_size: usize) -> Result<NonNull<u8>, AllocError> {
        let Some(old) = self.lookup(ptr).copied() else {
            return self.alloc(new_size);
        };

        if new_size == 0 {
            self.release(old.offset());
            return ZeroSizeSnafu.fail();
        }

        let new_ptr = self.alloc(new_size)?;
        let count = old.usable().min(new_size);
        let old_ptr = self.ptr_at(old.offset());
        unsafe {
            ptr::copy_nonoverlapping(old_ptr.as_ptr(), new_ptr.as_ptr(), count);
        }
        self.release(old.offset());

        Ok(new_ptr)
    }
}
