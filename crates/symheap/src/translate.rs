//! Local address to heap displacement translation.
//!
//! A displacement is the byte distance between an address and the heap base.
//! Because every rank maps its heap at a congruent relative offset, the
//! displacement computed locally is valid on any peer, which is what the
//! remote-access layer puts on the wire.

use snafu::{OptionExt as _, Snafu};
use snafu_utils::{Located, Location};

#[derive(Debug, Snafu)]
pub enum TranslateError {
    #[snafu(display(
        "access out of symmetric heap bounds: address={address:#x}, base={base:#x}, \
         capacity={capacity}"
    ))]
    OutOfBounds {
        address: usize,
        base: usize,
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for TranslateError {
    fn location(&self) -> Location {
        match self {
            Self::OutOfBounds { location, .. } => *location,
        }
    }
}

/// Converts addresses inside one heap segment into displacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressTranslator {
    base: usize,
    capacity: usize,
}

impl AddressTranslator {
    #[must_use]
    pub const fn new(base: usize, capacity: usize) -> Self {
        Self { base, capacity }
    }

    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the displacement of `address` from the heap base.
    ///
    /// The one-past-the-end address (`base + capacity`) is accepted; anything
    /// below the base or beyond it is [`TranslateError::OutOfBounds`].
    pub fn try_translate(&self, address: *const u8) -> Result<usize, TranslateError> {
        let address = address.addr();
        address
            .checked_sub(self.base)
            .filter(|&offset| offset <= self.capacity)
            .context(OutOfBoundsSnafu {
                address,
                base: self.base,
                capacity: self.capacity,
            })
    }

    /// Returns `true` if `address` points at a byte of the heap.
    #[must_use]
    pub fn contains(&self, address: *const u8) -> bool {
        self.try_translate(address)
            .is_ok_and(|offset| offset < self.capacity)
    }
}
