use snafu::Snafu;
use snafu_utils::{Located, Location};

/// Why an allocation request was not served.
///
/// None of these leave a trace in the heap: the bump offset and the registry
/// are exactly as they were before the call.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AllocError {
    #[snafu(display("zero-sized symmetric allocation requested"))]
    ZeroSize {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("alignment is not a power of two: alignment={alignment}"))]
    InvalidAlignment {
        alignment: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("allocation size overflows: size={size}, granularity={granularity}"))]
    SizeOverflow {
        size: usize,
        granularity: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("array allocation size overflows: count={count}, size={size}"))]
    ArrayOverflow {
        count: usize,
        size: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display(
        "insufficient memory in symmetric heap: requested={requested}, reserved={reserved}, \
         available={available}"
    ))]
    InsufficientMemory {
        requested: usize,
        reserved: usize,
        available: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for AllocError {
    fn location(&self) -> Location {
        match self {
            Self::ZeroSize { location }
            | Self::InvalidAlignment { location, .. }
            | Self::SizeOverflow { location, .. }
            | Self::ArrayOverflow { location, .. }
            | Self::InsufficientMemory { location, .. } => *location,
        }
    }
}

/// Why a pointer could not be freed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FreeError {
    #[snafu(display("invalid pointer to free: null"))]
    NullPointer {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("invalid pointer to free: address={address:#x} is outside the symmetric heap"))]
    OutsideHeap {
        address: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display(
        "invalid pointer to free: address={address:#x} (offset={offset}) is not a live allocation"
    ))]
    UnknownPointer {
        address: usize,
        offset: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for FreeError {
    fn location(&self) -> Location {
        match self {
            Self::NullPointer { location }
            | Self::OutsideHeap { location, .. }
            | Self::UnknownPointer { location, .. } => *location,
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InitError {
    #[snafu(display("page size is not a power of two: page_size={page_size}"))]
    InvalidPageSize {
        page_size: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for InitError {
    fn location(&self) -> Location {
        match self {
            Self::InvalidPageSize { location, .. } => *location,
        }
    }
}
