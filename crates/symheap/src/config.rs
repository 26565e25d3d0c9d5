//! Allocator configuration.

use crate::{log::LogLevel, sys};

/// Tunables of a [`SymmetricHeap`](crate::SymmetricHeap).
///
/// The default configuration uses the system page size and takes the two
/// boolean toggles from the `end-with-barrier` and `smp-fast-path` cargo
/// features.
///
/// ```
/// use symheap::{HeapConfig, LogLevel};
///
/// let config = HeapConfig::default()
///     .with_page_size(4096)
///     .with_end_with_barrier(true)
///     .with_log_level(LogLevel::Debug);
/// assert_eq!(config.page_size(), 4096);
/// assert!(config.end_with_barrier());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    page_size: usize,
    end_with_barrier: bool,
    smp_fast_path: bool,
    log_level: Option<LogLevel>,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            page_size: sys::page_size(),
            end_with_barrier: cfg!(feature = "end-with-barrier"),
            smp_fast_path: cfg!(feature = "smp-fast-path"),
            log_level: None,
        }
    }
}

impl HeapConfig {
    /// Granularity of plain allocations. Must be a non-zero power of two.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Whether every heap-mutating call ends with a collective barrier.
    #[must_use]
    pub const fn with_end_with_barrier(mut self, enabled: bool) -> Self {
        self.end_with_barrier = enabled;
        self
    }

    /// Whether addresses are taken relative to the same-node shared-memory
    /// mapping of the segment, when the segment has one.
    #[must_use]
    pub const fn with_smp_fast_path(mut self, enabled: bool) -> Self {
        self.smp_fast_path = enabled;
        self
    }

    /// Overrides the process-wide log level when the heap is created.
    #[must_use]
    pub const fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub const fn end_with_barrier(&self) -> bool {
        self.end_with_barrier
    }

    #[must_use]
    pub const fn smp_fast_path(&self) -> bool {
        self.smp_fast_path
    }

    #[must_use]
    pub const fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }
}
