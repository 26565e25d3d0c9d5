//! Queries about the host system.

use cfg_if::cfg_if;

/// Page size assumed when the system cannot be asked.
pub const FALLBACK_PAGE_SIZE: usize = 4096;

/// Returns the page size of the running system.
///
/// Falls back to [`FALLBACK_PAGE_SIZE`] if the query fails or reports a value
/// that is not a power of two.
#[must_use]
pub fn page_size() -> usize {
    cfg_if! {
        if #[cfg(unix)] {
            let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            usize::try_from(size)
                .ok()
                .filter(|size| size.is_power_of_two())
                .unwrap_or(FALLBACK_PAGE_SIZE)
        } else {
            FALLBACK_PAGE_SIZE
        }
    }
}
