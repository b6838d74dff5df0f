//! Platform queries.
//!
//! The only `unsafe` in this crate lives here: one `sysconf` call.

#![allow(unsafe_code)]

use std::sync::OnceLock;

/// Page size assumed where the platform cannot be asked.
pub const FALLBACK_PAGE_SIZE: usize = 4096;

/// The platform's virtual memory page size in bytes. Cached after the
/// first call.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(query_page_size)
}

#[cfg(unix)]
fn query_page_size() -> usize {
    // SAFETY: sysconf has no preconditions; it reports failure as -1.
    let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if raw > 0 {
        raw as usize
    } else {
        FALLBACK_PAGE_SIZE
    }
}

#[cfg(not(unix))]
fn query_page_size() -> usize {
    FALLBACK_PAGE_SIZE
}
