//! Allocation sizing policy.
//!
//! Buffer bodies are `min_elem_size * 2^k`. Rounding is a pure function of
//! the request and the minimum size; the configured limit is applied (if at
//! all) by the caller.

/// Largest body size the pool will ever round to.
pub const MAX_ALLOCATION_SIZE: usize = isize::MAX as usize;

/// Round `requested` up to the smallest `min_elem_size * 2^k` that holds it.
///
/// Returns `None` when the request (or its rounding) exceeds
/// [`MAX_ALLOCATION_SIZE`], or when `min_elem_size` is zero.
pub fn align_allocation_size(requested: usize, min_elem_size: usize) -> Option<usize> {
    if requested > MAX_ALLOCATION_SIZE || min_elem_size == 0 {
        return None;
    }
    let mut aligned = min_elem_size;
    while requested > aligned {
        aligned = aligned.checked_mul(2)?;
    }
    if aligned > MAX_ALLOCATION_SIZE {
        return None;
    }
    Some(aligned)
}
