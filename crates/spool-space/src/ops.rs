//! The acquisition and release protocol.
//!
//! Operation names combine three choices:
//!
//! - **source**: `allocate*` creates a buffer, `get_free*` reuses one from
//!   the free list, `get_*` tries reuse then falls back to allocation;
//! - **lifetime**: normal, `transient` (never cached) or `transient_lease`;
//! - **destination**: detached (returned to the caller only), `to_full`
//!   or `to_free`.
//!
//! Functions taking a [`SpaceGuard`] run under a lock the caller already
//! holds. Functions taking a [`MemorySpace`] take the lock themselves when
//! they touch a list. Every returned buffer is acquired by `owner`.

use tracing::trace;

use spool_core::{OwnerId, PoolBuffer, PoolError};

use crate::callback::SpaceCallback;
use crate::handle::BufferHandle;
use crate::list::{Direction, ListKind};
use crate::migrate::migrate_outstanding_writes;
use crate::retrieval::Retrieval;
use crate::space::{BufferProcessor, MemorySpace, SpaceGuard};

/// Clamp a request to the space's minimum element size.
pub fn size_adjustment<B, R, C>(size: usize, space: &MemorySpace<B, R, C>) -> usize
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    size.max(space.min_elem_size())
}

/// Allocate a new buffer acquired by `owner`, attached to no list.
pub fn allocate<B, R, C>(
    space: &MemorySpace<B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Result<BufferHandle<B>, PoolError>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let buffer = space.allocate(size_adjustment(size, space))?;
    buffer.acquire(owner);
    Ok(buffer)
}

/// Allocate a detached buffer that will be deallocated, not cached, on
/// release.
pub fn allocate_transient<B, R, C>(
    space: &MemorySpace<B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Result<BufferHandle<B>, PoolError>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let buffer = allocate(space, size, owner)?;
    debug_assert!(buffer.acquired_by(owner));
    buffer.set_transient();
    Ok(buffer)
}

/// Allocate a detached transient buffer that is also leased.
pub fn allocate_transient_lease<B, R, C>(
    space: &MemorySpace<B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Result<BufferHandle<B>, PoolError>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let buffer = allocate_transient(space, size, owner)?;
    buffer.set_lease();
    Ok(buffer)
}

/// Allocate a new buffer and link it at the head of the full list.
pub fn allocate_to_full<B, R, C>(
    guard: &mut SpaceGuard<'_, B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Result<BufferHandle<B>, PoolError>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let buffer = allocate(guard.space(), size, owner)?;
    guard.insert_full_head(&buffer);
    Ok(buffer)
}

/// Allocate a transient buffer, then lock and link it into the full list.
pub fn allocate_transient_to_full<B, R, C>(
    space: &MemorySpace<B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Result<BufferHandle<B>, PoolError>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let buffer = allocate_transient(space, size, owner)?;
    space.lock().insert_full_head(&buffer);
    Ok(buffer)
}

/// Allocate a transient leased buffer, then lock and link it into the full
/// list.
pub fn allocate_transient_lease_to_full<B, R, C>(
    space: &MemorySpace<B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Result<BufferHandle<B>, PoolError>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let buffer = allocate_transient_lease(space, size, owner)?;
    debug_assert!(buffer.is_transient() && buffer.is_lease());
    space.lock().insert_full_head(&buffer);
    Ok(buffer)
}

/// Allocate a transient leased buffer, then lock and link it into the free
/// list.
pub fn allocate_transient_lease_to_free<B, R, C>(
    space: &MemorySpace<B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Result<BufferHandle<B>, PoolError>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let buffer = allocate_transient_lease(space, size, owner)?;
    debug_assert!(buffer.is_transient() && buffer.is_lease());
    space.lock().insert_free_head(&buffer);
    Ok(buffer)
}

/// Acquire a free-list buffer with at least `size` free bytes and detach
/// it from the free list.
///
/// Returns `None` when no free buffer fits or all are owned by others.
pub fn get_free<B, R, C>(
    guard: &mut SpaceGuard<'_, B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Option<BufferHandle<B>>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let buffer = guard.select_free(size, owner)?;
    guard.remove_free(&buffer);
    trace!(size, %owner, "free buffer detached");
    Some(buffer)
}

/// [`get_free`], re-attempted up to `retry_count` times.
///
/// Attempts run back to back with no backoff. A `retry_count` of zero
/// makes no attempt.
pub fn get_free_with_retry<B, R, C>(
    guard: &mut SpaceGuard<'_, B, R, C>,
    size: usize,
    owner: OwnerId,
    retry_count: usize,
) -> Option<BufferHandle<B>>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    debug_assert!(size <= guard.space().min_elem_size());
    (0..retry_count).find_map(|_| get_free(guard, size, owner))
}

/// Acquire a free-list buffer and move it to the head of the full list.
///
/// `size` must not exceed the minimum element size.
pub fn get_free_to_full<B, R, C>(
    guard: &mut SpaceGuard<'_, B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Option<BufferHandle<B>>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    debug_assert!(size <= guard.space().min_elem_size());
    let buffer = guard.select_free(size, owner)?;
    debug_assert!(buffer.acquired_by(owner));
    guard.move_free_to_full(&buffer);
    trace!(size, %owner, "free buffer moved to full");
    Some(buffer)
}

/// Obtain a buffer in the full list, reusing a free buffer when the
/// request fits the minimum class and allocating otherwise.
pub fn get_to_full<B, R, C>(
    space: &MemorySpace<B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Result<BufferHandle<B>, PoolError>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let size = size_adjustment(size, space);
    let mut guard = space.lock();
    if size <= space.min_elem_size() {
        if let Some(buffer) = get_free_to_full(&mut guard, size, owner) {
            return Ok(buffer);
        }
    }
    allocate_to_full(&mut guard, size, owner)
}

/// [`get_free`] followed by marking the buffer leased.
pub fn get_free_lease<B, R, C>(
    guard: &mut SpaceGuard<'_, B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Option<BufferHandle<B>>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let buffer = get_free(guard, size, owner)?;
    buffer.set_lease();
    Some(buffer)
}

/// [`get_free_with_retry`] followed by marking the buffer leased.
pub fn get_free_lease_with_retry<B, R, C>(
    guard: &mut SpaceGuard<'_, B, R, C>,
    size: usize,
    owner: OwnerId,
    retry_count: usize,
) -> Option<BufferHandle<B>>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let buffer = get_free_with_retry(guard, size, owner, retry_count)?;
    buffer.set_lease();
    Some(buffer)
}

/// Obtain a leased buffer: a detached free-list buffer if one fits,
/// otherwise a new transient buffer linked into the full list.
pub fn get_lease<B, R, C>(
    space: &MemorySpace<B, R, C>,
    size: usize,
    owner: OwnerId,
) -> Result<BufferHandle<B>, PoolError>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    if let Some(buffer) = get_free_lease(&mut space.lock(), size, owner) {
        debug_assert!(buffer.acquired_by(owner) && buffer.is_lease());
        return Ok(buffer);
    }
    let buffer = allocate_transient_to_full(space, size, owner)?;
    buffer.set_lease();
    Ok(buffer)
}

/// Release a full-list buffer whose writes have all been flushed.
pub fn release_full<B, R, C>(guard: &mut SpaceGuard<'_, B, R, C>, buffer: &BufferHandle<B>)
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    debug_assert_eq!(buffer.unflushed_size(), 0, "releasing a buffer with unflushed bytes");
    guard.release_full(buffer);
}

/// Release a free-list buffer whose writes have all been flushed.
pub fn release_free<B, R, C>(guard: &mut SpaceGuard<'_, B, R, C>, buffer: &BufferHandle<B>)
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    debug_assert_eq!(buffer.unflushed_size(), 0, "releasing a buffer with unflushed bytes");
    guard.release_free(buffer);
}

/// [`release_full`] under a lock taken for the call.
pub fn release_full_critical<B, R, C>(space: &MemorySpace<B, R, C>, buffer: &BufferHandle<B>)
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    release_full(&mut space.lock(), buffer);
}

/// [`release_free`] under a lock taken for the call.
pub fn release_free_critical<B, R, C>(space: &MemorySpace<B, R, C>, buffer: &BufferHandle<B>)
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    release_free(&mut space.lock(), buffer);
}

/// Run `processor` over the full list. Does nothing if the list is empty.
pub fn process_full_list<B, R, C, P>(
    space: &MemorySpace<B, R, C>,
    processor: &mut P,
    direction: Direction,
) where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
    P: BufferProcessor<B> + ?Sized,
{
    if space.lock().is_full_empty() {
        return;
    }
    space.iterate(processor, ListKind::Full, direction);
}

/// Run `processor` over the free list. Does nothing if the list is empty.
pub fn process_free_list<B, R, C, P>(
    space: &MemorySpace<B, R, C>,
    processor: &mut P,
    direction: Direction,
) where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
    P: BufferProcessor<B> + ?Sized,
{
    if !space.lock().has_free() {
        return;
    }
    space.iterate(processor, ListKind::Free, direction);
}

/// Replace a buffer that cannot hold its next write.
///
/// Obtains a full-list buffer with room for `used + requested` bytes,
/// reusing the minimum class when that suffices and allocating a transient
/// lease otherwise, then copies the `used` in-flight bytes of `old` into
/// it. The caller still owns `old` and decides how to retire it.
pub fn provision_replacement<B, R, C>(
    space: &MemorySpace<B, R, C>,
    old: &BufferHandle<B>,
    used: usize,
    requested: usize,
    owner: OwnerId,
) -> Result<BufferHandle<B>, PoolError>
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let invalid = PoolError::InvalidMigration {
        used,
        requested,
        available: 0,
    };
    let total = used.checked_add(requested).ok_or_else(|| invalid.clone())?;
    if old.pos().checked_add(used).is_none_or(|end| end > old.end()) {
        return Err(invalid);
    }

    let replacement = if total <= space.min_elem_size() {
        get_to_full(space, total, owner)?
    } else {
        allocate_transient_lease_to_full(space, total, owner)?
    };

    if let Err(err) = migrate_outstanding_writes(&**old, &*replacement, used, requested) {
        replacement.release();
        release_full_critical(space, &replacement);
        return Err(err);
    }
    trace!(used, requested, transient = replacement.is_transient(), "replacement provisioned");
    Ok(replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpaceConfig;
    use crate::space::MemorySpace;
    use spool_core::EventBuffer;

    type Space = MemorySpace<EventBuffer>;

    const MIN: usize = 4096;

    fn space(cache_count: usize) -> Space {
        let s = Space::with_config(SpaceConfig::new(MIN, 65_536, cache_count)).unwrap();
        s.initialize().unwrap();
        s
    }

    #[test]
    fn size_adjustment_never_goes_below_min() {
        let s = space(0);
        assert_eq!(size_adjustment(1, &s), MIN);
        assert_eq!(size_adjustment(MIN * 3, &s), MIN * 3);
    }

    #[test]
    fn allocate_variants_set_flags() {
        let s = space(0);
        let owner = OwnerId::next();

        let plain = allocate(&s, 10, owner).unwrap();
        assert!(plain.acquired_by(owner));
        assert!(!plain.is_transient() && !plain.is_lease());

        let transient = allocate_transient(&s, 10, owner).unwrap();
        assert!(transient.is_transient() && !transient.is_lease());

        let lease = allocate_transient_lease(&s, 10, owner).unwrap();
        assert!(lease.is_transient() && lease.is_lease());
        assert!(lease.is_detached());
    }

    #[test]
    fn to_full_and_to_free_destinations() {
        let s = space(0);
        let owner = OwnerId::next();
        let a = allocate_transient_to_full(&s, 10, owner).unwrap();
        let b = allocate_transient_lease_to_full(&s, 10, owner).unwrap();
        let c = allocate_transient_lease_to_free(&s, 10, owner).unwrap();
        let d = allocate_to_full(&mut s.lock(), 10, owner).unwrap();
        let g = s.lock();
        assert!(g.in_full(&a) && g.in_full(&b) && g.in_full(&d));
        assert!(g.in_free(&c));
        assert_eq!(g.full_count(), 3);
    }

    #[test]
    fn get_free_detaches_and_acquires() {
        let s = space(2);
        let owner = OwnerId::next();
        let mut g = s.lock();
        let b = get_free(&mut g, 100, owner).unwrap();
        assert!(b.acquired_by(owner));
        assert!(b.is_detached());
        assert_eq!(g.free_count(), 1);
    }

    #[test]
    fn get_free_is_none_when_exhausted() {
        let s = space(1);
        let mut g = s.lock();
        assert!(get_free(&mut g, 100, OwnerId::next()).is_some());
        assert!(get_free(&mut g, 100, OwnerId::next()).is_none());
        assert!(get_free_with_retry(&mut g, 100, OwnerId::next(), 3).is_none());
    }

    #[test]
    fn zero_retries_make_no_attempt() {
        let s = space(1);
        let mut g = s.lock();
        assert!(get_free_with_retry(&mut g, 100, OwnerId::next(), 0).is_none());
        assert_eq!(g.free_count(), 1);
        let b = get_free_with_retry(&mut g, 100, OwnerId::next(), 1).unwrap();
        assert!(b.is_detached());
    }

    #[test]
    fn get_free_to_full_moves_buffer() {
        let s = space(2);
        let owner = OwnerId::next();
        let mut g = s.lock();
        let b = get_free_to_full(&mut g, 100, owner).unwrap();
        assert!(g.in_full(&b));
        assert_eq!((g.free_count(), g.full_count()), (1, 1));
    }

    #[test]
    fn get_to_full_reuses_then_allocates() {
        let s = space(1);
        let owner = OwnerId::next();
        let first = get_to_full(&s, 10, owner).unwrap();
        let second = get_to_full(&s, 10, owner).unwrap();
        assert!(!first.ptr_eq(&second));
        assert_eq!(s.full_count(), 2);
        assert_eq!(s.free_count(), 0);
        assert_eq!(s.stats().snapshot().allocations, 2);
    }

    #[test]
    fn get_to_full_allocates_oversize_directly() {
        let s = space(1);
        let b = get_to_full(&s, MIN * 3, OwnerId::next()).unwrap();
        assert_eq!(b.capacity(), MIN * 4);
        assert_eq!(s.free_count(), 1);
    }

    #[test]
    fn get_lease_prefers_free_buffer() {
        let s = space(1);
        let owner = OwnerId::next();
        let reused = get_lease(&s, 10, owner).unwrap();
        assert!(reused.is_lease() && !reused.is_transient());
        assert!(reused.is_detached());

        let fresh = get_lease(&s, 10, owner).unwrap();
        assert!(fresh.is_lease() && fresh.is_transient());
        assert!(s.lock().in_full(&fresh));
    }

    #[test]
    fn get_free_lease_with_retry_marks_lease() {
        let s = space(1);
        let mut g = s.lock();
        let b = get_free_lease_with_retry(&mut g, 10, OwnerId::next(), 2).unwrap();
        assert!(b.is_lease());
    }

    #[test]
    fn release_full_critical_recycles_flushed_buffer() {
        let s = space(1);
        let owner = OwnerId::next();
        let b = get_to_full(&s, 10, owner).unwrap();
        b.write(b"event");
        b.flush_with(|_| ());
        b.reinitialize();
        b.release();
        release_full_critical(&s, &b);
        let g = s.lock();
        assert!(g.in_free(&b));
        assert_eq!(g.full_count(), 0);
    }

    #[test]
    fn process_lists_skip_empty_lists() {
        let s = space(0);
        let mut calls = 0;
        let mut count = |_: &BufferHandle<EventBuffer>| {
            calls += 1;
            true
        };
        process_full_list(&s, &mut count, Direction::Forward);
        process_free_list(&s, &mut count, Direction::Forward);
        assert_eq!(calls, 0);
    }

    #[test]
    fn provision_replacement_in_min_class_reuses_free_buffer() {
        let s = space(1);
        let owner = OwnerId::next();
        let old = allocate(&s, 10, owner).unwrap();
        old.write(&[1u8; 8]);
        assert!(old.stage(b"inflight"));

        let new = provision_replacement(&s, &old, 8, 100, owner).unwrap();
        assert!(!new.is_transient());
        assert!(s.lock().in_full(&new));
        new.with_body(|body| assert_eq!(&body[..8], b"inflight"));
    }

    #[test]
    fn provision_replacement_oversize_is_transient_lease() {
        let s = space(1);
        let owner = OwnerId::next();
        let old = allocate(&s, 10, owner).unwrap();
        let new = provision_replacement(&s, &old, 0, MIN * 2, owner).unwrap();
        assert!(new.is_transient() && new.is_lease());
        assert!(new.free_size() >= MIN * 2);
        assert_eq!(s.free_count(), 1);
    }

    #[test]
    fn provision_replacement_rejects_bad_used_before_allocating() {
        let s = space(0);
        let owner = OwnerId::next();
        let old = allocate(&s, 10, owner).unwrap();
        let before = s.stats().snapshot().allocations;
        let err = provision_replacement(&s, &old, MIN + 1, 1, owner).unwrap_err();
        assert!(matches!(err, PoolError::InvalidMigration { .. }));
        assert_eq!(s.stats().snapshot().allocations, before);
    }
}
