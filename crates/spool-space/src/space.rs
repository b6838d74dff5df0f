//! The memory space: a free list, a full list, and the policy that moves
//! buffers between them.
//!
//! A [`MemorySpace`] owns every buffer it allocates until the buffer is
//! deallocated. Buffers live in one of three places:
//!
//! ```text
//! free  ── available for acquisition, most recently released first
//! full  ── in use or awaiting a drain pass
//! (neither) ── detached, exclusively held by a producer
//! ```
//!
//! List membership changes only through a [`SpaceGuard`], the scoped lock
//! returned by [`MemorySpace::lock`]. Operations that require the lock take
//! `&mut SpaceGuard`, so calling them without it does not compile.
//! Allocation and deallocation of buffer memory never take the lock.

use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use spool_core::{OwnerId, PoolBuffer, PoolError};

use crate::callback::{DefaultCallback, SpaceCallback};
use crate::config::SpaceConfig;
use crate::handle::BufferHandle;
use crate::list::{Direction, IndexList, ListIter, ListKind, NodeSlab};
use crate::retrieval::{Retrieval, SequentialRetrieval};
use crate::sizing::align_allocation_size;
use crate::stats::SpaceStats;

/// Visits buffers during [`MemorySpace::iterate`].
pub trait BufferProcessor<B> {
    /// Process one buffer. Returning `false` stops the iteration.
    fn process(&mut self, buffer: &BufferHandle<B>) -> bool;
}

impl<B, F> BufferProcessor<B> for F
where
    F: FnMut(&BufferHandle<B>) -> bool,
{
    fn process(&mut self, buffer: &BufferHandle<B>) -> bool {
        self(buffer)
    }
}

/// The two lists and their shared slot storage.
pub(crate) struct Lists<B> {
    slab: NodeSlab<BufferHandle<B>>,
    free: IndexList,
    full: IndexList,
}

impl<B: PoolBuffer> Lists<B> {
    fn new() -> Self {
        Self {
            slab: NodeSlab::new(),
            free: IndexList::new(ListKind::Free),
            full: IndexList::new(ListKind::Full),
        }
    }

    fn list(&self, kind: ListKind) -> &IndexList {
        match kind {
            ListKind::Free => &self.free,
            ListKind::Full => &self.full,
        }
    }

    fn contains(&self, kind: ListKind, buffer: &BufferHandle<B>) -> bool {
        buffer.slot().is_some_and(|slot| {
            self.list(kind).contains(&self.slab, slot)
                && self.slab.get(slot).is_some_and(|listed| listed.ptr_eq(buffer))
        })
    }

    fn iter(&self, kind: ListKind, direction: Direction) -> ListIter<'_, BufferHandle<B>> {
        self.list(kind).iter(&self.slab, direction)
    }

    fn prepend(&mut self, kind: ListKind, buffer: &BufferHandle<B>) {
        debug_assert!(buffer.is_detached(), "inserting a buffer that is already listed");
        let (list, slab) = match kind {
            ListKind::Free => (&mut self.free, &mut self.slab),
            ListKind::Full => (&mut self.full, &mut self.slab),
        };
        let slot = list.prepend(slab, buffer.clone());
        buffer.set_slot(Some(slot));
    }

    fn remove(&mut self, kind: ListKind, buffer: &BufferHandle<B>) -> Option<BufferHandle<B>> {
        let listed = self.contains(kind, buffer);
        debug_assert!(listed, "removing a buffer that is not in the {kind:?} list");
        let slot = buffer.slot().filter(|_| listed)?;
        let (list, slab) = match kind {
            ListKind::Free => (&mut self.free, &mut self.slab),
            ListKind::Full => (&mut self.full, &mut self.slab),
        };
        let removed = list.remove(slab, slot);
        removed.set_slot(None);
        Some(removed)
    }

    /// Relink `buffer` from the head of `from` to the head of the other list.
    fn relink(&mut self, from: ListKind, buffer: &BufferHandle<B>) -> bool {
        let listed = self.contains(from, buffer);
        debug_assert!(listed, "moving a buffer that is not in the {from:?} list");
        let Some(slot) = buffer.slot().filter(|_| listed) else {
            return false;
        };
        match from {
            ListKind::Free => self.free.move_to_head(&mut self.full, &mut self.slab, slot),
            ListKind::Full => self.full.move_to_head(&mut self.free, &mut self.slab, slot),
        }
        true
    }

    fn pop(&mut self, kind: ListKind) -> Option<BufferHandle<B>> {
        let slot = self.list(kind).first(Direction::Forward)?;
        let (list, slab) = match kind {
            ListKind::Free => (&mut self.free, &mut self.slab),
            ListKind::Full => (&mut self.full, &mut self.slab),
        };
        let removed = list.remove(slab, slot);
        removed.set_slot(None);
        Some(removed)
    }
}

/// A pool of buffers of one logical class.
///
/// `B` is the buffer type, `R` picks where free-list searches start, and
/// `C` supplies the cache population policy.
///
/// # Lifecycle
///
/// 1. [`new`](Self::new) validates the configuration.
/// 2. [`initialize`](Self::initialize) pre-allocates `cache_count`
///    minimum-sized buffers into the free list.
/// 3. Producers acquire and release buffers through [`crate::ops`].
/// 4. Dropping the space deallocates every listed buffer.
pub struct MemorySpace<
    B: PoolBuffer,
    R: Retrieval = SequentialRetrieval,
    C: SpaceCallback<B> = DefaultCallback,
> {
    lists: Mutex<Lists<B>>,
    config: SpaceConfig,
    retrieval: R,
    callback: C,
    stats: SpaceStats,
}

impl<B: PoolBuffer, R: Retrieval, C: SpaceCallback<B>> MemorySpace<B, R, C> {
    /// Create an empty space.
    ///
    /// Returns `Err(PoolError::InvalidConfig)` if `config` fails
    /// [`SpaceConfig::validate`].
    pub fn new(config: SpaceConfig, retrieval: R, callback: C) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self {
            lists: Mutex::new(Lists::new()),
            config,
            retrieval,
            callback,
            stats: SpaceStats::default(),
        })
    }

    /// Create a space and pre-populate its free list.
    pub fn create(config: SpaceConfig, retrieval: R, callback: C) -> Result<Self, PoolError> {
        let space = Self::new(config, retrieval, callback)?;
        space.initialize()?;
        Ok(space)
    }

    /// Create an empty space with default retrieval and callback.
    pub fn with_config(config: SpaceConfig) -> Result<Self, PoolError>
    where
        R: Default,
        C: Default,
    {
        Self::new(config, R::default(), C::default())
    }

    /// Pre-allocate `cache_count` minimum-sized buffers into the free list.
    ///
    /// Stops at the first allocation failure and reports how far it got;
    /// buffers already inserted stay in the free list.
    pub fn initialize(&self) -> Result<(), PoolError> {
        let cache_count = self.config.cache_count;
        for populated in 0..cache_count {
            let buffer = self.allocate(self.config.min_elem_size).map_err(|err| {
                warn!(populated, cache_count, error = %err, "free list pre-population failed");
                PoolError::PrepopulationFailed {
                    populated,
                    target: cache_count,
                }
            })?;
            self.lock().insert_free_head(&buffer);
        }
        debug!(
            cache_count,
            min_elem_size = self.config.min_elem_size,
            "free list pre-populated"
        );
        Ok(())
    }

    /// Allocate a detached, unacquired buffer able to hold `size` bytes.
    ///
    /// The body is `size` rounded up to `min_elem_size * 2^k`. Fails with
    /// [`PoolError::AllocationFailed`] if the rounding exceeds the
    /// allocation ceiling or memory is exhausted, and with
    /// [`PoolError::LimitExceeded`] if the space enforces its limit.
    pub fn allocate(&self, size: usize) -> Result<BufferHandle<B>, PoolError> {
        let Some(aligned) = align_allocation_size(size, self.config.min_elem_size) else {
            self.stats.record_failure();
            warn!(requested = size, "allocation request exceeds the size ceiling");
            return Err(PoolError::AllocationFailed { requested: size });
        };
        if self.config.enforce_limit && aligned > self.config.limit_size {
            self.stats.record_failure();
            debug!(
                requested = size,
                aligned,
                limit = self.config.limit_size,
                "allocation rejected by size limit"
            );
            return Err(PoolError::LimitExceeded {
                requested: aligned,
                limit: self.config.limit_size,
            });
        }
        let buffer = B::initialize(B::header_size(), aligned).map_err(|err| {
            self.stats.record_failure();
            warn!(requested = size, aligned, error = %err, "buffer allocation failed");
            err
        })?;
        self.stats.record_allocation(buffer.total_size());
        trace!(requested = size, aligned, "buffer allocated");
        Ok(BufferHandle::new(buffer))
    }

    /// Free a buffer's memory.
    ///
    /// The buffer must be detached from both lists. Other clones of the
    /// handle keep the memory alive but no longer count towards the space.
    pub fn deallocate(&self, buffer: BufferHandle<B>) {
        debug_assert!(buffer.is_detached(), "deallocating a buffer that is still listed");
        self.stats.record_deallocation(buffer.total_size());
        trace!(total_size = buffer.total_size(), "buffer deallocated");
    }

    /// Take the space's lock.
    ///
    /// The lock is released when the guard drops, on every exit path.
    pub fn lock(&self) -> SpaceGuard<'_, B, R, C> {
        SpaceGuard {
            space: self,
            lists: self.lists.lock(),
        }
    }

    /// Whether some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.lists.is_locked()
    }

    /// Walk `list` in `direction`, handing each buffer to `processor`.
    ///
    /// The list is captured under the lock and processed after the lock is
    /// released, so processors may take the lock themselves. Processing
    /// stops early when `process` returns `false`.
    pub fn iterate<P>(&self, processor: &mut P, list: ListKind, direction: Direction)
    where
        P: BufferProcessor<B> + ?Sized,
    {
        let captured: SmallVec<[BufferHandle<B>; 16]> =
            self.lock().lists.iter(list, direction).cloned().collect();
        for buffer in &captured {
            if !processor.process(buffer) {
                break;
            }
        }
    }

    /// Number of buffers in the free list.
    pub fn free_count(&self) -> usize {
        self.lock().free_count()
    }

    /// Number of buffers in the full list.
    pub fn full_count(&self) -> usize {
        self.lock().full_count()
    }

    /// Smallest buffer body in bytes.
    pub fn min_elem_size(&self) -> usize {
        self.config.min_elem_size
    }

    /// Configured size limit in bytes.
    pub fn limit_size(&self) -> usize {
        self.config.limit_size
    }

    /// Target free-list population.
    pub fn cache_count(&self) -> usize {
        self.config.cache_count
    }

    /// The space's configuration.
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// The callback supplied at construction.
    pub fn callback(&self) -> &C {
        &self.callback
    }

    /// Allocation statistics.
    pub fn stats(&self) -> &SpaceStats {
        &self.stats
    }
}

impl<B: PoolBuffer, R: Retrieval, C: SpaceCallback<B>> Drop for MemorySpace<B, R, C> {
    fn drop(&mut self) {
        let lists = self.lists.get_mut();
        for kind in [ListKind::Full, ListKind::Free] {
            while let Some(buffer) = lists.pop(kind) {
                self.stats.record_deallocation(buffer.total_size());
            }
        }
    }
}

/// Scoped lock over a space's lists.
///
/// Holding a guard is the precondition for every list mutation. Dropping
/// it releases the lock.
#[must_use]
pub struct SpaceGuard<'a, B: PoolBuffer, R: Retrieval, C: SpaceCallback<B>> {
    space: &'a MemorySpace<B, R, C>,
    lists: MutexGuard<'a, Lists<B>>,
}

impl<'a, B: PoolBuffer, R: Retrieval, C: SpaceCallback<B>> SpaceGuard<'a, B, R, C> {
    /// The space this guard locks.
    pub fn space(&self) -> &'a MemorySpace<B, R, C> {
        self.space
    }

    /// Link a detached buffer at the head of the free list.
    pub fn insert_free_head(&mut self, buffer: &BufferHandle<B>) {
        self.lists.prepend(ListKind::Free, buffer);
    }

    /// Link a detached buffer at the head of the full list.
    pub fn insert_full_head(&mut self, buffer: &BufferHandle<B>) {
        self.lists.prepend(ListKind::Full, buffer);
    }

    /// Unlink a buffer from the free list, leaving it detached.
    pub fn remove_free(&mut self, buffer: &BufferHandle<B>) {
        self.lists.remove(ListKind::Free, buffer);
    }

    /// Unlink a buffer from the full list, leaving it detached.
    pub fn remove_full(&mut self, buffer: &BufferHandle<B>) {
        self.lists.remove(ListKind::Full, buffer);
    }

    /// Move a buffer from the free list to the head of the full list.
    pub fn move_free_to_full(&mut self, buffer: &BufferHandle<B>) {
        self.lists.relink(ListKind::Free, buffer);
    }

    /// Move a buffer from the full list to the head of the free list.
    pub fn move_full_to_free(&mut self, buffer: &BufferHandle<B>) {
        self.lists.relink(ListKind::Full, buffer);
    }

    /// Whether `buffer` is in the free list.
    pub fn in_free(&self, buffer: &BufferHandle<B>) -> bool {
        self.lists.contains(ListKind::Free, buffer)
    }

    /// Whether `buffer` is in the full list.
    pub fn in_full(&self, buffer: &BufferHandle<B>) -> bool {
        self.lists.contains(ListKind::Full, buffer)
    }

    /// Number of buffers in the free list.
    pub fn free_count(&self) -> usize {
        self.lists.free.count()
    }

    /// Number of buffers in the full list.
    pub fn full_count(&self) -> usize {
        self.lists.full.count()
    }

    /// Whether the free list has any buffers.
    pub fn has_free(&self) -> bool {
        !self.lists.free.is_empty()
    }

    /// Whether the full list is empty.
    pub fn is_full_empty(&self) -> bool {
        self.lists.full.is_empty()
    }

    /// Whether the free list is below its target population.
    pub fn should_populate_cache(&self) -> bool {
        self.space
            .callback
            .should_populate_cache(self.free_count(), self.space.config.cache_count)
    }

    /// Free-list buffers in `direction` order.
    pub fn free_buffers(
        &self,
        direction: Direction,
    ) -> impl Iterator<Item = &BufferHandle<B>> + '_ {
        self.lists.iter(ListKind::Free, direction)
    }

    /// Full-list buffers in `direction` order.
    pub fn full_buffers(
        &self,
        direction: Direction,
    ) -> impl Iterator<Item = &BufferHandle<B>> + '_ {
        self.lists.iter(ListKind::Full, direction)
    }

    /// Take a buffer off the full list and recycle or free it.
    ///
    /// Transient buffers are always deallocated. A durable buffer must be
    /// empty, unretired and unowned; it rejoins the free list while the
    /// cache is below target and is deallocated otherwise.
    pub fn release_full(&mut self, buffer: &BufferHandle<B>) {
        let Some(buffer) = self.lists.remove(ListKind::Full, buffer) else {
            return;
        };
        if buffer.is_transient() {
            self.space.deallocate(buffer);
            return;
        }
        debug_assert!(buffer.is_empty(), "releasing a non-empty buffer");
        debug_assert!(!buffer.is_retired(), "releasing a retired buffer");
        debug_assert!(buffer.identity().is_none(), "releasing an acquired buffer");
        if self.should_populate_cache() {
            self.lists.prepend(ListKind::Free, &buffer);
        } else {
            trace!(free_count = self.free_count(), "free list at target, dropping released buffer");
            self.space.deallocate(buffer);
        }
    }

    /// Trim a free-list buffer if it should not stay cached.
    ///
    /// Transient buffers are always removed and deallocated. A durable
    /// buffer is removed and deallocated only while the free list holds
    /// more than its target population.
    pub fn release_free(&mut self, buffer: &BufferHandle<B>) {
        debug_assert!(self.in_free(buffer), "releasing a buffer that is not in the free list");
        if buffer.is_transient() {
            if let Some(buffer) = self.lists.remove(ListKind::Free, buffer) {
                self.space.deallocate(buffer);
            }
            return;
        }
        debug_assert!(buffer.is_empty(), "releasing a non-empty buffer");
        debug_assert!(!buffer.is_retired(), "releasing a retired buffer");
        debug_assert!(buffer.identity().is_none(), "releasing an acquired buffer");
        let remaining = self.free_count().saturating_sub(1);
        let cache_count = self.space.config.cache_count;
        if !self.space.callback.should_populate_cache(remaining, cache_count) {
            if let Some(buffer) = self.lists.remove(ListKind::Free, buffer) {
                debug!(free_count = remaining, cache_count, "evicting surplus free buffer");
                self.space.deallocate(buffer);
            }
        }
    }

    /// First-fit search of the free list for a buffer with `size` free
    /// bytes, acquiring it for `owner`. The buffer stays in the free list.
    ///
    /// An acquired buffer that is too small but holds committed data is
    /// retired and moved to the full list for draining; an empty one that
    /// is simply too small is released again and skipped.
    pub(crate) fn select_free(&mut self, size: usize, owner: OwnerId) -> Option<BufferHandle<B>> {
        let direction = self.space.retrieval.direction();
        let mut cursor = self.lists.free.first(direction);
        while let Some(slot) = cursor {
            cursor = self.lists.slab.step(slot, direction);
            let Some(candidate) = self.lists.slab.get(slot).cloned() else {
                break;
            };
            if candidate.is_retired() || !candidate.try_acquire(owner) {
                continue;
            }
            if candidate.free_size() >= size {
                return Some(candidate);
            }
            if candidate.is_empty() {
                candidate.release();
                continue;
            }
            candidate.set_retired();
            self.lists.relink(ListKind::Free, &candidate);
            debug!(
                requested = size,
                free_size = candidate.free_size(),
                %owner,
                "retired undersized free buffer"
            );
            self.space.callback.on_retired(&candidate, owner);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spool_core::EventBuffer;

    type Space = MemorySpace<EventBuffer>;

    const MIN: usize = 4096;
    const LIMIT: usize = 65_536;

    fn space(cache_count: usize) -> Space {
        Space::create(
            SpaceConfig::new(MIN, LIMIT, cache_count),
            SequentialRetrieval,
            DefaultCallback,
        )
        .unwrap()
    }

    #[test]
    fn initialize_fills_free_list_with_min_sized_buffers() {
        let s = space(2);
        let g = s.lock();
        assert_eq!(g.free_count(), 2);
        assert_eq!(g.full_count(), 0);
        for b in g.free_buffers(Direction::Forward) {
            assert_eq!(b.total_size(), MIN + EventBuffer::header_size());
            assert!(b.is_empty());
            assert!(b.identity().is_none());
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Space::with_config(SpaceConfig::new(MIN, MIN / 2, 1)).err().unwrap();
        assert!(matches!(err, PoolError::InvalidConfig { .. }));
    }

    #[test]
    fn allocate_rounds_to_power_of_two_multiple() {
        let s = space(0);
        let b = s.allocate(MIN + 1).unwrap();
        assert_eq!(b.capacity(), 2 * MIN);
        assert!(b.is_detached());
        assert!(b.identity().is_none());
    }

    #[test]
    fn allocate_ignores_limit_unless_enforced() {
        let s = space(0);
        assert_eq!(s.allocate(100_000).unwrap().capacity(), 131_072);

        let enforced =
            Space::with_config(SpaceConfig::new(MIN, LIMIT, 0).with_enforced_limit()).unwrap();
        let err = enforced.allocate(100_000).unwrap_err();
        assert_eq!(
            err,
            PoolError::LimitExceeded {
                requested: 131_072,
                limit: LIMIT
            }
        );
        assert_eq!(enforced.stats().snapshot().allocation_failures, 1);
    }

    #[test]
    fn allocate_above_ceiling_fails() {
        let s = space(0);
        let err = s.allocate(usize::MAX).unwrap_err();
        assert_eq!(err, PoolError::AllocationFailed { requested: usize::MAX });
    }

    #[test]
    fn stats_track_allocation_and_deallocation() {
        let s = space(0);
        let b = s.allocate(MIN).unwrap();
        let total = b.total_size();
        assert_eq!(s.stats().snapshot().live_bytes, total);
        s.deallocate(b);
        let snap = s.stats().snapshot();
        assert_eq!(snap.live_buffers, 0);
        assert_eq!(snap.live_bytes, 0);
        assert_eq!(snap.deallocations, 1);
    }

    #[test]
    fn insert_remove_and_move_keep_lists_exclusive() {
        let s = space(0);
        let b = s.allocate(MIN).unwrap();
        let mut g = s.lock();
        g.insert_free_head(&b);
        assert!(g.in_free(&b) && !g.in_full(&b));
        g.move_free_to_full(&b);
        assert!(!g.in_free(&b) && g.in_full(&b));
        g.move_full_to_free(&b);
        assert!(g.in_free(&b) && !g.in_full(&b));
        g.remove_free(&b);
        assert!(!g.in_free(&b) && !g.in_full(&b));
        assert!(b.is_detached());
    }

    #[test]
    fn free_list_is_most_recent_first() {
        let s = space(0);
        let a = s.allocate(MIN).unwrap();
        let b = s.allocate(MIN).unwrap();
        let mut g = s.lock();
        g.insert_free_head(&a);
        g.insert_free_head(&b);
        let forward: Vec<_> = g.free_buffers(Direction::Forward).cloned().collect();
        assert!(forward[0].ptr_eq(&b));
        assert!(forward[1].ptr_eq(&a));
        let backward: Vec<_> = g.free_buffers(Direction::Backward).cloned().collect();
        assert!(backward[0].ptr_eq(&a));
    }

    #[test]
    fn release_full_recaches_below_target() {
        let s = space(1);
        let b = s.allocate(MIN).unwrap();
        let mut g = s.lock();
        // Empty the cache so the released buffer is wanted.
        let cached = g.free_buffers(Direction::Forward).next().cloned().unwrap();
        g.remove_free(&cached);
        s.deallocate(cached);

        g.insert_full_head(&b);
        g.release_full(&b);
        assert!(g.in_free(&b));
        assert_eq!(g.full_count(), 0);
    }

    #[test]
    fn release_full_deallocates_at_target() {
        let s = space(1);
        let b = s.allocate(MIN).unwrap();
        let mut g = s.lock();
        g.insert_full_head(&b);
        g.release_full(&b);
        assert!(!g.in_free(&b) && !g.in_full(&b));
        assert_eq!(g.free_count(), 1);
        drop(g);
        assert_eq!(s.stats().snapshot().live_buffers, 1);
    }

    #[test]
    fn release_full_always_frees_transient() {
        let s = space(1);
        let b = s.allocate(MIN).unwrap();
        b.set_transient();
        let mut g = s.lock();
        let cached = g.free_buffers(Direction::Forward).next().cloned().unwrap();
        g.remove_free(&cached);
        s.deallocate(cached);
        assert!(g.should_populate_cache());

        g.insert_full_head(&b);
        g.release_full(&b);
        assert_eq!(g.free_count(), 0);
        drop(g);
        assert_eq!(s.stats().snapshot().live_buffers, 0);
    }

    #[test]
    fn release_free_evicts_only_surplus() {
        let s = space(2);
        let extra = s.allocate(MIN).unwrap();
        let mut g = s.lock();
        g.insert_free_head(&extra);
        assert_eq!(g.free_count(), 3);

        g.release_free(&extra);
        assert_eq!(g.free_count(), 2);
        assert!(!g.in_free(&extra));

        let cached = g.free_buffers(Direction::Forward).next().cloned().unwrap();
        g.release_free(&cached);
        assert_eq!(g.free_count(), 2, "at target, nothing is evicted");
        assert!(g.in_free(&cached));
    }

    #[test]
    fn release_free_removes_transient() {
        let s = space(2);
        let b = s.allocate(MIN).unwrap();
        b.set_transient();
        let mut g = s.lock();
        g.insert_free_head(&b);
        g.release_free(&b);
        assert!(!g.in_free(&b));
        assert_eq!(g.free_count(), 2);
    }

    #[test]
    fn select_free_acquires_in_place() {
        let s = space(2);
        let owner = OwnerId::next();
        let mut g = s.lock();
        let b = g.select_free(100, owner).unwrap();
        assert!(b.acquired_by(owner));
        assert!(g.in_free(&b));
        let second = g.select_free(100, owner).unwrap();
        assert!(!second.ptr_eq(&b));
        assert!(g.select_free(100, owner).is_none());
    }

    #[test]
    fn select_free_skips_empty_buffers_that_are_too_small() {
        let s = space(2);
        let owner = OwnerId::next();
        let mut g = s.lock();
        assert!(g.select_free(MIN + 1, owner).is_none());
        for b in g.free_buffers(Direction::Forward) {
            assert!(b.identity().is_none());
            assert!(!b.is_retired());
        }
        assert_eq!(g.full_count(), 0);
    }

    #[test]
    fn select_free_retires_undersized_buffer_with_data() {
        let s = space(0);
        let stale = s.allocate(MIN).unwrap();
        stale.write(&[7u8; 100]);
        let mut g = s.lock();
        g.insert_free_head(&stale);

        let owner = OwnerId::next();
        assert!(g.select_free(MIN, owner).is_none());
        assert!(stale.is_retired());
        assert!(stale.acquired_by(owner));
        assert!(g.in_full(&stale));
        assert_eq!(g.free_count(), 0);
    }

    #[test]
    fn iterate_visits_in_order_and_stops_on_false() {
        let s = space(3);
        let mut seen = Vec::new();
        s.iterate(
            &mut |b: &BufferHandle<EventBuffer>| {
                seen.push(b.clone());
                seen.len() < 2
            },
            ListKind::Free,
            Direction::Forward,
        );
        assert_eq!(seen.len(), 2);
        let g = s.lock();
        let expected: Vec<_> = g.free_buffers(Direction::Forward).take(2).cloned().collect();
        assert!(seen[0].ptr_eq(&expected[0]));
        assert!(seen[1].ptr_eq(&expected[1]));
    }

    #[test]
    fn processor_may_take_the_lock() {
        let s = space(2);
        let mut visited = 0;
        s.iterate(
            &mut |b: &BufferHandle<EventBuffer>| {
                let g = s.lock();
                assert!(g.in_free(b));
                visited += 1;
                true
            },
            ListKind::Free,
            Direction::Backward,
        );
        assert_eq!(visited, 2);
    }

    #[test]
    fn guard_releases_lock_on_drop() {
        let s = space(0);
        {
            let _g = s.lock();
            assert!(s.is_locked());
        }
        assert!(!s.is_locked());
    }
}
