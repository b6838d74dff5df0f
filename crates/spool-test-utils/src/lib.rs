//! Test utilities and fixture types for Spool development.
//!
//! Provides a [`RecordingCallback`] that captures the policy decisions a
//! space makes, a [`FlakyBuffer`] whose allocations can be made to fail,
//! and helpers that check list invariants and drive common scenarios.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use spool_core::{OwnerId, PoolBuffer};
use spool_space::{
    BufferHandle, Direction, ListKind, MemorySpace, ReleaseProcessor, Retrieval, SpaceCallback,
    SpaceConfig,
};

pub use fixtures::FlakyBuffer;

/// Page-aligned configuration for tests: 4 KiB minimum, 64 KiB limit.
pub fn small_config(cache_count: usize) -> SpaceConfig {
    SpaceConfig::new(4096, 65_536, cache_count)
}

/// A [`SpaceCallback`] that keeps the default cache policy and records
/// every retirement.
#[derive(Default)]
pub struct RecordingCallback {
    populate_queries: AtomicUsize,
    retired: Mutex<Vec<OwnerId>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the space asked whether to cache a buffer.
    pub fn populate_queries(&self) -> usize {
        self.populate_queries.load(Ordering::Relaxed)
    }

    /// Owners whose requests retired a buffer, in order.
    pub fn retired_owners(&self) -> Vec<OwnerId> {
        self.retired.lock().clone()
    }
}

impl<B: PoolBuffer> SpaceCallback<B> for RecordingCallback {
    fn should_populate_cache(&self, free_count: usize, cache_count: usize) -> bool {
        self.populate_queries.fetch_add(1, Ordering::Relaxed);
        free_count < cache_count
    }

    fn on_retired(&self, _buffer: &BufferHandle<B>, owner: OwnerId) {
        self.retired.lock().push(owner);
    }
}

/// Panics unless every free-list buffer is empty and unretired and no
/// buffer appears in both lists.
pub fn assert_list_invariants<B, R, C>(space: &MemorySpace<B, R, C>)
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let guard = space.lock();
    for buffer in guard.free_buffers(Direction::Forward) {
        assert!(buffer.is_empty(), "free buffer holds {} bytes", buffer.pos());
        assert!(!buffer.is_retired(), "retired buffer in free list");
        assert!(!guard.in_full(buffer), "buffer in both lists");
    }
    for buffer in guard.full_buffers(Direction::Forward) {
        assert!(!guard.in_free(buffer), "buffer in both lists");
    }
}

/// Flush every full-list buffer and run a [`ReleaseProcessor`] over the
/// full list. Returns the number of buffers processed.
pub fn drain_full<B, R, C>(space: &MemorySpace<B, R, C>, flush: impl Fn(&BufferHandle<B>)) -> usize
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    space.iterate(
        &mut |buffer: &BufferHandle<B>| {
            flush(buffer);
            true
        },
        ListKind::Full,
        Direction::Forward,
    );
    let mut pass = ReleaseProcessor::new(space, ListKind::Full);
    spool_space::ops::process_full_list(space, &mut pass, Direction::Forward);
    pass.processed()
}

/// Run [`release_free`](spool_space::ops::release_free) over every
/// free-list buffer, oldest first, trimming the list back to its target.
/// Returns the number of buffers evicted.
pub fn trim_free<B, R, C>(space: &MemorySpace<B, R, C>) -> usize
where
    B: PoolBuffer,
    R: Retrieval,
    C: SpaceCallback<B>,
{
    let mut guard = space.lock();
    let listed: Vec<_> = guard.free_buffers(Direction::Backward).cloned().collect();
    let before = guard.free_count();
    for buffer in &listed {
        spool_space::ops::release_free(&mut guard, buffer);
    }
    before - guard.free_count()
}
