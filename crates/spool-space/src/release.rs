//! The release pass run over a list during a flush epoch.

use spool_core::PoolBuffer;

use crate::callback::SpaceCallback;
use crate::handle::BufferHandle;
use crate::list::ListKind;
use crate::ops::{release_free_critical, release_full_critical};
use crate::retrieval::Retrieval;
use crate::space::{BufferProcessor, MemorySpace};

/// Returns buffers to circulation as a list is walked.
///
/// Transient buffers go back through the release path for the list being
/// walked, which deallocates them. Durable buffers are reset and
/// published so any producer can acquire them again. A durable buffer
/// found on the full list is also relinked at the head of the free list.
/// This pass never deallocates a durable buffer, so the free list may
/// end above its target; [`release_free`](crate::ops::release_free)
/// trims it.
///
/// The caller must have exclusive access to every buffer visited: no
/// producer may be writing into them while the pass runs.
pub struct ReleaseProcessor<'a, B: PoolBuffer, R: Retrieval, C: SpaceCallback<B>> {
    space: &'a MemorySpace<B, R, C>,
    list: ListKind,
    processed: usize,
}

impl<'a, B: PoolBuffer, R: Retrieval, C: SpaceCallback<B>> ReleaseProcessor<'a, B, R, C> {
    /// A processor for walking `list` of `space`.
    pub fn new(space: &'a MemorySpace<B, R, C>, list: ListKind) -> Self {
        Self {
            space,
            list,
            processed: 0,
        }
    }

    /// Buffers visited so far.
    pub fn processed(&self) -> usize {
        self.processed
    }
}

impl<B: PoolBuffer, R: Retrieval, C: SpaceCallback<B>> BufferProcessor<B>
    for ReleaseProcessor<'_, B, R, C>
{
    fn process(&mut self, buffer: &BufferHandle<B>) -> bool {
        self.processed += 1;
        if buffer.is_transient() {
            match self.list {
                ListKind::Full => release_full_critical(self.space, buffer),
                ListKind::Free => release_free_critical(self.space, buffer),
            }
            return true;
        }
        buffer.reinitialize();
        debug_assert!(buffer.is_empty());
        debug_assert!(!buffer.is_retired());
        buffer.release();
        if self.list == ListKind::Full {
            let mut guard = self.space.lock();
            if guard.in_full(buffer) {
                guard.move_full_to_free(buffer);
            }
        }
        true
    }
}
