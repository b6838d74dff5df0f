//! Policy hooks a space consults while managing its lists.

use spool_core::{OwnerId, PoolBuffer};

use crate::handle::BufferHandle;

/// Hooks the owning subsystem supplies to a [`MemorySpace`](crate::MemorySpace).
///
/// Both methods are called with the space's lock held, so they must not
/// call back into the same space.
pub trait SpaceCallback<B: PoolBuffer>: Send + Sync {
    /// Whether a released buffer should rejoin the free list.
    ///
    /// The default keeps the free list at its target population: cache
    /// while `free_count < cache_count`, deallocate otherwise.
    fn should_populate_cache(&self, free_count: usize, cache_count: usize) -> bool {
        free_count < cache_count
    }

    /// A free-list buffer turned out too small for `owner`'s request after
    /// it was acquired, because it still holds committed data.
    ///
    /// The space has already marked it retired and moved it to the full
    /// list, still acquired by `owner`; a drain pass is expected to flush
    /// and recycle it.
    fn on_retired(&self, _buffer: &BufferHandle<B>, _owner: OwnerId) {}
}

/// The default policy: fill the cache up to its target, ignore retirements.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCallback;

impl<B: PoolBuffer> SpaceCallback<B> for DefaultCallback {}
