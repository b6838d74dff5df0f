//! The contract every pooled buffer implements.

use crate::error::PoolError;
use crate::id::OwnerId;

/// A growable memory region with a write cursor and lifecycle flags.
///
/// Cursor positions are byte offsets into the buffer body:
/// `start() <= top() <= pos() <= end()`. `pos` is the committed write
/// cursor, `top` marks how far the drain layer has flushed.
///
/// Flag and identity mutators take `&self`: a buffer is shared between
/// the pool's lists and the producer that holds it, so implementations use
/// atomics (or equivalent) for all mutable state.
pub trait PoolBuffer: Send + Sync + Sized + 'static {
    /// Bytes of bookkeeping attributed to each buffer for accounting.
    fn header_size() -> usize {
        std::mem::size_of::<Self>()
    }

    /// Build a buffer with `body_size` writable bytes.
    ///
    /// Fails with [`PoolError::InvalidSize`] on an invalid size combination
    /// and [`PoolError::AllocationFailed`] when the body cannot be allocated.
    fn initialize(header_size: usize, body_size: usize) -> Result<Self, PoolError>;

    /// `header_size + body_size`, as passed to [`initialize`](Self::initialize).
    fn total_size(&self) -> usize;

    /// Body size in bytes.
    fn capacity(&self) -> usize;

    /// Offset of the first body byte.
    fn start(&self) -> usize {
        0
    }

    /// Committed write cursor.
    fn pos(&self) -> usize;

    /// Offset one past the last body byte.
    fn end(&self) -> usize {
        self.capacity()
    }

    /// Flushed cursor.
    fn top(&self) -> usize;

    /// Bytes still writable: `end - pos`.
    fn free_size(&self) -> usize {
        self.end() - self.pos()
    }

    /// Committed bytes not yet flushed: `pos - top`.
    fn unflushed_size(&self) -> usize {
        self.pos() - self.top()
    }

    /// Whether nothing has been committed since the last reset.
    fn is_empty(&self) -> bool {
        self.pos() == self.start()
    }

    /// Reset both cursors to `start` and clear the transient and retired
    /// flags. Capacity and lease state are unchanged.
    fn reinitialize(&self);

    /// The current owner, or `None` when the buffer is free.
    fn identity(&self) -> Option<OwnerId>;

    /// Claim the buffer for `owner` if nobody holds it.
    fn try_acquire(&self, owner: OwnerId) -> bool;

    /// Claim the buffer for `owner`. The buffer must be free.
    fn acquire(&self, owner: OwnerId) {
        let acquired = self.try_acquire(owner);
        debug_assert!(acquired, "buffer already acquired by {:?}", self.identity());
    }

    /// Whether `owner` currently holds the buffer.
    fn acquired_by(&self, owner: OwnerId) -> bool {
        self.identity() == Some(owner)
    }

    /// Publish the buffer as free.
    ///
    /// All writes must be complete before calling; the release makes them
    /// visible to the next owner.
    fn release(&self);

    /// Whether the buffer is one-shot and never returns to the cache.
    fn is_transient(&self) -> bool;

    /// Mark the buffer one-shot.
    fn set_transient(&self);

    /// Whether the buffer is retained across a processing boundary.
    fn is_lease(&self) -> bool;

    /// Mark the buffer leased. The caller must own it.
    fn set_lease(&self);

    /// Drop the lease marker.
    fn clear_lease(&self);

    /// Whether the buffer has been withdrawn from circulation.
    fn is_retired(&self) -> bool;

    /// Withdraw the buffer from circulation.
    fn set_retired(&self);

    /// Run `f` over the whole body.
    fn with_body<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R;

    /// Run `f` over the whole body, mutably.
    fn with_body_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R;
}
