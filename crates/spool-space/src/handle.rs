//! Shared buffer handles.
//!
//! A [`BufferHandle`] is a reference-counted pointer to a pooled buffer
//! plus the buffer's list slot. The slot index lets list membership tests
//! and removals run in O(1) without searching: it is written only while
//! the owning space's lock is held and read back under the same lock.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use spool_core::PoolBuffer;

/// Slot value meaning "not linked into any list".
const DETACHED: u32 = u32::MAX;

struct Pooled<B> {
    buffer: B,
    slot: AtomicU32,
}

/// A handle to a buffer allocated by a [`MemorySpace`](crate::MemorySpace).
///
/// Handles are cheap to clone; all clones refer to the same buffer. The
/// space's lists hold one clone while the buffer is listed, and the
/// producer holds another while it writes. Dereferences to the buffer.
pub struct BufferHandle<B> {
    inner: Arc<Pooled<B>>,
}

impl<B: PoolBuffer> BufferHandle<B> {
    pub(crate) fn new(buffer: B) -> Self {
        Self {
            inner: Arc::new(Pooled {
                buffer,
                slot: AtomicU32::new(DETACHED),
            }),
        }
    }

    /// Whether both handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether the buffer is linked into neither list.
    ///
    /// Only meaningful while the space's lock is held.
    pub fn is_detached(&self) -> bool {
        self.slot().is_none()
    }

    pub(crate) fn slot(&self) -> Option<u32> {
        match self.inner.slot.load(Ordering::Relaxed) {
            DETACHED => None,
            slot => Some(slot),
        }
    }

    pub(crate) fn set_slot(&self, slot: Option<u32>) {
        self.inner
            .slot
            .store(slot.unwrap_or(DETACHED), Ordering::Relaxed);
    }
}

impl<B> Clone for BufferHandle<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> Deref for BufferHandle<B> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.inner.buffer
    }
}

impl<B: fmt::Debug> fmt::Debug for BufferHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.slot.load(Ordering::Relaxed);
        f.debug_struct("BufferHandle")
            .field("slot", &(slot != DETACHED).then_some(slot))
            .field("buffer", &self.inner.buffer)
            .finish()
    }
}
