//! Buffer fixtures.
//!
//! [`FlakyBuffer`] wraps [`EventBuffer`] and fails `initialize` on demand,
//! so allocation-failure paths can be driven deterministically.

use std::cell::Cell;

use spool_core::{EventBuffer, OwnerId, PoolBuffer, PoolError};

thread_local! {
    /// Successful initializations left before failures start, if armed.
    static BUDGET: Cell<Option<usize>> = const { Cell::new(None) };
}

/// An [`EventBuffer`] whose construction can be made to fail.
///
/// Failure injection is per thread: arm it with
/// [`fail_after`](FlakyBuffer::fail_after) on the thread that allocates.
#[derive(Debug)]
pub struct FlakyBuffer {
    inner: EventBuffer,
}

impl FlakyBuffer {
    /// Let the next `successes` initializations on this thread succeed and
    /// fail every one after that.
    pub fn fail_after(successes: usize) {
        BUDGET.with(|budget| budget.set(Some(successes)));
    }

    /// Stop injecting failures on this thread.
    pub fn disarm() {
        BUDGET.with(|budget| budget.set(None));
    }

    /// The wrapped buffer.
    pub fn inner(&self) -> &EventBuffer {
        &self.inner
    }
}

impl PoolBuffer for FlakyBuffer {
    fn initialize(header_size: usize, body_size: usize) -> Result<Self, PoolError> {
        let allowed = BUDGET.with(|budget| match budget.get() {
            Some(0) => false,
            Some(left) => {
                budget.set(Some(left - 1));
                true
            }
            None => true,
        });
        if !allowed {
            return Err(PoolError::AllocationFailed {
                requested: body_size,
            });
        }
        EventBuffer::initialize(header_size, body_size).map(|inner| Self { inner })
    }

    fn total_size(&self) -> usize {
        self.inner.total_size()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn pos(&self) -> usize {
        self.inner.pos()
    }

    fn top(&self) -> usize {
        self.inner.top()
    }

    fn reinitialize(&self) {
        self.inner.reinitialize();
    }

    fn identity(&self) -> Option<OwnerId> {
        self.inner.identity()
    }

    fn try_acquire(&self, owner: OwnerId) -> bool {
        self.inner.try_acquire(owner)
    }

    fn release(&self) {
        self.inner.release();
    }

    fn is_transient(&self) -> bool {
        self.inner.is_transient()
    }

    fn set_transient(&self) {
        self.inner.set_transient();
    }

    fn is_lease(&self) -> bool {
        self.inner.is_lease()
    }

    fn set_lease(&self) {
        self.inner.set_lease();
    }

    fn clear_lease(&self) {
        self.inner.clear_lease();
    }

    fn is_retired(&self) -> bool {
        self.inner.is_retired()
    }

    fn set_retired(&self) {
        self.inner.set_retired();
    }

    fn with_body<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        self.inner.with_body(f)
    }

    fn with_body_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        self.inner.with_body_mut(f)
    }
}
