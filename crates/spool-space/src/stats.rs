//! Allocation statistics for one memory space.
//!
//! All counters use `Relaxed` ordering and are diagnostic only: a
//! [`StatsSnapshot`] may be transiently inconsistent across counters.
//! Do NOT use these values for allocation decisions.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Live counters updated by a space as it allocates and frees buffers.
#[derive(Debug, Default)]
pub struct SpaceStats {
    allocations: AtomicU64,
    deallocations: AtomicU64,
    allocation_failures: AtomicU64,
    live_buffers: AtomicUsize,
    live_bytes: AtomicUsize,
}

/// A point-in-time copy of [`SpaceStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Buffers allocated since the space was created.
    pub allocations: u64,
    /// Buffers deallocated since the space was created.
    pub deallocations: u64,
    /// Allocation attempts that returned an error.
    pub allocation_failures: u64,
    /// Buffers currently allocated (listed or held by producers).
    pub live_buffers: usize,
    /// Sum of `total_size()` over live buffers.
    pub live_bytes: usize,
}

impl SpaceStats {
    pub(crate) fn record_allocation(&self, total_size: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.live_buffers.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(total_size, Ordering::Relaxed);
    }

    pub(crate) fn record_deallocation(&self, total_size: usize) {
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        self.live_buffers.fetch_sub(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(total_size, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            allocations: self.allocations.load(Ordering::Relaxed),
            deallocations: self.deallocations.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
            live_buffers: self.live_buffers.load(Ordering::Relaxed),
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
        }
    }
}
