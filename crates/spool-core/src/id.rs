//! Owner identity tokens.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`OwnerId`] allocation.
static OWNER_COUNTER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_OWNER: OwnerId = OwnerId::next();
}

/// Identifies the producer that currently holds a buffer.
///
/// A buffer whose identity is `None` is free for acquisition; any other
/// value means the buffer is exclusively held by that owner. Ids are
/// never zero, so `0` can encode "no owner" in an atomic word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(NonZeroU64);

impl OwnerId {
    /// Allocate a fresh, unique owner id.
    ///
    /// Each call returns an id that has never been returned before within
    /// this process. Thread-safe.
    pub fn next() -> Self {
        let raw = OWNER_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// The owner id of the calling thread.
    ///
    /// Assigned lazily on first use and stable for the thread's lifetime.
    pub fn current() -> Self {
        CURRENT_OWNER.with(|id| *id)
    }

    /// Rebuild an id from its raw value. Returns `None` for zero.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw, non-zero value of this id.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_ids_are_unique() {
        let a = OwnerId::next();
        let b = OwnerId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn current_is_stable_within_a_thread() {
        assert_eq!(OwnerId::current(), OwnerId::current());
    }

    #[test]
    fn current_differs_across_threads() {
        let here = OwnerId::current();
        let there = std::thread::spawn(OwnerId::current).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn zero_is_not_an_owner() {
        assert!(OwnerId::from_raw(0).is_none());
        assert_eq!(OwnerId::from_raw(7).unwrap().get(), 7);
    }
}
