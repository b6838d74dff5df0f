//! Free-list retrieval strategies.
//!
//! Retrieval is first fit: the free list is walked from one end and the
//! first unretired buffer that can be acquired and has room wins. A
//! strategy only picks the end to start from.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::list::Direction;

/// Chooses where a free-list search starts.
pub trait Retrieval: Send + Sync {
    /// Walk direction for the next search.
    fn direction(&self) -> Direction;
}

/// Always search head to tail, most recently released first.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialRetrieval;

impl Retrieval for SequentialRetrieval {
    fn direction(&self) -> Direction {
        Direction::Forward
    }
}

/// Alternate between head-first and tail-first searches.
///
/// Spreads concurrent searchers over both ends of the free list. The
/// toggle is racy; two searchers may occasionally pick the same end.
#[derive(Debug, Default)]
pub struct AlternatingRetrieval {
    last_forward: AtomicBool,
}

impl Retrieval for AlternatingRetrieval {
    fn direction(&self) -> Direction {
        let was_forward = self.last_forward.fetch_xor(true, Ordering::Relaxed);
        if was_forward {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }
}
