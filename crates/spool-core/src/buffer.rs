//! The concrete event buffer.
//!
//! An [`EventBuffer`] is a fixed-capacity byte region. Producers write
//! event bytes at the committed cursor (`pos`) in two steps: [`stage`]
//! copies bytes into the in-flight region `[pos, pos + n)` and [`commit`]
//! advances `pos` past them. The drain layer reads `[top, pos)` through
//! [`flush_with`] and advances `top`.
//!
//! [`stage`]: EventBuffer::stage
//! [`commit`]: EventBuffer::commit
//! [`flush_with`]: EventBuffer::flush_with

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::PoolError;
use crate::id::OwnerId;
use crate::traits::PoolBuffer;

const TRANSIENT: u8 = 1;
const LEASE: u8 = 1 << 1;
const RETIRED: u8 = 1 << 2;

/// Identity word value meaning "not acquired".
const NO_OWNER: u64 = 0;

/// A pooled byte buffer for serialized events.
///
/// The body is allocated once at construction and never resized. Cursor,
/// identity and flag state are atomics; the body bytes sit behind an
/// uncontended lock that only the owning producer and the drain layer
/// take.
pub struct EventBuffer {
    header_size: usize,
    capacity: usize,
    data: Mutex<Box<[u8]>>,
    /// Committed write cursor.
    pos: AtomicUsize,
    /// Flushed cursor.
    top: AtomicUsize,
    /// Raw [`OwnerId`] of the holder, or `NO_OWNER`.
    identity: AtomicU64,
    flags: AtomicU8,
}

impl EventBuffer {
    /// Copy `bytes` into the in-flight region at `pos` without committing.
    ///
    /// Returns `false` (and writes nothing) if fewer than `bytes.len()`
    /// bytes are free.
    pub fn stage(&self, bytes: &[u8]) -> bool {
        let pos = self.pos.load(Ordering::Acquire);
        let Some(end) = pos.checked_add(bytes.len()) else {
            return false;
        };
        if end > self.capacity {
            return false;
        }
        self.data.lock()[pos..end].copy_from_slice(bytes);
        true
    }

    /// Advance the committed cursor by `len` bytes. Returns `false`, leaving
    /// the cursor where it was, if fewer than `len` bytes are free.
    pub fn commit(&self, len: usize) -> bool {
        let capacity = self.capacity;
        self.pos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pos| {
                pos.checked_add(len).filter(|end| *end <= capacity)
            })
            .is_ok()
    }

    /// Stage and commit `bytes`. Returns `false` if they do not fit.
    pub fn write(&self, bytes: &[u8]) -> bool {
        self.stage(bytes) && self.commit(bytes.len())
    }

    /// Hand the unflushed region `[top, pos)` to `f`, then mark it flushed.
    pub fn flush_with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let top = self.top.load(Ordering::Acquire);
        let pos = self.pos.load(Ordering::Acquire);
        let result = f(&self.data.lock()[top..pos]);
        self.top.store(pos, Ordering::Release);
        result
    }

    /// A copy of every committed byte, `[start, pos)`.
    pub fn committed(&self) -> Vec<u8> {
        let pos = self.pos.load(Ordering::Acquire);
        self.data.lock()[..pos].to_vec()
    }

    fn has_flag(&self, flag: u8) -> bool {
        self.flags.load(Ordering::Acquire) & flag != 0
    }
}

impl PoolBuffer for EventBuffer {
    fn initialize(header_size: usize, body_size: usize) -> Result<Self, PoolError> {
        if body_size == 0 || header_size.checked_add(body_size).is_none() {
            return Err(PoolError::InvalidSize {
                header_size,
                body_size,
            });
        }
        let mut data = Vec::new();
        data.try_reserve_exact(body_size)
            .map_err(|_| PoolError::AllocationFailed {
                requested: body_size,
            })?;
        data.resize(body_size, 0u8);
        Ok(Self {
            header_size,
            capacity: body_size,
            data: Mutex::new(data.into_boxed_slice()),
            pos: AtomicUsize::new(0),
            top: AtomicUsize::new(0),
            identity: AtomicU64::new(NO_OWNER),
            flags: AtomicU8::new(0),
        })
    }

    fn total_size(&self) -> usize {
        self.header_size + self.capacity
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn pos(&self) -> usize {
        self.pos.load(Ordering::Acquire)
    }

    fn top(&self) -> usize {
        self.top.load(Ordering::Acquire)
    }

    fn reinitialize(&self) {
        self.pos.store(0, Ordering::Release);
        self.top.store(0, Ordering::Release);
        self.flags.fetch_and(!(TRANSIENT | RETIRED), Ordering::AcqRel);
    }

    fn identity(&self) -> Option<OwnerId> {
        OwnerId::from_raw(self.identity.load(Ordering::Acquire))
    }

    fn try_acquire(&self, owner: OwnerId) -> bool {
        self.identity
            .compare_exchange(NO_OWNER, owner.get(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        self.identity.store(NO_OWNER, Ordering::Release);
    }

    fn is_transient(&self) -> bool {
        self.has_flag(TRANSIENT)
    }

    fn set_transient(&self) {
        self.flags.fetch_or(TRANSIENT, Ordering::AcqRel);
    }

    fn is_lease(&self) -> bool {
        self.has_flag(LEASE)
    }

    fn set_lease(&self) {
        debug_assert!(self.identity().is_some(), "lease on an unacquired buffer");
        self.flags.fetch_or(LEASE, Ordering::AcqRel);
    }

    fn clear_lease(&self) {
        self.flags.fetch_and(!LEASE, Ordering::AcqRel);
    }

    fn is_retired(&self) -> bool {
        self.has_flag(RETIRED)
    }

    fn set_retired(&self) {
        self.flags.fetch_or(RETIRED, Ordering::AcqRel);
    }

    fn with_body<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.data.lock())
    }

    fn with_body_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.data.lock())
    }
}

impl fmt::Debug for EventBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBuffer")
            .field("capacity", &self.capacity)
            .field("pos", &self.pos())
            .field("top", &self.top())
            .field("identity", &self.identity())
            .field("transient", &self.is_transient())
            .field("lease", &self.is_lease())
            .field("retired", &self.is_retired())
            .finish()
    }
}
