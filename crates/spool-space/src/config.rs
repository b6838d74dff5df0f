//! Memory space configuration parameters.

use spool_core::PoolError;

use crate::raw::page_size;

/// Configuration for a [`MemorySpace`](crate::MemorySpace).
///
/// One configuration describes one logical buffer class (for example
/// thread-local event buffers, or global overflow buffers). Validated at
/// construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpaceConfig {
    /// Smallest buffer body in bytes. Every buffer body is this size times
    /// a power of two.
    ///
    /// Default: 65_536. Must be a non-zero multiple of the page size.
    pub min_elem_size: usize,

    /// Size limit in bytes for a single buffer body.
    ///
    /// Default: 16 MiB. Must be a multiple of the page size and at least
    /// `min_elem_size`. Only enforced when `enforce_limit` is set.
    pub limit_size: usize,

    /// Target steady-state population of the free list.
    ///
    /// Default: 8. `initialize()` pre-allocates this many minimum-sized
    /// buffers; releases only re-cache buffers while the free list is
    /// below it.
    pub cache_count: usize,

    /// Reject allocations whose rounded size exceeds `limit_size`.
    ///
    /// Default: `false`. Sizing itself is a pure rounding function; this
    /// switch opts the space into treating the limit as a hard ceiling.
    pub enforce_limit: bool,
}

impl SpaceConfig {
    /// Default minimum element size: 64 KiB.
    pub const DEFAULT_MIN_ELEM_SIZE: usize = 64 * 1024;

    /// Default size limit: 16 MiB.
    pub const DEFAULT_LIMIT_SIZE: usize = 16 * 1024 * 1024;

    /// Default free-list target population.
    pub const DEFAULT_CACHE_COUNT: usize = 8;

    /// Create a config with the given sizes and cache target.
    ///
    /// The limit is not enforced; see [`enforce_limit`](Self::enforce_limit).
    pub fn new(min_elem_size: usize, limit_size: usize, cache_count: usize) -> Self {
        Self {
            min_elem_size,
            limit_size,
            cache_count,
            enforce_limit: false,
        }
    }

    /// Builder-style switch for limit enforcement.
    pub fn with_enforced_limit(mut self) -> Self {
        self.enforce_limit = true;
        self
    }

    /// Check the sizes against each other and the platform page size.
    pub fn validate(&self) -> Result<(), PoolError> {
        let page = page_size();
        if self.min_elem_size == 0 || self.min_elem_size % page != 0 {
            return Err(PoolError::InvalidConfig {
                reason: format!(
                    "min_elem_size must be a non-zero multiple of the page size {page} (got {})",
                    self.min_elem_size,
                ),
            });
        }
        if self.limit_size % page != 0 {
            return Err(PoolError::InvalidConfig {
                reason: format!(
                    "limit_size must be a multiple of the page size {page} (got {})",
                    self.limit_size,
                ),
            });
        }
        if self.limit_size < self.min_elem_size {
            return Err(PoolError::InvalidConfig {
                reason: format!(
                    "limit_size {} is smaller than min_elem_size {}",
                    self.limit_size, self.min_elem_size,
                ),
            });
        }
        Ok(())
    }
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MIN_ELEM_SIZE,
            Self::DEFAULT_LIMIT_SIZE,
            Self::DEFAULT_CACHE_COUNT,
        )
    }
}
