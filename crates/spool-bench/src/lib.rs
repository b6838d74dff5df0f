//! Benchmark profiles for the Spool event buffer pool.
//!
//! - [`reference_space`]: 64 KiB minimum class, 8 cached buffers
//! - [`hot_path_space`]: 4 KiB minimum class, 64 cached buffers

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use spool_core::{EventBuffer, PoolError};
use spool_space::{MemorySpace, SpaceConfig};

/// A pre-populated space with the default configuration.
pub fn reference_space() -> Result<MemorySpace<EventBuffer>, PoolError> {
    let space = MemorySpace::with_config(SpaceConfig::default())?;
    space.initialize()?;
    Ok(space)
}

/// A pre-populated space of small buffers with a deep cache, for
/// measuring list operations rather than allocation.
pub fn hot_path_space() -> Result<MemorySpace<EventBuffer>, PoolError> {
    let space = MemorySpace::with_config(SpaceConfig::new(4096, 1024 * 1024, 64))?;
    space.initialize()?;
    Ok(space)
}
