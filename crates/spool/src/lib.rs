//! Spool: a memory-space buffer pool for high-frequency event recording.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Spool sub-crates. For most users, adding `spool` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use spool::prelude::*;
//! use spool::space::ops;
//!
//! // 4 KiB buffers, 64 KiB limit, two buffers kept cached.
//! let space: MemorySpace<EventBuffer> =
//!     MemorySpace::with_config(SpaceConfig::new(4096, 65_536, 2)).unwrap();
//! space.initialize().unwrap();
//! assert_eq!(space.free_count(), 2);
//!
//! // A producer takes a cached buffer into the full list and writes to it.
//! let owner = OwnerId::current();
//! let buffer = ops::get_to_full(&space, 128, owner).unwrap();
//! assert!(buffer.write(b"event bytes"));
//!
//! // A drain pass flushes it and returns it to the cache.
//! buffer.flush_with(|bytes| assert_eq!(bytes, b"event bytes"));
//! let mut pass = ReleaseProcessor::new(&space, ListKind::Full);
//! ops::process_full_list(&space, &mut pass, Direction::Forward);
//! assert_eq!(pass.processed(), 1);
//! assert_eq!(space.free_count(), 2);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `spool-core` | Owner identity, errors, the buffer contract, `EventBuffer` |
//! | [`space`] | `spool-space` | `MemorySpace`, pool operations, release pass, migration |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`spool-core`).
///
/// Contains [`types::OwnerId`], [`types::PoolError`], the
/// [`types::PoolBuffer`] contract and the concrete [`types::EventBuffer`].
pub use spool_core as types;

/// The buffer pool (`spool-space`).
///
/// [`space::MemorySpace`] owns the free and full lists; [`space::ops`]
/// holds the acquisition and release protocol.
pub use spool_space as space;

/// Common imports for typical Spool usage.
///
/// ```rust
/// use spool::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use spool_core::{EventBuffer, OwnerId, PoolBuffer, PoolError};

    // Pool
    pub use spool_space::{
        BufferHandle, BufferProcessor, DefaultCallback, Direction, ListKind, MemorySpace,
        ReleaseProcessor, SpaceCallback, SpaceConfig, SpaceGuard,
    };

    // Retrieval
    pub use spool_space::{AlternatingRetrieval, Retrieval, SequentialRetrieval};
}
