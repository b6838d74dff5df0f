//! Memory-space buffer pool for Spool.
//!
//! A [`MemorySpace`] hands out, recycles and retires fixed-granularity
//! buffers for high-frequency event producers. It caches a configured
//! number of minimum-sized buffers so the hot path reuses memory instead
//! of calling the allocator per event.
//!
//! # Architecture
//!
//! ```text
//! MemorySpace<B, R, C>
//! ├── Mutex<Lists>            (the pool lock; SpaceGuard while held)
//! │   ├── NodeSlab            (slots shared by both lists)
//! │   ├── free: IndexList     (available, most recently released first)
//! │   └── full: IndexList     (in use or awaiting drain)
//! ├── SpaceConfig             (min_elem_size, limit_size, cache_count)
//! ├── R: Retrieval            (which end free-list searches start from)
//! ├── C: SpaceCallback        (cache population policy, retirement hook)
//! └── SpaceStats              (allocation counters)
//! ```
//!
//! The acquisition and release protocol lives in [`ops`]; the flush-epoch
//! pass that returns buffers to circulation is [`ReleaseProcessor`].
//!
//! # Buffer states
//!
//! - **Free:** in the free list, unowned and empty.
//! - **Full:** in the full list, owned by a producer or awaiting drain.
//! - **Detached:** in neither list, exclusively held by a producer.
//!
//! Transient buffers are never cached. Leased buffers are held across a
//! drain boundary. Retired buffers are withdrawn from circulation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod callback;
pub mod config;
pub mod handle;
pub mod list;
pub mod migrate;
pub mod ops;
mod raw;
pub mod release;
pub mod retrieval;
pub mod sizing;
pub mod space;
pub mod stats;

// Public re-exports for the primary API surface.
pub use callback::{DefaultCallback, SpaceCallback};
pub use config::SpaceConfig;
pub use handle::BufferHandle;
pub use list::{Direction, ListKind};
pub use migrate::migrate_outstanding_writes;
pub use raw::{page_size, FALLBACK_PAGE_SIZE};
pub use release::ReleaseProcessor;
pub use retrieval::{AlternatingRetrieval, Retrieval, SequentialRetrieval};
pub use sizing::{align_allocation_size, MAX_ALLOCATION_SIZE};
pub use space::{BufferProcessor, MemorySpace, SpaceGuard};
pub use stats::{SpaceStats, StatsSnapshot};
