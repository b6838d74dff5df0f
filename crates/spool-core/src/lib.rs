//! Core types and traits for the Spool event buffer pool.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Spool workspace:
//! the owner identity token, the pool error type, the [`PoolBuffer`]
//! contract every pooled buffer implements, and [`EventBuffer`], the
//! concrete byte buffer producers write events into.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod error;
pub mod id;
pub mod traits;

pub use buffer::EventBuffer;
pub use error::PoolError;
pub use id::OwnerId;
pub use traits::PoolBuffer;
