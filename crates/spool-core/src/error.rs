//! Error types for the buffer pool.
//!
//! Only recoverable runtime conditions live here. Contract violations
//! (double acquire, releasing a non-empty buffer, deallocating a buffer
//! that is still listed) are programming errors and are checked with
//! debug assertions instead.

use std::error::Error;
use std::fmt;

/// Errors that can occur during pool operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// Raw memory could not be obtained for a buffer.
    ///
    /// Also reported when the request exceeds the representable
    /// allocation ceiling; callers treat both as "no buffer available".
    AllocationFailed {
        /// Number of body bytes requested.
        requested: usize,
    },
    /// The buffer rejected its header/body size combination.
    InvalidSize {
        /// Header size in bytes.
        header_size: usize,
        /// Body size in bytes.
        body_size: usize,
    },
    /// The rounded request exceeds the configured size limit.
    ///
    /// Only reported when the space is configured to enforce its limit.
    LimitExceeded {
        /// Rounded size in bytes.
        requested: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
    /// The space configuration is invalid.
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// Pre-populating the free list stopped before reaching its target.
    ///
    /// Buffers inserted before the failure stay in the free list.
    PrepopulationFailed {
        /// Number of buffers successfully inserted.
        populated: usize,
        /// Target number of cached buffers.
        target: usize,
    },
    /// In-flight bytes cannot be migrated between the given buffers.
    InvalidMigration {
        /// Number of in-flight bytes to move.
        used: usize,
        /// Additional bytes the producer wants to write.
        requested: usize,
        /// Free bytes available in the destination buffer.
        available: usize,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { requested } => {
                write!(f, "buffer allocation failed: requested {requested} bytes")
            }
            Self::InvalidSize {
                header_size,
                body_size,
            } => {
                write!(
                    f,
                    "invalid buffer size: header {header_size} bytes, body {body_size} bytes"
                )
            }
            Self::LimitExceeded { requested, limit } => {
                write!(
                    f,
                    "buffer size limit exceeded: requested {requested} bytes, limit {limit} bytes"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid space config: {reason}"),
            Self::PrepopulationFailed { populated, target } => {
                write!(
                    f,
                    "free list pre-population failed: {populated} of {target} buffers cached"
                )
            }
            Self::InvalidMigration {
                used,
                requested,
                available,
            } => {
                write!(
                    f,
                    "cannot migrate {used} in-flight bytes plus {requested} requested bytes \
                     into {available} free bytes"
                )
            }
        }
    }
}

impl Error for PoolError {}
