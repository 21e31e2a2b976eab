//! Error type for the arena subsystem.

use thiserror::Error;

/// Failure modes surfaced by [`crate::memory`]. Only allocation that grows
/// the block chain can actually fail (see spec invariant on allocation
/// totality); the other variants exist for debug-build contract checks and
/// are never returned from a correctly-paired constructor/destructor.
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("failed to allocate {reason}")]
    OutOfMemory { reason: String },

    #[error("invalid allocation size: {size}")]
    InvalidAllocationSize { size: usize },

    #[error("context freed with {obj_count} object(s) still attached")]
    ContextNotEmpty { obj_count: usize },
}
