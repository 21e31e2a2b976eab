//! Tunables for block growth, pool sizing, and peak-usage feedback.
//!
//! Mirrors `ArenaAllocatorConfig` / `AdaptivePoolConfig` in spirit: a plain
//! `serde`-derived struct with a `Default`, overridable through a per-thread
//! cell rather than a process-wide singleton, since pool and peak-window
//! state are themselves thread-local (see [`crate::memory::pool`] and
//! [`crate::memory::peak`]).

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ArenaConfig {
    /// Smallest block size `Context::new` will ever allocate.
    pub min_block_size: usize,
    /// How many blocks from the tail of the chain `alloc` will probe before
    /// appending a new block.
    pub max_trailing_blocks_for_alloc: usize,
    /// Multiplier applied to the previous tail block's size when growing.
    pub growth_factor: usize,
    /// Maximum number of idle contexts a thread's pool will hold.
    pub max_pool_size: usize,
    /// Length of the rolling window of recent peak-usage samples.
    pub peak_history_length: usize,
    /// Slack multiplier applied to the trim target on release.
    pub slack: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            min_block_size: 4 * 1024,
            max_trailing_blocks_for_alloc: 3,
            growth_factor: 2,
            max_pool_size: 32,
            peak_history_length: 16,
            slack: 2.0,
        }
    }
}

thread_local! {
    static CONFIG: RefCell<ArenaConfig> = RefCell::new(ArenaConfig::default());
}

/// Overrides the configuration for the current thread. Tests use this to
/// exercise small block sizes deterministically without disturbing other
/// threads' contexts and pools.
pub fn configure(cfg: ArenaConfig) {
    CONFIG.with(|c| *c.borrow_mut() = cfg);
}

/// Returns the configuration in effect on the current thread.
pub fn config() -> ArenaConfig {
    CONFIG.with(|c| *c.borrow())
}
