//! Per-thread bounded LIFO of idle, zero-`obj_count` contexts.
//!
//! Grounded on the `THREAD_CACHE: RefCell<Option<ThreadLocalCache>>` pattern
//! the teacher uses for its own per-thread allocator cache: no locks, no
//! atomics, just `thread_local!` + `RefCell` since a pool is only ever
//! touched by the thread it belongs to.

use std::cell::RefCell;

use uuid::Uuid;

use super::block::Block;
use super::config;
use super::context::Context;

thread_local! {
    static POOL: RefCell<Vec<Context>> = RefCell::new(Vec::new());
}

/// Removes and returns the most recently pooled context with at least
/// `hint_size` bytes of total capacity, if one exists.
pub(crate) fn take(hint_size: usize) -> Option<Context> {
    POOL.with(|p| {
        let mut pool = p.borrow_mut();
        let pos = pool
            .iter()
            .rposition(|ctx| ctx.capacity_bytes() >= hint_size)?;
        Some(pool.remove(pos))
    })
}

/// Offers a released context's already-trimmed blocks back to the pool. If
/// the pool is at capacity, the blocks are simply dropped (deallocating
/// their memory).
pub(crate) fn offer_blocks(id: Uuid, blocks: Vec<Block>) {
    POOL.with(|p| {
        let mut pool = p.borrow_mut();
        if pool.len() >= config::config().max_pool_size {
            tracing::debug!(context_id = %id, "pool full, dropping context");
            return;
        }
        pool.push(Context::assemble(id, blocks, 0));
    });
}

#[cfg(test)]
pub(crate) fn len() -> usize {
    POOL.with(|p| p.borrow().len())
}
