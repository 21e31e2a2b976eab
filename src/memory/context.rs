//! The memory context: a chain of [`Block`]s plus the bookkeeping that lets
//! it be pooled, snapshotted, and handed across threads.

use std::cell::Cell;
use std::cell::RefCell;
use std::mem;
use std::ptr::NonNull;

use uuid::Uuid;

use super::block::Block;
use super::config;
use super::error::ArenaError;
use super::peak;
use super::pool;

/// Default alignment handed to callers that don't need anything stricter
/// than the platform's maximum scalar alignment.
const DEFAULT_ALIGN: usize = mem::align_of::<u128>();

/// A bump-allocated arena backing a logical object, its shallow copies, and
/// any serializer messages attached to it.
///
/// `Context` is `Send` (it moves with its owning message across a thread
/// boundary) but deliberately not `Sync`: nothing about it is safe to touch
/// from two threads at once, and the type system enforces that by making
/// every field single-threaded interior mutability (`Cell`/`RefCell`)
/// instead of an atomic or a lock.
pub struct Context {
    id: Uuid,
    blocks: RefCell<Vec<Block>>,
    obj_count: Cell<usize>,
    peak_high_water: Cell<usize>,
    peak_history_hint: Cell<usize>,
}

/// A restorable bookmark into a context's block chain, captured by
/// [`Context::snapshot`] and rewound with [`Context::restore`].
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    tail_index: usize,
    tail_used: usize,
    obj_count: usize,
}

impl Context {
    /// Vends a context sized for at least `hint_size` bytes of initial
    /// capacity: reused from this thread's pool if one fits, freshly
    /// allocated otherwise. The returned context carries this thread's
    /// current rolling peak-usage average as its piggybacked hint.
    pub fn new(hint_size: usize) -> Result<Self, ArenaError> {
        let hint = config::config().min_block_size.max(hint_size);
        let stamp = peak::rolling_average();

        if let Some(ctx) = pool::take(hint) {
            ctx.peak_history_hint.set(stamp);
            tracing::debug!(context_id = %ctx.id, hint, "reused pooled context");
            return Ok(ctx);
        }

        let block = Block::try_new(hint)?;
        let ctx = Self::assemble(Uuid::new_v4(), vec![block], stamp);
        tracing::debug!(context_id = %ctx.id, hint, "allocated fresh context");
        Ok(ctx)
    }

    pub(crate) fn assemble(id: Uuid, blocks: Vec<Block>, peak_history_hint: usize) -> Self {
        Self {
            id,
            blocks: RefCell::new(blocks),
            obj_count: Cell::new(0),
            peak_high_water: Cell::new(0),
            peak_history_hint: Cell::new(peak_history_hint),
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    /// Bumps the allocation cursor forward by `n` bytes at the platform's
    /// default alignment.
    pub fn alloc(&self, n: usize) -> Result<NonNull<u8>, ArenaError> {
        self.alloc_aligned(n, DEFAULT_ALIGN)
    }

    /// Bumps the allocation cursor forward by `n` bytes at `align` (which
    /// must be a power of two).
    pub fn alloc_aligned(&self, n: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        if n == 0 {
            return Err(ArenaError::InvalidAllocationSize { size: n });
        }
        debug_assert!(align.is_power_of_two());

        let cfg = config::config();
        let mut blocks = self.blocks.borrow_mut();
        let window_start = blocks
            .len()
            .saturating_sub(cfg.max_trailing_blocks_for_alloc);

        for block in blocks[window_start..].iter() {
            if let Some(ptr) = block.try_alloc(n, align) {
                self.bump_peak(&blocks);
                return Ok(ptr);
            }
        }

        let prev_size = blocks.last().map(|b| b.size()).unwrap_or(0);
        let new_size = cfg
            .min_block_size
            .max(n)
            .max(prev_size.saturating_mul(cfg.growth_factor));
        let block = Block::try_new(new_size)?;
        let ptr = block.try_alloc(n, align).ok_or_else(|| ArenaError::OutOfMemory {
            reason: format!("{n} bytes do not fit in a fresh {new_size}-byte block"),
        })?;
        blocks.push(block);
        self.bump_peak(&blocks);
        Ok(ptr)
    }

    fn bump_peak(&self, blocks: &[Block]) {
        let total: usize = blocks.iter().map(|b| b.used()).sum();
        if total > self.peak_high_water.get() {
            self.peak_high_water.set(total);
        }
    }

    /// Attaches one more object (constructor, shallow copy that escapes a
    /// snapshot/restore bracket, or serializer message) to this context.
    pub fn inc(&self) {
        self.obj_count.set(self.obj_count.get() + 1);
    }

    /// Detaches one object. Returns `true` if this was the last one.
    pub fn dec(&self) -> bool {
        let n = self.obj_count.get();
        debug_assert!(n > 0, "dec() called on a context with no attached objects");
        let n = n.saturating_sub(1);
        self.obj_count.set(n);
        n == 0
    }

    pub fn obj_count(&self) -> usize {
        self.obj_count.get()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.borrow().len()
    }

    pub fn used_bytes(&self) -> usize {
        self.blocks.borrow().iter().map(|b| b.used()).sum()
    }

    pub fn capacity_bytes(&self) -> usize {
        self.blocks.borrow().iter().map(|b| b.size()).sum()
    }

    /// Captures the current tail block and object count so later allocations
    /// can be undone with [`Context::restore`].
    pub fn snapshot(&self) -> Snapshot {
        let blocks = self.blocks.borrow();
        let tail_index = blocks.len().saturating_sub(1);
        let tail_used = blocks.last().map(|b| b.used()).unwrap_or(0);
        Snapshot {
            tail_index,
            tail_used,
            obj_count: self.obj_count.get(),
        }
    }

    /// Rewinds this context to a previously captured [`Snapshot`], dropping
    /// any blocks appended since and restoring `obj_count`. Must be called
    /// on the same thread that took the snapshot; restoring a snapshot
    /// captured by another context, or after that context escaped to
    /// another thread, is undiagnosed misuse.
    pub fn restore(&self, snap: Snapshot) {
        let mut blocks = self.blocks.borrow_mut();
        debug_assert!(snap.tail_index < blocks.len());
        blocks.truncate(snap.tail_index + 1);
        if let Some(tail) = blocks.last() {
            tail.set_used(snap.tail_used);
        }
        drop(blocks);
        self.obj_count.set(snap.obj_count);
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let obj_count = self.obj_count.get();
        if obj_count != 0 {
            tracing::warn!(
                context_id = %self.id,
                obj_count,
                "context dropped with objects still attached"
            );
        }

        let peak = self.peak_high_water.get();
        peak::record_peak(peak);
        let avg = peak::rolling_average();
        let target = (avg.max(self.peak_history_hint.get()) as f64 * config::config().slack) as usize;

        let mut blocks = mem::take(self.blocks.get_mut());
        trim_to_target(&mut blocks, target);
        for b in blocks.iter() {
            b.reset();
        }

        pool::offer_blocks(self.id, blocks);
    }
}

fn trim_to_target(blocks: &mut Vec<Block>, target: usize) {
    let mut total: usize = blocks.iter().map(|b| b.size()).sum();
    while blocks.len() > 1 && total > target {
        if let Some(b) = blocks.pop() {
            total -= b.size();
        }
    }
}

/// Explicitly releases a context. Only legal when [`Context::obj_count`] is
/// zero; called early, this is a contract violation (spec.md §7), so it's
/// surfaced as [`ArenaError::ContextNotEmpty`] instead of silently dropping
/// live objects' backing storage.
pub fn free(ctx: Context) -> Result<(), ArenaError> {
    let obj_count = ctx.obj_count.get();
    if obj_count != 0 {
        tracing::warn!(
            context_id = %ctx.id,
            obj_count,
            "free() called while objects are still attached"
        );
        return Err(ArenaError::ContextNotEmpty { obj_count });
    }
    drop(ctx);
    Ok(())
}

/// Releases a context outside the normal dec-to-zero path, used when a
/// serializer unpack fails partway through and no object exists to drive
/// the usual destructor sequence. Unlike an ordinary release, this tears
/// the blocks down directly rather than going through `Context::drop`'s
/// trim-and-offer path: a malformed unpack must leak zero bytes *and*
/// create zero pool entries (spec.md §8 S6), and a half-built context is
/// not something later reuse should be sized against.
pub fn abandon(mut ctx: Context) {
    tracing::debug!(context_id = %ctx.id, obj_count = ctx.obj_count.get(), "abandoning context");
    let blocks = mem::take(ctx.blocks.get_mut());
    drop(blocks);
    mem::forget(ctx);
}
