//! `Record`: a name plus a list of tags, the smallest type that can
//! exercise a constructor, a destructor, and a shallow-copy-via-snapshot
//! conversion against the arena. Not a general schema — real record types
//! are an external collaborator (see spec.md's Non-goals).
//!
//! `Record` carries its Context back-pointer as `Option<Context>`, per
//! spec.md §4.6/§6: a `None` back-pointer means "not arena-managed", and
//! the same constructor/destructor entry points accept both kinds,
//! falling back to plain owned allocations for the latter.

use crate::memory::ArenaError;
#[cfg(feature = "managed")]
use crate::memory::Context;

#[cfg(feature = "managed")]
struct ArenaString {
    ptr: std::ptr::NonNull<u8>,
    len: usize,
}

#[cfg(feature = "managed")]
impl ArenaString {
    /// # Safety
    /// Valid only while the `Context` that produced this allocation is
    /// still alive and not mutated in a way that would invalidate its bytes
    /// (it never is — the arena only ever bumps forward).
    unsafe fn as_str(&self) -> &str {
        std::str::from_utf8_unchecked(std::slice::from_raw_parts(self.ptr.as_ptr(), self.len))
    }
}

/// Either a view into a Context's backing bytes, or a plain owned string —
/// the two shapes a field can take depending on whether its `Record` is
/// arena-managed.
enum Text {
    #[cfg(feature = "managed")]
    Arena(ArenaString),
    Owned(String),
}

impl Text {
    fn as_str(&self) -> &str {
        match self {
            #[cfg(feature = "managed")]
            Text::Arena(a) => unsafe { a.as_str() },
            Text::Owned(s) => s.as_str(),
        }
    }
}

pub struct Record {
    #[cfg(feature = "managed")]
    ctx: Option<Context>,
    name: Text,
    tags: Vec<Text>,
}

impl Record {
    /// Builds a record backed by a managed arena context when the
    /// `managed` feature is enabled (the default); with
    /// `--no-default-features`, every record is built through
    /// [`Record::new_unmanaged`] instead (spec.md §5's build-time disable
    /// switch: the whole subsystem collapses to the system allocator).
    #[cfg(feature = "managed")]
    pub fn new(name: &str, tags: &[&str]) -> Result<Self, ArenaError> {
        let hint = name.len() + tags.iter().map(|t| t.len()).sum::<usize>() + 64;
        let ctx = Context::new(hint)?;
        ctx.inc();
        let stored_name = Text::Arena(copy_into(&ctx, name)?);
        let mut stored_tags = Vec::with_capacity(tags.len());
        for t in tags {
            stored_tags.push(Text::Arena(copy_into(&ctx, t)?));
        }
        Ok(Self {
            ctx: Some(ctx),
            name: stored_name,
            tags: stored_tags,
        })
    }

    #[cfg(not(feature = "managed"))]
    pub fn new(name: &str, tags: &[&str]) -> Result<Self, ArenaError> {
        Ok(Self::new_unmanaged(name, tags))
    }

    /// Builds a record with a null Context back-pointer: no arena
    /// involvement at all, fields stored as plain owned strings that free
    /// themselves individually on drop. This is the backward-compatibility
    /// path spec.md §4.6 requires every destructor to accept — exercised
    /// here even in the managed build, since a real engine's destructors
    /// must handle both arena-allocated and foreign objects side by side.
    pub fn new_unmanaged(name: &str, tags: &[&str]) -> Self {
        Self {
            #[cfg(feature = "managed")]
            ctx: None,
            name: Text::Owned(name.to_owned()),
            tags: tags.iter().map(|t| Text::Owned(t.to_string())).collect(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.tags.iter().map(Text::as_str).collect()
    }

    /// Packs a throwaway length-prefixed wire form, hands it to `f`, then
    /// (for an arena-managed record) rewinds the arena so the packing
    /// never counted as a permanent attachment. This is the shallow-copy
    /// pattern from spec.md §4.6: the temporary form shares the context
    /// without bumping `obj_count`. An unmanaged record (null back-pointer)
    /// packs directly into an owned buffer instead, with nothing to
    /// rewind.
    pub fn with_wire_copy<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        #[cfg(feature = "managed")]
        if let Some(ctx) = &self.ctx {
            let snap = ctx.snapshot();
            let packed = pack_wire_form_arena(ctx, self.name(), &self.tags());
            let result = f(&packed);
            ctx.restore(snap);
            return result;
        }
        let packed = pack_wire_form_owned(self.name(), &self.tags());
        f(&packed)
    }
}

#[cfg(feature = "managed")]
fn copy_into(ctx: &Context, s: &str) -> Result<ArenaString, ArenaError> {
    let bytes = s.as_bytes();
    let ptr = ctx.alloc_aligned(bytes.len().max(1), 1)?;
    // SAFETY: `ptr` was just allocated with at least `bytes.len()` capacity
    // and is not aliased by anything else.
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
    }
    Ok(ArenaString { ptr, len: bytes.len() })
}

fn wire_chunk_len(name: &str, tags: &[&str]) -> usize {
    let mut len = 4 + name.len();
    for t in tags {
        len += 4 + t.len();
    }
    len
}

fn write_chunk(dst: &mut [u8], bytes: &[u8]) -> usize {
    let len = bytes.len() as u32;
    dst[0..4].copy_from_slice(&len.to_le_bytes());
    dst[4..4 + bytes.len()].copy_from_slice(bytes);
    4 + bytes.len()
}

/// Packs into an arena allocation to exercise the shallow-copy path, then
/// copies out into an owned `Vec` for the caller — the arena allocation
/// itself is what `with_wire_copy` rewinds.
#[cfg(feature = "managed")]
fn pack_wire_form_arena(ctx: &Context, name: &str, tags: &[&str]) -> Vec<u8> {
    let scratch_len = wire_chunk_len(name, tags);
    let ptr = ctx
        .alloc_aligned(scratch_len, 1)
        .expect("wire scratch space is bounded by the record's own fields");
    // SAFETY: `ptr` points at `scratch_len` freshly allocated, unaliased
    // bytes.
    let scratch = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), scratch_len) };
    let offset = write_chunk(scratch, name.as_bytes());
    let mut out = scratch[..offset].to_vec();
    for t in tags {
        let mut chunk = vec![0u8; 4 + t.len()];
        write_chunk(&mut chunk, t.as_bytes());
        out.extend_from_slice(&chunk);
    }
    out
}

/// Same wire layout as [`pack_wire_form_arena`], built directly into an
/// owned buffer for records with no Context to scratch-allocate from.
fn pack_wire_form_owned(name: &str, tags: &[&str]) -> Vec<u8> {
    let mut out = vec![0u8; wire_chunk_len(name, tags)];
    let mut offset = write_chunk(&mut out, name.as_bytes());
    for t in tags {
        let mut chunk = vec![0u8; 4 + t.len()];
        write_chunk(&mut chunk, t.as_bytes());
        out[offset..offset + chunk.len()].copy_from_slice(&chunk);
        offset += chunk.len();
    }
    out
}

impl Drop for Record {
    fn drop(&mut self) {
        // A null back-pointer (`ctx: None`, or the feature-disabled build
        // where the field doesn't exist at all) needs no action here:
        // `Text::Owned` frees each field individually through ordinary
        // drop glue, exactly as spec.md §4.6's backward-compatibility
        // clause describes.
        #[cfg(feature = "managed")]
        if let Some(ctx) = &self.ctx {
            // `Record` is the sole owner of its `Context` (no sharing), so
            // this always transitions obj_count 1 -> 0; the context's own
            // `Drop` (run automatically right after this) performs the
            // pool return.
            ctx.dec();
        }
    }
}
