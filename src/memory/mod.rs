//! Arena-style memory contexts for bulk record allocation.
//!
//! A [`Context`] is a bump-allocated chain of fixed-size blocks shared by
//! one top-level object, its shallow copies, and any serializer messages
//! attached to it. Contexts are pooled per-thread and trimmed on release
//! against a target derived from a cross-thread rolling average of recent
//! peak usage — "piggybacking" lets a consumer thread that only ever frees
//! contexts a producer thread built still size its own pool sensibly.
//!
//! ```
//! use sr_mem_mgmt::memory::Context;
//!
//! let ctx = Context::new(256).unwrap();
//! ctx.inc();
//! let ptr = ctx.alloc(64).unwrap();
//! assert!(!ptr.as_ptr().is_null());
//! let _ = ctx.dec();
//! ```

mod block;
pub mod config;
pub mod error;
mod peak;
mod pool;

mod context;
mod shim;

pub use context::{abandon, free, Context, Snapshot};
pub use error::ArenaError;
pub use shim::SerializerAllocator;
