//! Arena-style memory contexts for bulk record allocation, with
//! cross-thread pool feedback.
//!
//! See [`memory`] for the arena itself and [`demo`] for a minimal record
//! type exercising the constructor/shallow-copy/destructor contract it's
//! built for.

pub mod demo;
pub mod memory;

pub use demo::Record;
pub use memory::{ArenaError, Context, SerializerAllocator, Snapshot};
