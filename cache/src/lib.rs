//! A generic, thread-safe map cache with scoped locked sessions.
//!
//! # Features
//! - **Reader/Writer Locking**: Lookups share a single `parking_lot::RwLock`;
//!   writes take it exclusively.
//! - **Atomic Sessions**: [`SafeCache::with_lock`] holds the write lock across a
//!   whole callback, so several reads and writes land as one unit.
//! - **Capacity Memory**: [`SafeCache::reset`] rebuilds the map at the capacity
//!   the cache was created with.
//! - **Explicit Ownership**: No global registry. Hosts that need to reset every
//!   cache at once hold them as [`Resettable`] handles.

mod safe_cache;
mod session;

pub use safe_cache::{Resettable, SafeCache};
pub use session::LockedSession;
