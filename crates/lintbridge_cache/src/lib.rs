//! # lintbridge_cache
//!
//! Caching layer for the LintBridge callback bridge.
//!
//! The native side tags every file it sends with a small integer buffer ID.
//! Once a buffer's bytes have crossed the boundary they stay cached under that
//! ID, and later lint calls may omit the content to reuse them.

mod buffer;
mod error;

pub use buffer::{BufferCache, BufferId};
pub use error::CacheError;
