//! Buffer cache keyed by buffer ID.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::CacheError;

/// Numeric handle standing in for a file's content.
pub type BufferId = u32;

/// Process-wide mapping from buffer IDs to the bytes last sent for them.
///
/// There is no eviction: the number of entries is bounded by the number of
/// distinct buffers the native side keeps open.
#[derive(Debug, Default)]
pub struct BufferCache {
    entries: RwLock<HashMap<BufferId, Arc<[u8]>>>,
}

impl BufferCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` for `id`, replacing any earlier content.
    pub fn insert(&self, id: BufferId, bytes: Vec<u8>) -> Arc<[u8]> {
        let bytes: Arc<[u8]> = Arc::from(bytes);
        let previous = self.entries.write().insert(id, Arc::clone(&bytes));
        debug!(
            "Cached {} byte(s) for buffer {}{}",
            bytes.len(),
            id,
            if previous.is_some() { " (replaced)" } else { "" }
        );
        bytes
    }

    /// Returns the bytes cached for `id`.
    pub fn get(&self, id: BufferId) -> Option<Arc<[u8]>> {
        self.entries.read().get(&id).cloned()
    }

    /// Resolves the content for a lint call.
    ///
    /// With `Some(bytes)` the cache entry is overwritten and the new bytes are
    /// returned. With `None` the cached entry is reused, which fails if
    /// nothing was ever cached for `id`.
    pub fn resolve(&self, id: BufferId, bytes: Option<Vec<u8>>) -> Result<Arc<[u8]>, CacheError> {
        match bytes {
            Some(bytes) => Ok(self.insert(id, bytes)),
            None => self.get(id).ok_or(CacheError::MissingBuffer(id)),
        }
    }

    /// Returns the number of cached buffers.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no buffer is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
