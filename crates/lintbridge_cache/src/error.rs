//! Cache error types.

use thiserror::Error;

use crate::BufferId;

/// Errors that can occur in the caching layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Content was omitted but nothing is cached for the buffer ID.
    #[error("No buffer is cached for buffer ID {0}")]
    MissingBuffer(BufferId),
}
