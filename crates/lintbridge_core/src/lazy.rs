//! At-most-once subsystem initialisation.

use std::future::Future;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{BridgeError, Subsystem};

/// A subsystem that is initialised on first use.
///
/// Concurrent first-use calls share a single initialisation: the first caller
/// runs it and the others wait for its outcome. A failed initialisation leaves
/// the cell empty, so a later call retries.
#[derive(Debug)]
pub struct Lazy<T> {
    subsystem: Subsystem,
    cell: OnceCell<T>,
}

impl<T> Lazy<T> {
    /// Creates an uninitialised subsystem slot.
    pub const fn new(subsystem: Subsystem) -> Self {
        Self {
            subsystem,
            cell: OnceCell::const_new(),
        }
    }

    /// Returns the subsystem if it is already initialised.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Returns the subsystem, running `init` first if nobody has yet.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<&T, BridgeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BridgeError>>,
    {
        let subsystem = self.subsystem;
        self.cell
            .get_or_try_init(|| async move {
                info!("Loading {} support", subsystem);
                init().await.inspect_err(|e| {
                    warn!("Loading {} support failed: {}", subsystem, e);
                })
            })
            .await
    }
}
