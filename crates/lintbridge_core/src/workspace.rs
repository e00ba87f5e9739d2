//! Workspace registry for editor sessions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info};
use url::Url;

/// A lint session identified by URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// URI the workspace was created with.
    pub uri: String,
    /// File system root, when the URI is a `file:` URL.
    pub root: Option<PathBuf>,
    /// Creation order within the registry.
    pub generation: u64,
}

/// Registry of live workspaces.
#[derive(Debug, Default)]
pub struct WorkspaceRegistry {
    workspaces: RwLock<HashMap<String, Workspace>>,
    next_generation: AtomicU64,
}

impl WorkspaceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the workspace for `uri`.
    ///
    /// Returns `false` if the workspace already existed, in which case it is
    /// left untouched.
    pub fn create(&self, uri: &str) -> bool {
        let mut workspaces = self.workspaces.write();
        if workspaces.contains_key(uri) {
            debug!("Workspace {} already exists", uri);
            return false;
        }

        let workspace = Workspace {
            uri: uri.to_string(),
            root: file_root(uri),
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
        };
        info!("Created workspace {}", uri);
        workspaces.insert(uri.to_string(), workspace);
        true
    }

    /// Tears down the workspace for `uri`.
    ///
    /// Returns `false` if no such workspace existed.
    pub fn destroy(&self, uri: &str) -> bool {
        match self.workspaces.write().remove(uri) {
            Some(_) => {
                info!("Destroyed workspace {}", uri);
                true
            }
            None => {
                debug!("No workspace to destroy for {}", uri);
                false
            }
        }
    }

    /// Returns a snapshot of the workspace for `uri`.
    pub fn get(&self, uri: &str) -> Option<Workspace> {
        self.workspaces.read().get(uri).cloned()
    }

    /// Returns the URIs of all live workspaces in creation order.
    pub fn uris(&self) -> Vec<String> {
        let workspaces = self.workspaces.read();
        let mut live: Vec<&Workspace> = workspaces.values().collect();
        live.sort_by_key(|w| w.generation);
        live.into_iter().map(|w| w.uri.clone()).collect()
    }

    /// Returns the number of live workspaces.
    pub fn len(&self) -> usize {
        self.workspaces.read().len()
    }

    /// Returns true if there are no live workspaces.
    pub fn is_empty(&self) -> bool {
        self.workspaces.read().is_empty()
    }
}

fn file_root(uri: &str) -> Option<PathBuf> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}
