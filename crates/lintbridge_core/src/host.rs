//! Script host seam.
//!
//! The bridge never executes script code itself. Everything that requires the
//! script runtime (importing a plugin, importing a config module, paying for a
//! heavy subsystem) goes through a `ScriptHost`.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use jsonc_parser::ParseOptions;
use lintbridge_plugin::{DeclarativePlugin, PluginError, PluginLoader, PluginModule};
use serde_json::Value;
use tracing::debug;

use crate::BridgeError;

/// Heavy subsystems that are only loaded on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// Plugin loading and rule execution.
    Plugins,
    /// Editor workspaces.
    Workspaces,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Plugins => f.write_str("plugin"),
            Subsystem::Workspaces => f.write_str("workspace"),
        }
    }
}

/// The script runtime the bridge delegates to.
#[async_trait]
pub trait ScriptHost: PluginLoader {
    /// Loads a heavy subsystem.
    ///
    /// The bridge calls this at most once per subsystem, unless a call fails,
    /// in which case the next use retries.
    async fn init_subsystem(&self, subsystem: Subsystem) -> Result<(), BridgeError> {
        debug!("{} support needs no preparation", subsystem);
        Ok(())
    }

    /// Imports a config module and returns its default export.
    ///
    /// `Ok(None)` means the module has no default export.
    async fn import_config(&self, path: &Path) -> Result<Option<Value>, BridgeError>;
}

/// Script host backed by the file system.
///
/// Config modules are JSON or JSONC files whose whole document is the default
/// export. Plugin modules are declarative JSON plugins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsScriptHost;

impl FsScriptHost {
    /// Creates a new file system host.
    pub fn new() -> Self {
        Self
    }

    async fn read_module(path: &Path) -> Result<Option<Value>, BridgeError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json" | "jsonc") => {}
            _ => {
                return Err(BridgeError::module(
                    path,
                    "unsupported module type (expected .json or .jsonc)",
                ));
            }
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BridgeError::module(path, e.to_string()))?;

        jsonc_parser::parse_to_serde_value(&content, &ParseOptions::default())
            .map_err(|e| BridgeError::module(path, e.to_string()))
    }
}

#[async_trait]
impl PluginLoader for FsScriptHost {
    async fn import_plugin(&self, path: &Path) -> Result<PluginModule, PluginError> {
        let value = Self::read_module(path)
            .await
            .map_err(|e| PluginError::load(e.to_string()))?
            .ok_or_else(|| PluginError::load(format!("{} is empty", path.display())))?;

        DeclarativePlugin::from_value(value)
    }
}

#[async_trait]
impl ScriptHost for FsScriptHost {
    async fn import_config(&self, path: &Path) -> Result<Option<Value>, BridgeError> {
        Self::read_module(path).await
    }
}
