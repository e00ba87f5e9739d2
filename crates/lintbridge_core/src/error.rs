//! Bridge error types.

use std::path::Path;

use thiserror::Error;

use crate::Subsystem;

/// Errors that can occur inside the bridge.
///
/// None of these cross the bridge boundary as errors: each operation turns
/// them into its wire result.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A subsystem could not be initialised.
    #[error("Failed to initialize {subsystem} support: {message}")]
    Init {
        subsystem: Subsystem,
        message: String,
    },

    /// A script module could not be imported.
    #[error("Failed to import {path}: {message}")]
    Module { path: String, message: String },

    /// Plugin error.
    #[error(transparent)]
    Plugin(#[from] lintbridge_plugin::PluginError),

    /// Cache error.
    #[error(transparent)]
    Cache(#[from] lintbridge_cache::CacheError),
}

impl BridgeError {
    /// Creates a subsystem initialisation error.
    pub fn init(subsystem: Subsystem, message: impl Into<String>) -> Self {
        Self::Init {
            subsystem,
            message: message.into(),
        }
    }

    /// Creates a module import error.
    pub fn module(path: &Path, message: impl Into<String>) -> Self {
        Self::Module {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}
