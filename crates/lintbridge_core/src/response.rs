//! Wire results for plugin loading and file linting.
//!
//! Control flow inside the bridge uses these enums; JSON only appears in
//! `to_json`/`to_wire` and their decoding counterparts.

use lintbridge_plugin::{Diagnostic, PluginHandle, RuleDescriptor};
use serde::{Deserialize, Serialize};

use crate::BridgeError;

/// A plugin as reported back to the native side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedPlugin {
    /// Plugin name in effect.
    pub name: String,
    /// Rules in declaration order, with their assigned IDs.
    pub rules: Vec<RuleDescriptor>,
}

impl From<&PluginHandle> for LoadedPlugin {
    fn from(handle: &PluginHandle) -> Self {
        Self {
            name: handle.name.clone(),
            rules: handle.rules.clone(),
        }
    }
}

/// Result of `load_plugin`.
///
/// Serialized as `{"Success": {"name": ..., "rules": [...]}}` or
/// `{"Failure": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadPluginResponse {
    Success(LoadedPlugin),
    Failure(String),
}

impl LoadPluginResponse {
    pub fn from_result(result: Result<LoadedPlugin, BridgeError>) -> Self {
        match result {
            Ok(plugin) => Self::Success(plugin),
            Err(e) => Self::Failure(e.to_string()),
        }
    }

    /// Encodes the response as wire JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "Failure": format!("Failed to serialize plugin: {}", e) })
                .to_string()
        })
    }

    /// Decodes wire JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Result of linting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintFileOutcome {
    /// No diagnostics and no error.
    Clean,
    /// At least one diagnostic.
    Diagnostics(Vec<Diagnostic>),
    /// The file could not be linted.
    Error(String),
}

/// Non-null wire shapes.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LintFileWire {
    Diagnostics(Vec<Diagnostic>),
    Error { error: String },
}

impl LintFileOutcome {
    /// Builds the outcome for a finished lint.
    pub fn from_result(result: Result<Vec<Diagnostic>, BridgeError>) -> Self {
        match result {
            Ok(diagnostics) if diagnostics.is_empty() => Self::Clean,
            Ok(diagnostics) => Self::Diagnostics(diagnostics),
            Err(e) => Self::Error(e.to_string()),
        }
    }

    /// Returns true for the `Error` outcome.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Encodes the outcome: `None`, a JSON array, or `{"error": "..."}`.
    pub fn to_wire(&self) -> Option<String> {
        let wire = match self {
            Self::Clean => return None,
            Self::Diagnostics(diagnostics) => LintFileWire::Diagnostics(diagnostics.clone()),
            Self::Error(error) => LintFileWire::Error {
                error: error.clone(),
            },
        };

        Some(serde_json::to_string(&wire).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("Failed to serialize diagnostics: {}", e) })
                .to_string()
        }))
    }

    /// Decodes the wire form. An empty array decodes as `Clean`.
    pub fn from_wire(wire: Option<&str>) -> Result<Self, serde_json::Error> {
        let Some(json) = wire else {
            return Ok(Self::Clean);
        };

        Ok(match serde_json::from_str(json)? {
            LintFileWire::Diagnostics(diagnostics) if diagnostics.is_empty() => Self::Clean,
            LintFileWire::Diagnostics(diagnostics) => Self::Diagnostics(diagnostics),
            LintFileWire::Error { error } => Self::Error(error),
        })
    }
}
