//! Plugin error types.

use thiserror::Error;

/// Errors that can occur in the plugin system.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Failed to load the plugin module.
    #[error("Failed to load plugin: {0}")]
    LoadError(String),

    /// A rule failed while linting a file.
    #[error("Rule failed: {0}")]
    RuleError(String),

    /// Rule options could not be parsed or validated.
    #[error("Invalid rule options: {0}")]
    InvalidOptions(String),

    /// The file content or per-file JSON could not be used.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Rule ID does not refer to any registered rule.
    #[error("Rule ID {0} is not registered")]
    RuleNotFound(u32),

    /// Options ID does not refer to any entry of the options table.
    #[error("Options ID {0} is not registered")]
    OptionsNotFound(u32),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PluginError {
    /// Creates a load error.
    pub fn load(message: impl Into<String>) -> Self {
        Self::LoadError(message.into())
    }

    /// Creates a rule error.
    pub fn rule(message: impl Into<String>) -> Self {
        Self::RuleError(message.into())
    }

    /// Creates an invalid options error.
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions(message.into())
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
