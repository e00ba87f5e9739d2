//! Typed lint configuration, decoded on the native side.

use std::collections::BTreeMap;
use std::path::PathBuf;

use globset::{Glob, GlobSet, GlobSetBuilder};
use lintbridge_plugin::Severity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::ConfigLoadResult;

/// Lint configuration exported by a config module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintConfig {
    /// Plugin module paths to load.
    pub plugins: Vec<String>,

    /// Rule settings keyed by `plugin/rule`.
    pub rules: BTreeMap<String, RuleSetting>,

    /// Shared settings passed to every rule.
    pub settings: Map<String, Value>,

    /// Declared globals passed to every rule.
    pub globals: Map<String, Value>,

    /// Configs this one extends.
    pub extends: Vec<String>,

    /// Glob patterns of files to skip, matched against the file path.
    pub ignore_patterns: Vec<String>,
}

impl LintConfig {
    /// Layers `other` on top of `self`; later settings win.
    pub fn merge(&mut self, other: LintConfig) {
        for plugin in other.plugins {
            if !self.plugins.contains(&plugin) {
                self.plugins.push(plugin);
            }
        }
        self.rules.extend(other.rules);
        self.settings.extend(other.settings);
        self.globals.extend(other.globals);
        self.extends.extend(other.extends);
        self.ignore_patterns.extend(other.ignore_patterns);
    }

    /// Compiles `ignore_patterns`. Returns `None` when there are none.
    pub fn ignore_globs(&self) -> Result<Option<GlobSet>, ConfigDiagnostic> {
        if self.ignore_patterns.is_empty() {
            return Ok(None);
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                ConfigDiagnostic::error(format!("Invalid ignore pattern '{}'", pattern))
                    .with_note(e.to_string())
            })?;
            builder.add(glob);
        }

        let globset = builder.build().map_err(|e| {
            ConfigDiagnostic::error("Failed to build ignore patterns").with_note(e.to_string())
        })?;

        Ok(Some(globset))
    }
}

/// Rule level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleLevel {
    /// Rule is disabled.
    Off,
    /// Findings are warnings.
    Warn,
    /// Findings are errors.
    Error,
}

impl RuleLevel {
    /// Parses `"off" | "warn" | "error"` or `0 | 1 | 2`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => match s.as_str() {
                "off" => Some(Self::Off),
                "warn" => Some(Self::Warn),
                "error" => Some(Self::Error),
                _ => None,
            },
            Value::Number(n) => match n.as_u64()? {
                0 => Some(Self::Off),
                1 => Some(Self::Warn),
                2 => Some(Self::Error),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the diagnostic severity for an enabled level.
    pub fn severity(self) -> Option<Severity> {
        match self {
            Self::Off => None,
            Self::Warn => Some(Severity::Warning),
            Self::Error => Some(Severity::Error),
        }
    }
}

/// Configuration for a single rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSetting {
    /// `[level, ...options]`.
    WithOptions(Vec<Value>),
    /// Bare level (`"warn"`, `2`, ...).
    Level(Value),
}

impl RuleSetting {
    /// Returns the rule level, or `None` if it is not a valid level.
    pub fn level(&self) -> Option<RuleLevel> {
        match self {
            RuleSetting::WithOptions(list) => list.first().and_then(RuleLevel::from_value),
            RuleSetting::Level(value) => RuleLevel::from_value(value),
        }
    }

    /// Returns the options list handed to the rule.
    pub fn options(&self) -> Vec<Value> {
        match self {
            RuleSetting::WithOptions(list) => list.iter().skip(1).cloned().collect(),
            RuleSetting::Level(_) => Vec::new(),
        }
    }
}

/// A decoded config together with the module it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    /// Path of the config module.
    pub path: PathBuf,
    /// Decoded configuration.
    pub config: LintConfig,
}

/// A config loading problem, rendered through `miette`.
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
#[error("{message}")]
pub struct ConfigDiagnostic {
    /// Primary message.
    pub message: String,
    /// Underlying cause.
    #[help]
    pub note: Option<String>,
}

impl ConfigDiagnostic {
    /// Creates a diagnostic without a note.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            note: None,
        }
    }

    /// Attaches a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl ConfigLoadResult {
    /// Decodes every loaded config.
    ///
    /// Reports every config that does not decode or that uses `extends`,
    /// rather than stopping at the first.
    pub fn into_configs(self) -> Result<Vec<LoadedConfig>, Vec<ConfigDiagnostic>> {
        match self {
            ConfigLoadResult::Success(entries) => {
                let mut configs = Vec::with_capacity(entries.len());
                let mut errors = Vec::new();

                for entry in entries {
                    let config: LintConfig =
                        match serde_json::from_value(Value::Object(entry.config)) {
                            Ok(config) => config,
                            Err(e) => {
                                errors.push(
                                    ConfigDiagnostic::error(format!(
                                        "Failed to parse config from {}",
                                        entry.path
                                    ))
                                    .with_note(e.to_string()),
                                );
                                continue;
                            }
                        };

                    if !config.extends.is_empty() {
                        errors.push(ConfigDiagnostic::error(format!(
                            "`extends` in script configs is not yet supported (found in {})",
                            entry.path
                        )));
                        continue;
                    }

                    configs.push(LoadedConfig {
                        path: PathBuf::from(entry.path),
                        config,
                    });
                }

                if errors.is_empty() {
                    Ok(configs)
                } else {
                    Err(errors)
                }
            }
            ConfigLoadResult::Failures(failures) => Err(failures
                .into_iter()
                .map(|failure| {
                    ConfigDiagnostic::error(format!("Failed to load config: {}", failure.path))
                        .with_note(failure.error)
                })
                .collect()),
            ConfigLoadResult::Error(error) => {
                Err(vec![
                    ConfigDiagnostic::error("Failed to load config files").with_note(error),
                ])
            }
        }
    }
}
