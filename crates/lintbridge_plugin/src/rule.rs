//! Rule and plugin module abstractions.
//!
//! A plugin module is whatever the host runtime produced when it imported a
//! plugin file: an optional declared name plus an ordered rule table. The
//! `PluginLoader` trait is the seam to that runtime.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{PluginError, Report};

/// Everything a rule sees while linting one file.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Path of the file being linted.
    pub file_path: &'a Path,
    /// Decoded source text.
    pub source: &'a str,
    /// Options list configured for this rule.
    pub options: &'a [Value],
    /// Shared settings for the file.
    pub settings: &'a Map<String, Value>,
    /// Globals declared for the file.
    pub globals: &'a Map<String, Value>,
}

/// A lint rule contributed by a plugin.
pub trait Rule: Send + Sync {
    /// Lints one file and returns the findings.
    fn run(&self, ctx: &RuleContext<'_>) -> Result<Vec<Report>, PluginError>;
}

impl<F> Rule for F
where
    F: Fn(&RuleContext<'_>) -> Result<Vec<Report>, PluginError> + Send + Sync,
{
    fn run(&self, ctx: &RuleContext<'_>) -> Result<Vec<Report>, PluginError> {
        self(ctx)
    }
}

/// One entry of a plugin's exported rule table.
#[derive(Clone)]
pub struct RuleEntry {
    /// Rule name without the plugin prefix.
    pub name: String,
    /// Rule implementation.
    pub rule: Arc<dyn Rule>,
}

impl fmt::Debug for RuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEntry")
            .field("name", &self.name)
            .field("rule", &"<dyn Rule>")
            .finish()
    }
}

/// A loaded plugin module.
#[derive(Debug, Clone, Default)]
pub struct PluginModule {
    /// Name the plugin declares for itself, if any.
    pub name: Option<String>,
    /// Exported rules, in declaration order.
    pub rules: Vec<RuleEntry>,
}

impl PluginModule {
    /// Creates a module with an optional declared name and no rules.
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            rules: Vec::new(),
        }
    }

    /// Appends a rule to the rule table.
    pub fn with_rule(mut self, name: impl Into<String>, rule: impl Rule + 'static) -> Self {
        self.rules.push(RuleEntry {
            name: name.into(),
            rule: Arc::new(rule),
        });
        self
    }
}

/// Imports plugin modules by path.
///
/// Implemented by the host runtime. The registry calls `import_plugin` at most
/// once per successfully loaded path.
#[async_trait]
pub trait PluginLoader: Send + Sync {
    /// Imports the plugin module at `path`.
    async fn import_plugin(&self, path: &Path) -> Result<PluginModule, PluginError>;
}
