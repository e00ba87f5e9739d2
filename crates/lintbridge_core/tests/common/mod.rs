//! In-memory script host for bridge integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lintbridge_core::{BridgeError, ScriptHost, Subsystem};
use lintbridge_plugin::{
    PluginError, PluginLoader, PluginModule, Report, RuleContext, Severity, Span,
};
use parking_lot::Mutex;
use serde_json::Value;

/// Script host that serves modules from memory and counts what it is asked
/// to do.
#[derive(Default)]
pub struct MemoryHost {
    configs: HashMap<PathBuf, Option<Value>>,
    panicking_configs: HashSet<PathBuf>,
    plugins: HashMap<PathBuf, PluginModule>,
    init_failures: Mutex<HashMap<Subsystem, usize>>,
    init_calls: Mutex<HashMap<Subsystem, usize>>,
    plugin_imports: AtomicUsize,
    config_imports: AtomicUsize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `export` as the default export of the config at `path`.
    pub fn with_config(mut self, path: &str, export: Value) -> Self {
        self.configs.insert(PathBuf::from(path), Some(export));
        self
    }

    /// Serves a config module without a default export.
    pub fn with_empty_config(mut self, path: &str) -> Self {
        self.configs.insert(PathBuf::from(path), None);
        self
    }

    /// Panics while importing the config at `path`.
    pub fn with_panicking_config(mut self, path: &str) -> Self {
        self.panicking_configs.insert(PathBuf::from(path));
        self
    }

    pub fn with_plugin(mut self, path: &str, module: PluginModule) -> Self {
        self.plugins.insert(PathBuf::from(path), module);
        self
    }

    /// Fails the next `times` initialisations of `subsystem`.
    pub fn failing_init(self, subsystem: Subsystem, times: usize) -> Self {
        self.init_failures.lock().insert(subsystem, times);
        self
    }

    pub fn init_calls(&self, subsystem: Subsystem) -> usize {
        self.init_calls.lock().get(&subsystem).copied().unwrap_or(0)
    }

    pub fn plugin_imports(&self) -> usize {
        self.plugin_imports.load(Ordering::SeqCst)
    }

    pub fn config_imports(&self) -> usize {
        self.config_imports.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginLoader for MemoryHost {
    async fn import_plugin(&self, path: &Path) -> Result<PluginModule, PluginError> {
        self.plugin_imports.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.plugins
            .get(path)
            .cloned()
            .ok_or_else(|| PluginError::load(format!("Cannot find module {}", path.display())))
    }
}

#[async_trait]
impl ScriptHost for MemoryHost {
    async fn init_subsystem(&self, subsystem: Subsystem) -> Result<(), BridgeError> {
        *self.init_calls.lock().entry(subsystem).or_default() += 1;
        tokio::task::yield_now().await;

        let mut failures = self.init_failures.lock();
        match failures.get_mut(&subsystem) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(BridgeError::init(subsystem, "module not available"))
            }
            _ => Ok(()),
        }
    }

    async fn import_config(&self, path: &Path) -> Result<Option<Value>, BridgeError> {
        self.config_imports.fetch_add(1, Ordering::SeqCst);
        if self.panicking_configs.contains(path) {
            panic!("config module crashed: {}", path.display());
        }
        self.configs
            .get(path)
            .cloned()
            .ok_or_else(|| BridgeError::module(path, "module not found"))
    }
}

/// Reports every occurrence of `needle` in the source.
pub fn find_all(
    needle: &'static str,
) -> impl Fn(&RuleContext<'_>) -> Result<Vec<Report>, PluginError> + Send + Sync + 'static {
    move |ctx: &RuleContext<'_>| -> Result<Vec<Report>, PluginError> {
        Ok(ctx
            .source
            .match_indices(needle)
            .map(|(start, matched)| {
                let start = start as u32;
                Report::new(
                    format!("Found `{}`", matched),
                    Span::new(start, start + matched.len() as u32),
                )
            })
            .collect())
    }
}

/// Reports the first byte with the severity named by `options[0]`.
pub fn severity_from_options(ctx: &RuleContext<'_>) -> Result<Vec<Report>, PluginError> {
    let severity = match ctx.options.first().and_then(Value::as_str) {
        Some("warning") => Severity::Warning,
        Some("info") => Severity::Info,
        Some(other) => {
            return Err(PluginError::invalid_options(format!(
                "unknown severity '{}'",
                other
            )));
        }
        None => Severity::Error,
    };
    Ok(vec![Report::new("first byte", Span::new(0, 1)).with_severity(severity)])
}

/// Always fails.
pub fn broken(_: &RuleContext<'_>) -> Result<Vec<Report>, PluginError> {
    Err(PluginError::rule("internal rule error"))
}

/// A plugin named `markers` with `no-todo` (ID offset + 0) and `no-fixme`
/// (offset + 1).
pub fn markers_plugin() -> PluginModule {
    PluginModule::new(Some("markers"))
        .with_rule("no-todo", find_all("TODO"))
        .with_rule("no-fixme", find_all("FIXME"))
}
