//! Bridge entry points.
//!
//! Each operation initialises the subsystem it needs on first use, delegates
//! to the matching registry, and turns every expected failure into its wire
//! result. Only precondition violations escape, as panics.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use lintbridge_cache::{BufferCache, BufferId};
use lintbridge_plugin::{Diagnostic, PluginLoader, PluginRegistry};
use tracing::warn;

use crate::{
    BridgeError, Lazy, LintFileOutcome, LoadPluginResponse, LoadedPlugin, ScriptHost, Subsystem,
    WorkspaceRegistry,
};

/// The fixed set of operations the native engine calls.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Loads a plugin module.
    ///
    /// Returns [`LoadPluginResponse`] as JSON.
    async fn load_plugin(
        &self,
        path: String,
        plugin_name: Option<String>,
        plugin_name_is_alias: bool,
    ) -> String;

    /// Replaces the rule options table.
    ///
    /// Returns `None` on success, or the error message.
    ///
    /// # Panics
    ///
    /// Panics if no plugin has been loaded yet.
    fn setup_rule_configs(&self, options_json: String) -> Option<String>;

    /// Lints one file.
    ///
    /// With `buffer` set to `None` the content cached for `buffer_id` is
    /// reused. Returns [`LintFileOutcome`] in its wire form.
    ///
    /// # Panics
    ///
    /// Panics if no plugin has been loaded, if no options table has been set
    /// up, or if `rule_ids` and `options_ids` differ in length.
    #[allow(clippy::too_many_arguments)]
    fn lint_file(
        &self,
        file_path: String,
        buffer_id: BufferId,
        buffer: Option<Vec<u8>>,
        rule_ids: Vec<u32>,
        options_ids: Vec<u32>,
        settings_json: String,
        globals_json: String,
    ) -> Option<String>;

    /// Creates workspace state for `uri`.
    ///
    /// Returns `None` once the workspace is ready, or the error message.
    async fn create_workspace(&self, uri: String) -> Option<String>;

    /// Tears down workspace state for `uri`.
    ///
    /// # Panics
    ///
    /// Panics if `create_workspace` has never completed.
    fn destroy_workspace(&self, uri: String);

    /// Loads config modules concurrently.
    ///
    /// Returns [`crate::ConfigLoadResult`] as JSON.
    async fn load_configs(&self, paths: Vec<String>) -> String;
}

/// [`Bridge`] implementation that delegates to a [`ScriptHost`].
pub struct HostBridge<H: ScriptHost + 'static> {
    host: Arc<H>,
    plugins: Lazy<PluginRegistry>,
    workspaces: Lazy<WorkspaceRegistry>,
    buffers: BufferCache,
}

impl<H: ScriptHost + 'static> HostBridge<H> {
    /// Creates a bridge with no subsystem loaded.
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            plugins: Lazy::new(Subsystem::Plugins),
            workspaces: Lazy::new(Subsystem::Workspaces),
            buffers: BufferCache::new(),
        }
    }

    /// Returns the script host.
    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Returns the buffer cache.
    pub fn buffers(&self) -> &BufferCache {
        &self.buffers
    }

    /// Returns the plugin registry if plugin support is loaded.
    pub fn plugins(&self) -> Option<&PluginRegistry> {
        self.plugins.get()
    }

    /// Returns the workspace registry if workspace support is loaded.
    pub fn workspaces(&self) -> Option<&WorkspaceRegistry> {
        self.workspaces.get()
    }

    async fn plugin_registry(&self) -> Result<&PluginRegistry, BridgeError> {
        self.plugins
            .get_or_try_init(|| async {
                self.host.init_subsystem(Subsystem::Plugins).await?;
                let loader: Arc<dyn PluginLoader> = self.host.clone();
                Ok::<_, BridgeError>(PluginRegistry::new(loader))
            })
            .await
    }

    async fn workspace_registry(&self) -> Result<&WorkspaceRegistry, BridgeError> {
        self.workspaces
            .get_or_try_init(|| async {
                self.host.init_subsystem(Subsystem::Workspaces).await?;
                Ok::<_, BridgeError>(WorkspaceRegistry::new())
            })
            .await
    }

    fn loaded_plugins(&self, operation: &str) -> &PluginRegistry {
        match self.plugins.get() {
            Some(registry) => registry,
            None => panic!("`load_plugin` must complete before `{}`", operation),
        }
    }

    async fn try_load_plugin(
        &self,
        path: &Path,
        plugin_name: Option<&str>,
        plugin_name_is_alias: bool,
    ) -> Result<LoadedPlugin, BridgeError> {
        let registry = self.plugin_registry().await?;
        let handle = registry
            .load_plugin(path, plugin_name, plugin_name_is_alias)
            .await?;
        Ok(LoadedPlugin::from(handle.as_ref()))
    }

    #[allow(clippy::too_many_arguments)]
    fn try_lint_file(
        &self,
        registry: &PluginRegistry,
        file_path: &Path,
        buffer_id: BufferId,
        buffer: Option<Vec<u8>>,
        rule_ids: &[u32],
        options_ids: &[u32],
        settings_json: &str,
        globals_json: &str,
    ) -> Result<Vec<Diagnostic>, BridgeError> {
        let source = self.buffers.resolve(buffer_id, buffer)?;
        let diagnostics = registry.lint_file(
            file_path,
            &source,
            rule_ids,
            options_ids,
            settings_json,
            globals_json,
        )?;
        Ok(diagnostics)
    }
}

#[async_trait]
impl<H: ScriptHost + 'static> Bridge for HostBridge<H> {
    async fn load_plugin(
        &self,
        path: String,
        plugin_name: Option<String>,
        plugin_name_is_alias: bool,
    ) -> String {
        let result = self
            .try_load_plugin(Path::new(&path), plugin_name.as_deref(), plugin_name_is_alias)
            .await;
        if let Err(e) = &result {
            warn!("Failed to load plugin {}: {}", path, e);
        }
        LoadPluginResponse::from_result(result).to_json()
    }

    fn setup_rule_configs(&self, options_json: String) -> Option<String> {
        let registry = self.loaded_plugins("setup_rule_configs");
        match registry.setup_rule_configs(&options_json) {
            Ok(()) => None,
            Err(e) => {
                warn!("Invalid rule options: {}", e);
                Some(e.to_string())
            }
        }
    }

    fn lint_file(
        &self,
        file_path: String,
        buffer_id: BufferId,
        buffer: Option<Vec<u8>>,
        rule_ids: Vec<u32>,
        options_ids: Vec<u32>,
        settings_json: String,
        globals_json: String,
    ) -> Option<String> {
        let registry = self.loaded_plugins("lint_file");
        let result = self.try_lint_file(
            registry,
            Path::new(&file_path),
            buffer_id,
            buffer,
            &rule_ids,
            &options_ids,
            &settings_json,
            &globals_json,
        );

        let outcome = LintFileOutcome::from_result(result);
        if let LintFileOutcome::Error(e) = &outcome {
            warn!("Failed to lint {}: {}", file_path, e);
        }
        outcome.to_wire()
    }

    async fn create_workspace(&self, uri: String) -> Option<String> {
        match self.workspace_registry().await {
            Ok(registry) => {
                registry.create(&uri);
                None
            }
            Err(e) => Some(e.to_string()),
        }
    }

    fn destroy_workspace(&self, uri: String) {
        let Some(registry) = self.workspaces.get() else {
            panic!("`create_workspace` must complete before `destroy_workspace`");
        };
        registry.destroy(&uri);
    }

    async fn load_configs(&self, paths: Vec<String>) -> String {
        crate::load_configs(Arc::clone(&self.host), paths)
            .await
            .to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FsScriptHost;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_plugin(dir: &TempDir) -> String {
        let path = dir.path().join("markers.json");
        fs::write(
            &path,
            r#"{
                "meta": { "name": "markers" },
                "rules": [
                    { "name": "no-todo", "patterns": ["TODO"], "severity": "warning" },
                    { "name": "no-fixme", "patterns": ["FIXME"] }
                ]
            }"#,
        )
        .unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_plugins_load_on_first_use() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = HostBridge::new(Arc::new(FsScriptHost::new()));
        assert!(bridge.plugins().is_none());

        let json = bridge.load_plugin(write_plugin(&temp_dir), None, false).await;

        assert_eq!(
            json,
            r#"{"Success":{"name":"markers","rules":[{"id":0,"name":"no-todo"},{"id":1,"name":"no-fixme"}]}}"#
        );
        assert!(bridge.plugins().is_some());
        assert!(bridge.workspaces().is_none());
    }

    #[tokio::test]
    async fn test_lint_file_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = HostBridge::new(Arc::new(FsScriptHost::new()));
        bridge.load_plugin(write_plugin(&temp_dir), None, false).await;
        assert_eq!(bridge.setup_rule_configs("[[]]".to_string()), None);

        let wire = bridge.lint_file(
            "/repo/notes.md".to_string(),
            1,
            Some(b"FIXME then TODO".to_vec()),
            vec![0, 1],
            vec![0, 0],
            "{}".to_string(),
            "{}".to_string(),
        );

        let LintFileOutcome::Diagnostics(diagnostics) =
            LintFileOutcome::from_wire(wire.as_deref()).unwrap()
        else {
            panic!("expected diagnostics, got {:?}", wire);
        };
        let names: Vec<&str> = diagnostics.iter().map(|d| d.rule_name.as_str()).collect();
        assert_eq!(names, vec!["markers/no-fixme", "markers/no-todo"]);
    }

    #[tokio::test]
    async fn test_clean_file_is_null() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = HostBridge::new(Arc::new(FsScriptHost::new()));
        bridge.load_plugin(write_plugin(&temp_dir), None, false).await;
        bridge.setup_rule_configs("[[]]".to_string());

        let wire = bridge.lint_file(
            "/repo/clean.md".to_string(),
            2,
            Some(b"all good".to_vec()),
            vec![0],
            vec![0],
            "{}".to_string(),
            "{}".to_string(),
        );

        assert_eq!(wire, None);
    }

    #[test]
    #[should_panic(expected = "`load_plugin` must complete before `setup_rule_configs`")]
    fn test_setup_before_load_panics() {
        let bridge = HostBridge::new(Arc::new(FsScriptHost::new()));
        bridge.setup_rule_configs("[]".to_string());
    }

    #[test]
    #[should_panic(expected = "`create_workspace` must complete before `destroy_workspace`")]
    fn test_destroy_before_create_panics() {
        let bridge = HostBridge::new(Arc::new(FsScriptHost::new()));
        bridge.destroy_workspace("file:///repo".to_string());
    }
}
