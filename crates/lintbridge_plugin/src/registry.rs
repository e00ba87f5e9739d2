//! Plugin registry.
//!
//! This module provides the `PluginRegistry` which loads plugin modules
//! through a `PluginLoader`, assigns numeric IDs to their rules, holds the
//! rule options table and runs rules against a file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{Diagnostic, PluginError, PluginLoader, Rule, RuleContext, RuleOptionsTable};

/// A rule as exposed across the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    /// Process-unique rule ID.
    pub id: u32,
    /// Rule name without the plugin prefix.
    pub name: String,
}

/// One loaded plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginHandle {
    /// Absolute path the plugin was loaded from.
    pub path: PathBuf,
    /// Plugin name in effect.
    pub name: String,
    /// Exported rules with their assigned IDs.
    pub rules: Vec<RuleDescriptor>,
}

struct RegisteredRule {
    /// Qualified name (`plugin/rule`).
    name: String,
    rule: Arc<dyn Rule>,
}

type PluginSlot = Arc<OnceCell<Arc<PluginHandle>>>;

/// Registry of loaded plugins and their rules.
///
/// Every path is imported at most once for the lifetime of the registry, even
/// when several loads of the same path overlap. Rule IDs index into a single
/// table shared by all plugins.
pub struct PluginRegistry {
    loader: Arc<dyn PluginLoader>,
    /// Plugin slots by absolute path.
    plugins: Mutex<HashMap<PathBuf, PluginSlot>>,
    /// Plugin names in effect, mapped to the path that claimed them.
    names: Mutex<HashMap<String, PathBuf>>,
    /// All registered rules, indexed by rule ID.
    rules: RwLock<Vec<RegisteredRule>>,
    /// Options table from the last successful setup.
    options: RwLock<Option<Arc<RuleOptionsTable>>>,
}

impl PluginRegistry {
    /// Creates an empty registry that imports modules through `loader`.
    pub fn new(loader: Arc<dyn PluginLoader>) -> Self {
        Self {
            loader,
            plugins: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
            rules: RwLock::new(Vec::new()),
            options: RwLock::new(None),
        }
    }

    /// Loads the plugin at `path`, or returns the handle of an earlier load.
    ///
    /// # Arguments
    ///
    /// * `path` - Absolute path to the plugin module
    /// * `plugin_name` - Optional display name
    /// * `plugin_name_is_alias` - Whether `plugin_name` overrides the name the
    ///   plugin declares
    ///
    /// A failed load is not remembered; the next call for the same path
    /// imports it again.
    pub async fn load_plugin(
        &self,
        path: &Path,
        plugin_name: Option<&str>,
        plugin_name_is_alias: bool,
    ) -> Result<Arc<PluginHandle>, PluginError> {
        if !path.is_absolute() {
            return Err(PluginError::load(format!(
                "Plugin path must be absolute: {}",
                path.display()
            )));
        }

        let slot = {
            let mut plugins = self.plugins.lock();
            Arc::clone(plugins.entry(path.to_path_buf()).or_default())
        };

        let handle = slot
            .get_or_try_init(|| self.import(path, plugin_name, plugin_name_is_alias))
            .await?;

        Ok(Arc::clone(handle))
    }

    async fn import(
        &self,
        path: &Path,
        plugin_name: Option<&str>,
        plugin_name_is_alias: bool,
    ) -> Result<Arc<PluginHandle>, PluginError> {
        debug!("Importing plugin from {}", path.display());
        let module = self.loader.import_plugin(path).await?;

        let name = resolve_plugin_name(module.name.as_deref(), plugin_name, plugin_name_is_alias)
            .ok_or_else(|| {
                PluginError::load(format!(
                    "Plugin must define `meta.name`: {}",
                    path.display()
                ))
            })?;

        for (i, entry) in module.rules.iter().enumerate() {
            if entry.name.is_empty() {
                return Err(PluginError::load(format!(
                    "Rule #{} of plugin '{}' has an empty name",
                    i, name
                )));
            }
            if module.rules[..i].iter().any(|r| r.name == entry.name) {
                return Err(PluginError::load(format!(
                    "Plugin '{}' defines rule '{}' more than once",
                    name, entry.name
                )));
            }
        }

        {
            let mut names = self.names.lock();
            if let Some(existing) = names.get(&name) {
                return Err(PluginError::load(format!(
                    "Plugin name '{}' is already used by {}",
                    name,
                    existing.display()
                )));
            }
            names.insert(name.clone(), path.to_path_buf());
        }

        let mut rules = self.rules.write();
        let offset = u32::try_from(rules.len())
            .map_err(|_| PluginError::load("Too many rules registered"))?;

        let mut descriptors = Vec::with_capacity(module.rules.len());
        for (id, entry) in (offset..).zip(module.rules) {
            rules.push(RegisteredRule {
                name: format!("{}/{}", name, entry.name),
                rule: entry.rule,
            });
            descriptors.push(RuleDescriptor {
                id,
                name: entry.name,
            });
        }

        info!(
            "Loaded plugin '{}' with {} rule(s) from {}",
            name,
            descriptors.len(),
            path.display()
        );

        Ok(Arc::new(PluginHandle {
            path: path.to_path_buf(),
            name,
            rules: descriptors,
        }))
    }

    /// Replaces the rule options table.
    pub fn setup_rule_configs(&self, options_json: &str) -> Result<(), PluginError> {
        let table = RuleOptionsTable::from_json(options_json)?;
        debug!("Registered {} rule option set(s)", table.len());
        *self.options.write() = Some(Arc::new(table));
        Ok(())
    }

    /// Returns the number of registered rules.
    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    /// Returns the qualified name of a registered rule.
    pub fn rule_name(&self, id: u32) -> Option<String> {
        self.rules
            .read()
            .get(id as usize)
            .map(|rule| rule.name.clone())
    }

    /// Runs rules against one file.
    ///
    /// `rule_ids[i]` runs with the options of `options_ids[i]`. Diagnostics
    /// are returned sorted by span start.
    ///
    /// # Panics
    ///
    /// Panics if no options table has been set up, or if `rule_ids` and
    /// `options_ids` differ in length. Both mean the caller broke the
    /// calling protocol.
    pub fn lint_file(
        &self,
        file_path: &Path,
        source: &[u8],
        rule_ids: &[u32],
        options_ids: &[u32],
        settings_json: &str,
        globals_json: &str,
    ) -> Result<Vec<Diagnostic>, PluginError> {
        assert_eq!(
            rule_ids.len(),
            options_ids.len(),
            "`rule_ids` and `options_ids` must have the same length"
        );
        let Some(options) = self.options.read().clone() else {
            panic!("`setup_rule_configs` must complete before `lint_file`");
        };

        let source = std::str::from_utf8(source).map_err(|e| {
            PluginError::invalid_input(format!(
                "Content of {} is not valid UTF-8: {}",
                file_path.display(),
                e
            ))
        })?;
        let settings = parse_object(settings_json, "settings")?;
        let globals = parse_object(globals_json, "globals")?;

        let mut resolved = Vec::with_capacity(rule_ids.len());
        {
            let rules = self.rules.read();
            for (&rule_id, &options_id) in rule_ids.iter().zip(options_ids) {
                let rule = rules
                    .get(rule_id as usize)
                    .ok_or(PluginError::RuleNotFound(rule_id))?;
                let rule_options = options
                    .get(options_id)
                    .ok_or(PluginError::OptionsNotFound(options_id))?;
                resolved.push((rule_id, rule.name.clone(), Arc::clone(&rule.rule), rule_options));
            }
        }

        let mut diagnostics = Vec::new();
        for (rule_id, rule_name, rule, rule_options) in resolved {
            let ctx = RuleContext {
                file_path,
                source,
                options: rule_options,
                settings: &settings,
                globals: &globals,
            };
            let reports = rule.run(&ctx).map_err(|e| {
                PluginError::rule(format!("'{}' failed on {}: {}", rule_name, file_path.display(), e))
            })?;
            diagnostics.extend(
                reports
                    .into_iter()
                    .map(|report| Diagnostic::from_report(rule_id, rule_name.as_str(), report)),
            );
        }

        diagnostics.sort_by(|a, b| a.span.start.cmp(&b.span.start));
        Ok(diagnostics)
    }
}

/// Picks the plugin name in effect.
///
/// An alias always wins. Otherwise the declared name wins and the given name
/// is only a fallback.
fn resolve_plugin_name(
    declared: Option<&str>,
    given: Option<&str>,
    given_is_alias: bool,
) -> Option<String> {
    let name = match (given, given_is_alias) {
        (Some(alias), true) => alias,
        _ => declared.or(given)?,
    };
    (!name.is_empty()).then(|| name.to_string())
}

fn parse_object(json: &str, what: &str) -> Result<Map<String, Value>, PluginError> {
    match serde_json::from_str(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(PluginError::invalid_input(format!(
            "`{}` must be a JSON object",
            what
        ))),
        Err(e) => Err(PluginError::invalid_input(format!(
            "Invalid `{}` JSON: {}",
            what, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PluginModule, Report, Span};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Loader that serves one fixed module and counts imports.
    struct FixedLoader {
        module: PluginModule,
        imports: AtomicUsize,
    }

    #[async_trait]
    impl PluginLoader for FixedLoader {
        async fn import_plugin(&self, _path: &Path) -> Result<PluginModule, PluginError> {
            self.imports.fetch_add(1, Ordering::SeqCst);
            Ok(self.module.clone())
        }
    }

    fn fixed(module: PluginModule) -> Arc<FixedLoader> {
        Arc::new(FixedLoader {
            module,
            imports: AtomicUsize::new(0),
        })
    }

    fn report_first_byte(_: &RuleContext<'_>) -> Result<Vec<Report>, PluginError> {
        Ok(vec![Report::new("first byte", Span::new(0, 1))])
    }

    fn demo_module() -> PluginModule {
        PluginModule::new(Some("demo"))
            .with_rule("first", report_first_byte)
            .with_rule("second", report_first_byte)
    }

    #[rstest]
    #[case::alias_overrides_declared(Some("decl"), Some("alias"), true, Some("alias"))]
    #[case::declared_beats_given(Some("decl"), Some("given"), false, Some("decl"))]
    #[case::given_is_fallback(None, Some("given"), false, Some("given"))]
    #[case::declared_only(Some("decl"), None, false, Some("decl"))]
    #[case::alias_flag_without_name(Some("decl"), None, true, Some("decl"))]
    #[case::no_name(None, None, false, None)]
    #[case::empty_name(Some(""), None, false, None)]
    fn test_resolve_plugin_name(
        #[case] declared: Option<&str>,
        #[case] given: Option<&str>,
        #[case] is_alias: bool,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            resolve_plugin_name(declared, given, is_alias).as_deref(),
            expected
        );
    }

    #[tokio::test]
    async fn test_load_assigns_contiguous_ids() {
        let registry = PluginRegistry::new(fixed(demo_module()));

        let handle = registry
            .load_plugin(Path::new("/plugins/demo.json"), None, false)
            .await
            .unwrap();

        assert_eq!(handle.name, "demo");
        assert_eq!(
            handle.rules,
            vec![
                RuleDescriptor { id: 0, name: "first".to_string() },
                RuleDescriptor { id: 1, name: "second".to_string() },
            ]
        );
        assert_eq!(registry.rule_count(), 2);
        assert_eq!(registry.rule_name(1).as_deref(), Some("demo/second"));
    }

    #[tokio::test]
    async fn test_load_same_path_imports_once() {
        let loader = fixed(demo_module());
        let registry = PluginRegistry::new(loader.clone());
        let path = Path::new("/plugins/demo.json");

        let first = registry.load_plugin(path, None, false).await.unwrap();
        let second = registry.load_plugin(path, None, false).await.unwrap();

        assert_eq!(first.rules, second.rules);
        assert_eq!(loader.imports.load(Ordering::SeqCst), 1);
        assert_eq!(registry.rule_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_loads_import_once() {
        let loader = fixed(demo_module());
        let registry = PluginRegistry::new(loader.clone());
        let path = Path::new("/plugins/demo.json");

        let (a, b) = tokio::join!(
            registry.load_plugin(path, None, false),
            registry.load_plugin(path, None, false)
        );

        assert_eq!(a.unwrap().rules, b.unwrap().rules);
        assert_eq!(loader.imports.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relative_path_is_rejected() {
        let loader = fixed(demo_module());
        let registry = PluginRegistry::new(loader.clone());

        let err = registry
            .load_plugin(Path::new("plugins/demo.json"), None, false)
            .await
            .unwrap_err();

        assert!(matches!(err, PluginError::LoadError(_)));
        assert_eq!(loader.imports.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_name_fails_and_is_retried() {
        let loader = fixed(PluginModule::new(None).with_rule("r", report_first_byte));
        let registry = PluginRegistry::new(loader.clone());
        let path = Path::new("/plugins/anon.json");

        let err = registry.load_plugin(path, None, false).await.unwrap_err();
        assert!(err.to_string().contains("meta.name"));

        let handle = registry.load_plugin(path, Some("anon"), false).await.unwrap();
        assert_eq!(handle.name, "anon");
        assert_eq!(loader.imports.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_name_collision_between_paths() {
        let registry = PluginRegistry::new(fixed(demo_module()));

        registry
            .load_plugin(Path::new("/a/demo.json"), None, false)
            .await
            .unwrap();
        let err = registry
            .load_plugin(Path::new("/b/demo.json"), None, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already used by /a/demo.json"));

        let aliased = registry
            .load_plugin(Path::new("/b/demo.json"), Some("demo2"), true)
            .await
            .unwrap();
        assert_eq!(aliased.rules[0].id, 2);
    }

    #[tokio::test]
    async fn test_duplicate_rule_names_are_rejected() {
        let module = PluginModule::new(Some("dup"))
            .with_rule("same", report_first_byte)
            .with_rule("same", report_first_byte);
        let registry = PluginRegistry::new(fixed(module));

        let err = registry
            .load_plugin(Path::new("/dup.json"), None, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
        assert_eq!(registry.rule_count(), 0);
    }

    #[tokio::test]
    async fn test_lint_file_pairs_rules_with_options() {
        let module = PluginModule::new(Some("opts")).with_rule(
            "echo",
            |ctx: &RuleContext<'_>| -> Result<Vec<Report>, PluginError> {
                Ok(vec![Report::new(
                    ctx.options[0].as_str().unwrap_or_default(),
                    Span::new(0, 0),
                )])
            },
        );
        let registry = PluginRegistry::new(fixed(module));
        registry
            .load_plugin(Path::new("/opts.json"), None, false)
            .await
            .unwrap();
        registry.setup_rule_configs(r#"[["zero"], ["one"]]"#).unwrap();

        let diagnostics = registry
            .lint_file(Path::new("/src/a.js"), b"x", &[0, 0], &[1, 0], "{}", "{}")
            .unwrap();

        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "zero"]);
        assert!(diagnostics.iter().all(|d| d.rule_name == "opts/echo"));
    }

    #[tokio::test]
    async fn test_lint_file_unknown_rule_is_an_error() {
        let registry = PluginRegistry::new(fixed(demo_module()));
        registry
            .load_plugin(Path::new("/demo.json"), None, false)
            .await
            .unwrap();
        registry.setup_rule_configs("[[]]").unwrap();

        let err = registry
            .lint_file(Path::new("/a.js"), b"x", &[1, 2], &[0, 0], "{}", "{}")
            .unwrap_err();
        assert!(matches!(err, PluginError::RuleNotFound(2)));

        let ok = registry
            .lint_file(Path::new("/a.js"), b"x", &[0, 1], &[0, 0], "{}", "{}")
            .unwrap();
        assert_eq!(ok.len(), 2);
    }

    #[tokio::test]
    async fn test_lint_file_input_errors() {
        let registry = PluginRegistry::new(fixed(demo_module()));
        registry
            .load_plugin(Path::new("/demo.json"), None, false)
            .await
            .unwrap();
        registry.setup_rule_configs("[[]]").unwrap();

        let bad_utf8 = registry.lint_file(Path::new("/a.js"), &[0xff, 0xfe], &[0], &[0], "{}", "{}");
        assert!(matches!(bad_utf8, Err(PluginError::InvalidInput(_))));

        let bad_settings = registry.lint_file(Path::new("/a.js"), b"x", &[0], &[0], "[]", "{}");
        assert!(matches!(bad_settings, Err(PluginError::InvalidInput(_))));

        let bad_options = registry.lint_file(Path::new("/a.js"), b"x", &[0], &[7], "{}", "{}");
        assert!(matches!(bad_options, Err(PluginError::OptionsNotFound(7))));
    }

    #[tokio::test]
    async fn test_rule_failure_fails_the_file() {
        let module = PluginModule::new(Some("boom")).with_rule(
            "explode",
            |_: &RuleContext<'_>| -> Result<Vec<Report>, PluginError> {
                Err(PluginError::rule("kaboom"))
            },
        );
        let registry = PluginRegistry::new(fixed(module));
        registry
            .load_plugin(Path::new("/boom.json"), None, false)
            .await
            .unwrap();
        registry.setup_rule_configs("[[]]").unwrap();

        let err = registry
            .lint_file(Path::new("/a.js"), b"x", &[0], &[0], "{}", "{}")
            .unwrap_err();
        assert!(err.to_string().contains("'boom/explode' failed on /a.js"));
    }

    #[test]
    #[should_panic(expected = "`setup_rule_configs` must complete")]
    fn test_lint_before_setup_panics() {
        let registry = PluginRegistry::new(fixed(demo_module()));
        let _ = registry.lint_file(Path::new("/a.js"), b"x", &[], &[], "{}", "{}");
    }

    #[test]
    #[should_panic(expected = "must have the same length")]
    fn test_mismatched_id_lists_panic() {
        let registry = PluginRegistry::new(fixed(demo_module()));
        registry.setup_rule_configs("[[]]").unwrap();
        let _ = registry.lint_file(Path::new("/a.js"), b"x", &[0, 1], &[0], "{}", "{}");
    }

    #[tokio::test]
    async fn test_setup_rule_configs_replaces_table() {
        let registry = PluginRegistry::new(fixed(demo_module()));
        registry
            .load_plugin(Path::new("/demo.json"), None, false)
            .await
            .unwrap();

        registry.setup_rule_configs("[[1]]").unwrap();
        let second = registry.lint_file(Path::new("/a.js"), b"x", &[0], &[1], "{}", "{}");
        assert!(matches!(second, Err(PluginError::OptionsNotFound(1))));

        // A rejected table leaves the previous one in place.
        assert!(registry.setup_rule_configs("not json").is_err());
        assert!(registry
            .lint_file(Path::new("/a.js"), b"x", &[0], &[0], "{}", "{}")
            .is_ok());

        registry.setup_rule_configs("[[1], [2]]").unwrap();
        assert!(registry
            .lint_file(Path::new("/a.js"), b"x", &[0], &[1], "{}", "{}")
            .is_ok());
    }
}
