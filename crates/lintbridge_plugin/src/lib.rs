//! # lintbridge_plugin
//!
//! Plugin system for the LintBridge callback bridge.
//!
//! This crate provides:
//! - The `Rule` trait and the `PluginModule` rule table a loaded plugin exposes
//! - The `PluginRegistry` which loads each plugin path at most once and
//!   assigns process-unique numeric rule IDs
//! - The `RuleOptionsTable` addressed by numeric options IDs
//! - Diagnostic collection for a single `lint_file` call
//! - Declarative JSON plugin modules
//!
//! ## Example
//!
//! ```rust,ignore
//! use lintbridge_plugin::PluginRegistry;
//!
//! let registry = PluginRegistry::new(loader);
//! let plugin = registry.load_plugin(path, None, false).await?;
//! registry.setup_rule_configs(r#"[[]]"#)?;
//!
//! let ids: Vec<u32> = plugin.rules.iter().map(|r| r.id).collect();
//! let diagnostics = registry.lint_file(path, source, &ids, &vec![0; ids.len()], "{}", "{}")?;
//! ```

mod declarative;
mod diagnostic;
mod error;
mod options;
mod registry;
mod rule;

pub use declarative::{DeclarativePlugin, PatternRule};
pub use diagnostic::{Diagnostic, Fix, Report, Severity, Span};
pub use error::PluginError;
pub use options::RuleOptionsTable;
pub use registry::{PluginHandle, PluginRegistry, RuleDescriptor};
pub use rule::{PluginLoader, PluginModule, Rule, RuleContext, RuleEntry};
