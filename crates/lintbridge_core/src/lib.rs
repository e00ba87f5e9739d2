//! # lintbridge_core
//!
//! Callback bridge between a native lint engine and a script runtime.
//!
//! The native engine cannot load script plugins or script config files
//! itself. It calls the fixed set of operations on [`Bridge`] instead, and
//! gets JSON text or plain values back.
//!
//! This crate provides:
//! - The `Bridge` trait and its `HostBridge` implementation
//! - Lazy, at-most-once initialisation of the plugin and workspace subsystems
//! - Workspace lifecycle tracking for editor use
//! - Parallel config loading with aggregated per-path errors
//! - Wire result types, and their decoding on the native side
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lintbridge_core::{Bridge, FsScriptHost, HostBridge};
//!
//! let bridge = HostBridge::new(Arc::new(FsScriptHost::new()));
//!
//! let json = bridge.load_configs(vec!["/repo/lint.config.json".into()]).await;
//! let configs = ConfigLoadResult::from_json(&json)?.into_configs();
//! ```

mod bridge;
mod config;
mod config_loader;
mod error;
mod host;
mod lazy;
mod response;
mod workspace;

pub use bridge::{Bridge, HostBridge};
pub use config::{ConfigDiagnostic, LintConfig, LoadedConfig, RuleLevel, RuleSetting};
pub use config_loader::{ConfigEntry, ConfigFailure, ConfigLoadResult, load_configs};
pub use error::BridgeError;
pub use host::{FsScriptHost, ScriptHost, Subsystem};
pub use lazy::Lazy;
pub use response::{LintFileOutcome, LoadPluginResponse, LoadedPlugin};
pub use workspace::{Workspace, WorkspaceRegistry};

pub use lintbridge_cache::{BufferCache, BufferId};
pub use lintbridge_plugin::{Diagnostic, Fix, PluginError, RuleDescriptor, Severity, Span};
