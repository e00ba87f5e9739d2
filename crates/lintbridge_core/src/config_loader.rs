//! Parallel loading of script config modules.
//!
//! Every path is imported concurrently. The batch either succeeds as a whole
//! or reports every failing path; successes that happened alongside a failure
//! are dropped.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::ScriptHost;

/// A config module that loaded successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Path of the config module.
    pub path: String,
    /// The module's default export.
    pub config: Map<String, Value>,
}

/// A config module that failed to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFailure {
    /// Path of the config module.
    pub path: String,
    /// Why loading failed.
    pub error: String,
}

impl ConfigFailure {
    fn new(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            error: error.into(),
        }
    }
}

/// Outcome of loading a batch of config modules.
///
/// Serialized as an object with exactly one key:
/// `{"Success": [...]}`, `{"Failures": [...]}` or `{"Error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigLoadResult {
    /// Every module loaded; entries are in input order.
    Success(Vec<ConfigEntry>),
    /// At least one module failed; lists every failing path in input order.
    Failures(Vec<ConfigFailure>),
    /// The result could not be produced at all.
    Error(String),
}

impl ConfigLoadResult {
    /// Aggregates per-path outcomes, given in input order.
    pub fn aggregate(outcomes: Vec<Result<ConfigEntry, ConfigFailure>>) -> Self {
        let (successes, failures): (Vec<_>, Vec<_>) =
            outcomes.into_iter().partition(Result::is_ok);

        if failures.is_empty() {
            Self::Success(successes.into_iter().filter_map(Result::ok).collect())
        } else {
            Self::Failures(failures.into_iter().filter_map(Result::err).collect())
        }
    }

    /// Returns true for the `Success` shape.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Encodes the result as wire JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "Error": format!("Failed to serialize config result: {}", e) })
                .to_string()
        })
    }

    /// Decodes wire JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Checks that a module's default export is an object.
pub(crate) fn validate_default_export(
    path: &str,
    export: Option<Value>,
) -> Result<ConfigEntry, ConfigFailure> {
    match export {
        Some(Value::Object(config)) => Ok(ConfigEntry {
            path: path.to_string(),
            config,
        }),
        None => Err(ConfigFailure::new(
            path,
            format!("Configuration file has no default export: {}", path),
        )),
        Some(_) => Err(ConfigFailure::new(
            path,
            format!(
                "Configuration file must have a default export that is an object: {}",
                path
            ),
        )),
    }
}

async fn load_one<H: ScriptHost + ?Sized>(host: &H, path: String) -> Result<ConfigEntry, ConfigFailure> {
    if !Path::new(&path).is_absolute() {
        return Err(ConfigFailure::new(
            &path,
            format!("Configuration path must be absolute: {}", path),
        ));
    }

    debug!("Loading config module {}", path);
    match host.import_config(Path::new(&path)).await {
        Ok(export) => validate_default_export(&path, export),
        Err(e) => Err(ConfigFailure::new(&path, e.to_string())),
    }
}

/// Loads every config module in `paths` concurrently.
///
/// Each path is loaded on its own task; the call waits for every task before
/// aggregating. A task that dies without producing an outcome is reported as
/// a failure of its own path.
pub async fn load_configs<H>(host: Arc<H>, paths: Vec<String>) -> ConfigLoadResult
where
    H: ScriptHost + ?Sized + 'static,
{
    let tasks = paths.iter().cloned().map(|path| {
        let host = Arc::clone(&host);
        tokio::spawn(async move { load_one(&*host, path).await })
    });

    let mut outcomes = Vec::with_capacity(paths.len());
    for (path, joined) in paths.iter().zip(join_all(tasks).await) {
        let outcome = joined.unwrap_or_else(|e| {
            Err(ConfigFailure::new(
                path,
                format!("Config loading aborted: {}", e),
            ))
        });
        if let Err(failure) = &outcome {
            warn!("Failed to load config {}: {}", failure.path, failure.error);
        }
        outcomes.push(outcome);
    }

    ConfigLoadResult::aggregate(outcomes)
}
