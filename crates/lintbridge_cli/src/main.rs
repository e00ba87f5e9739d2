//! LintBridge CLI
//!
//! Drives the callback bridge the way a native lint engine would: loads
//! config and plugin modules through it, then lints files rule by rule ID.

mod cli;
mod output;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rayon::prelude::*;
use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use lintbridge_core::{
    Bridge, ConfigLoadResult, FsScriptHost, HostBridge, LintConfig, LintFileOutcome,
    LoadPluginResponse, LoadedPlugin, Severity,
};

use cli::{Cli, Commands};
use output::{FileReport, output_results};

type FsBridge = HostBridge<FsScriptHost>;

/// A rule enabled for this run.
struct ActiveRule {
    id: u32,
    severity: Severity,
    options: Vec<Value>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    let bridge = HostBridge::new(Arc::new(FsScriptHost::new()));

    match &cli.command {
        Commands::Configs { paths } => run_configs(&runtime, &bridge, paths),
        Commands::Lint {
            configs,
            plugins,
            files,
            format,
        } => run_lint(&runtime, &bridge, configs, plugins, files, format),
    }
}

fn absolute_paths(paths: &[PathBuf]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            std::path::absolute(path)
                .into_diagnostic()
                .map(|path| path.to_string_lossy().into_owned())
        })
        .collect()
}

fn run_configs(runtime: &Runtime, bridge: &FsBridge, paths: &[PathBuf]) -> Result<bool> {
    let json = runtime.block_on(bridge.load_configs(absolute_paths(paths)?));
    println!("{}", json);

    let result = ConfigLoadResult::from_json(&json).into_diagnostic()?;
    Ok(!result.is_success())
}

fn run_lint(
    runtime: &Runtime,
    bridge: &FsBridge,
    config_paths: &[PathBuf],
    plugin_paths: &[PathBuf],
    files: &[PathBuf],
    format: &str,
) -> Result<bool> {
    let Some(config) = load_lint_config(runtime, bridge, config_paths)? else {
        return Ok(true);
    };

    let mut has_failures = false;
    let mut plugins = Vec::new();

    // Config plugins only contribute the rules the config enables.
    let requests = config
        .plugins
        .iter()
        .map(|path| (path.clone(), false))
        .chain(absolute_paths(plugin_paths)?.into_iter().map(|path| (path, true)));

    for (path, enable_all) in requests {
        let json = runtime.block_on(bridge.load_plugin(path.clone(), None, false));
        match LoadPluginResponse::from_json(&json).into_diagnostic()? {
            LoadPluginResponse::Success(plugin) => {
                debug!("Plugin '{}' provides {} rule(s)", plugin.name, plugin.rules.len());
                plugins.push((plugin, enable_all));
            }
            LoadPluginResponse::Failure(message) => {
                error!("{}", message);
                has_failures = true;
            }
        }
    }

    let ignored = match config.ignore_globs() {
        Ok(ignored) => ignored,
        Err(diagnostic) => {
            eprintln!("{:?}", miette::Report::new(diagnostic));
            return Ok(true);
        }
    };
    let files: Vec<&Path> = files
        .iter()
        .map(PathBuf::as_path)
        .filter(|path| {
            let skip = ignored.as_ref().is_some_and(|globs| globs.is_match(path));
            if skip {
                debug!("Ignoring {}", path.display());
            }
            !skip
        })
        .collect();

    let rules = active_rules(&config, &plugins);
    info!("Linting {} file(s) with {} rule(s)", files.len(), rules.len());

    let reports: Vec<FileReport> = if rules.is_empty() {
        files
            .par_iter()
            .map(|path| FileReport {
                path: path.to_path_buf(),
                outcome: match read_source(path) {
                    Ok(_) => LintFileOutcome::Clean,
                    Err(outcome) => outcome,
                },
            })
            .collect()
    } else {
        let options: Vec<&Vec<Value>> = rules.iter().map(|rule| &rule.options).collect();
        let options_json = serde_json::to_string(&options).into_diagnostic()?;
        if let Some(message) = bridge.setup_rule_configs(options_json) {
            return Err(miette::miette!("{}", message));
        }

        let rule_ids: Vec<u32> = rules.iter().map(|rule| rule.id).collect();
        let options_ids: Vec<u32> = (0..).take(rules.len()).collect();
        let severities: HashMap<u32, Severity> =
            rules.iter().map(|rule| (rule.id, rule.severity)).collect();
        let settings_json = serde_json::to_string(&config.settings).into_diagnostic()?;
        let globals_json = serde_json::to_string(&config.globals).into_diagnostic()?;

        files
            .par_iter()
            .enumerate()
            .map(|(index, path)| {
                let outcome = match lint_one(
                    bridge,
                    index as u32,
                    path,
                    &rule_ids,
                    &options_ids,
                    &settings_json,
                    &globals_json,
                ) {
                    LintFileOutcome::Diagnostics(mut diagnostics) => {
                        for diag in &mut diagnostics {
                            if let Some(&severity) = severities.get(&diag.rule_id) {
                                diag.severity = severity;
                            }
                        }
                        LintFileOutcome::Diagnostics(diagnostics)
                    }
                    other => other,
                };
                FileReport {
                    path: path.to_path_buf(),
                    outcome,
                }
            })
            .collect()
    };

    let has_errors = output_results(&reports, format)?;
    Ok(has_failures || has_errors)
}

/// Loads and merges the config modules. Returns `None` after reporting
/// config problems.
fn load_lint_config(
    runtime: &Runtime,
    bridge: &FsBridge,
    config_paths: &[PathBuf],
) -> Result<Option<LintConfig>> {
    let mut merged = LintConfig::default();
    if config_paths.is_empty() {
        return Ok(Some(merged));
    }

    let json = runtime.block_on(bridge.load_configs(absolute_paths(config_paths)?));
    let loaded = match ConfigLoadResult::from_json(&json)
        .into_diagnostic()?
        .into_configs()
    {
        Ok(loaded) => loaded,
        Err(diagnostics) => {
            for diagnostic in diagnostics {
                eprintln!("{:?}", miette::Report::new(diagnostic));
            }
            return Ok(None);
        }
    };

    for mut entry in loaded {
        let base = entry.path.parent().unwrap_or(Path::new("/"));
        entry.config.plugins = entry
            .config
            .plugins
            .iter()
            .map(|plugin| base.join(plugin).to_string_lossy().into_owned())
            .collect();
        debug!("Using config {}", entry.path.display());
        merged.merge(entry.config);
    }

    Ok(Some(merged))
}

/// Resolves `plugin/rule` settings against the loaded plugins.
///
/// Rules of plugins given on the command line are enabled at error level
/// unless the config sets them.
fn active_rules(config: &LintConfig, plugins: &[(LoadedPlugin, bool)]) -> Vec<ActiveRule> {
    let mut active: BTreeMap<u32, ActiveRule> = BTreeMap::new();
    let mut known: HashMap<String, u32> = HashMap::new();

    for (plugin, enable_all) in plugins {
        for rule in &plugin.rules {
            let key = format!("{}/{}", plugin.name, rule.name);
            if *enable_all && !config.rules.contains_key(&key) {
                active.insert(
                    rule.id,
                    ActiveRule {
                        id: rule.id,
                        severity: Severity::Error,
                        options: Vec::new(),
                    },
                );
            }
            known.insert(key, rule.id);
        }
    }

    for (key, setting) in &config.rules {
        let Some(&id) = known.get(key) else {
            warn!("Rule '{}' is not provided by any loaded plugin", key);
            continue;
        };
        let Some(level) = setting.level() else {
            warn!("Rule '{}' has an invalid level", key);
            continue;
        };

        match level.severity() {
            Some(severity) => {
                active.insert(
                    id,
                    ActiveRule {
                        id,
                        severity,
                        options: setting.options(),
                    },
                );
            }
            None => {
                active.remove(&id);
            }
        }
    }

    active.into_values().collect()
}

fn read_source(path: &Path) -> Result<Vec<u8>, LintFileOutcome> {
    std::fs::read(path)
        .map_err(|e| LintFileOutcome::Error(format!("Failed to read {}: {}", path.display(), e)))
}

fn lint_one(
    bridge: &FsBridge,
    buffer_id: u32,
    path: &Path,
    rule_ids: &[u32],
    options_ids: &[u32],
    settings_json: &str,
    globals_json: &str,
) -> LintFileOutcome {
    let content = match read_source(path) {
        Ok(content) => content,
        Err(outcome) => return outcome,
    };

    let wire = bridge.lint_file(
        path.display().to_string(),
        buffer_id,
        Some(content),
        rule_ids.to_vec(),
        options_ids.to_vec(),
        settings_json.to_string(),
        globals_json.to_string(),
    );

    LintFileOutcome::from_wire(wire.as_deref())
        .unwrap_or_else(|e| LintFileOutcome::Error(format!("Malformed lint result: {}", e)))
}
