//! Declarative plugin modules.
//!
//! A declarative plugin is a JSON document describing pattern rules:
//!
//! ```json
//! {
//!   "meta": { "name": "markers" },
//!   "rules": [
//!     { "name": "no-todo", "patterns": ["TODO", "FIXME"], "severity": "warning" }
//!   ]
//! }
//! ```
//!
//! Each rule reports every occurrence of its patterns. A rule with a
//! `replacement` attaches a fix replacing the match. The first element of the
//! rule's options list may override `patterns` and `caseSensitive`.

use std::sync::OnceLock;

use jsonschema::Validator;
use serde::Deserialize;
use serde_json::Value;

use crate::{Fix, PluginError, PluginModule, Report, Rule, RuleContext, Severity, Span};

const PLUGIN_SCHEMA_JSON: &str = include_str!("../../../schemas/v1/plugin.json");

static PLUGIN_SCHEMA: OnceLock<Validator> = OnceLock::new();

const DEFAULT_MESSAGE: &str = "Unexpected `{pattern}`";

#[derive(Debug, Deserialize)]
struct DeclarativePluginDto {
    #[serde(default)]
    meta: MetaDto,
    rules: Vec<PatternRuleDto>,
}

#[derive(Debug, Default, Deserialize)]
struct MetaDto {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternRuleDto {
    name: String,
    patterns: Vec<String>,
    message: Option<String>,
    replacement: Option<String>,
    #[serde(default)]
    severity: Severity,
    #[serde(default)]
    case_sensitive: bool,
}

/// Per-call overrides read from the first options element.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternOverrides {
    patterns: Option<Vec<String>>,
    case_sensitive: Option<bool>,
}

/// Parser for declarative plugin documents.
pub struct DeclarativePlugin;

impl DeclarativePlugin {
    /// Builds a plugin module from a parsed declarative document.
    pub fn from_value(value: Value) -> Result<PluginModule, PluginError> {
        let schema = PLUGIN_SCHEMA.get_or_init(|| {
            let schema_json: Value =
                serde_json::from_str(PLUGIN_SCHEMA_JSON).expect("Invalid embedded plugin schema");
            Validator::new(&schema_json).expect("Invalid plugin schema compilation")
        });

        if let Err(e) = schema.validate(&value) {
            return Err(PluginError::load(format!(
                "Invalid declarative plugin: {} at {}",
                e,
                e.instance_path()
            )));
        }

        let dto: DeclarativePluginDto = serde_json::from_value(value)?;

        let mut module = PluginModule::new(dto.meta.name.as_deref());
        for rule in dto.rules {
            let pattern_rule = PatternRule {
                patterns: rule.patterns,
                message: rule.message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
                replacement: rule.replacement,
                severity: rule.severity,
                case_sensitive: rule.case_sensitive,
            };
            module = module.with_rule(rule.name, pattern_rule);
        }

        Ok(module)
    }
}

/// Rule that reports literal pattern occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRule {
    /// Patterns to detect.
    pub patterns: Vec<String>,
    /// Message template; `{pattern}` is replaced with the matched pattern.
    pub message: String,
    /// Text that replaces each match when fixed.
    pub replacement: Option<String>,
    /// Severity of every report.
    pub severity: Severity,
    /// Case-sensitive matching.
    pub case_sensitive: bool,
}

impl PatternRule {
    fn overrides(options: &[Value]) -> Result<PatternOverrides, PluginError> {
        match options.first() {
            None | Some(Value::Null) => Ok(PatternOverrides::default()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| PluginError::rule(format!("Invalid options: {}", e))),
        }
    }
}

impl Rule for PatternRule {
    fn run(&self, ctx: &RuleContext<'_>) -> Result<Vec<Report>, PluginError> {
        let overrides = Self::overrides(ctx.options)?;
        let patterns = overrides.patterns.as_ref().unwrap_or(&self.patterns);
        let case_sensitive = overrides.case_sensitive.unwrap_or(self.case_sensitive);

        // ASCII folding keeps byte offsets identical to the unfolded text.
        let haystack = if case_sensitive {
            ctx.source.to_string()
        } else {
            ctx.source.to_ascii_lowercase()
        };

        let mut reports = Vec::new();
        for pattern in patterns.iter().filter(|p| !p.is_empty()) {
            let needle = if case_sensitive {
                pattern.clone()
            } else {
                pattern.to_ascii_lowercase()
            };
            for (offset, _) in haystack.match_indices(needle.as_str()) {
                let start = u32::try_from(offset)
                    .map_err(|_| PluginError::rule("Source is too large"))?;
                let span = Span::new(start, start.saturating_add(needle.len() as u32));
                let mut report = Report::new(self.message.replace("{pattern}", pattern), span)
                    .with_severity(self.severity);
                if let Some(replacement) = &self.replacement {
                    report = report.with_fix(Fix::new(span, replacement.as_str()));
                }
                reports.push(report);
            }
        }

        reports.sort_by_key(|r| r.span.start);
        Ok(reports)
    }
}
