//! Diagnostic types for lint results.

use serde::{Deserialize, Serialize};

/// Byte range in the linted source.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Span {
    /// Start offset (inclusive).
    pub start: u32,
    /// End offset (exclusive).
    pub end: u32,
}

impl Span {
    /// Creates a new span.
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns the span length in bytes.
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span covers no bytes.
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Severity level for diagnostics.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Error - must be fixed.
    #[default]
    Error,
    /// Warning - should be reviewed.
    Warning,
    /// Info - informational message.
    Info,
}

/// An auto-fix for a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fix {
    /// The byte span to replace.
    pub span: Span,

    /// The replacement text.
    pub text: String,
}

impl Fix {
    /// Creates a new fix.
    pub fn new(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }
}

/// A finding reported by a rule, before the registry attributes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// The diagnostic message.
    pub message: String,
    /// Byte span in the source.
    pub span: Span,
    /// Severity level.
    pub severity: Severity,
    /// Optional fix.
    pub fix: Option<Fix>,
}

impl Report {
    /// Creates a new error-level report.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            severity: Severity::Error,
            fix: None,
        }
    }

    /// Sets the severity level.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets an auto-fix.
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }
}

/// A diagnostic record returned across the bridge for one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Numeric ID of the rule that produced this diagnostic.
    pub rule_id: u32,

    /// Qualified rule name (`plugin/rule`).
    pub rule_name: String,

    /// The diagnostic message.
    pub message: String,

    /// Byte span in the source.
    pub span: Span,

    /// Severity level.
    #[serde(default)]
    pub severity: Severity,

    /// Optional fix for this diagnostic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl Diagnostic {
    /// Attributes a rule report to the rule that produced it.
    pub fn from_report(rule_id: u32, rule_name: impl Into<String>, report: Report) -> Self {
        Self {
            rule_id,
            rule_name: rule_name.into(),
            message: report.message,
            span: report.span,
            severity: report.severity,
            fix: report.fix,
        }
    }
}
