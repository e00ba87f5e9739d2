//! Lint result output.

use std::path::PathBuf;

use lintbridge_core::{Diagnostic, LintFileOutcome, Severity};
use miette::{IntoDiagnostic, Result};

/// Outcome of linting one file.
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: LintFileOutcome,
}

impl FileReport {
    fn diagnostics(&self) -> &[Diagnostic] {
        match &self.outcome {
            LintFileOutcome::Diagnostics(diagnostics) => diagnostics.as_slice(),
            _ => &[],
        }
    }

    fn error(&self) -> Option<&str> {
        match &self.outcome {
            LintFileOutcome::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Returns true if the file failed or has an error-level diagnostic.
    pub fn has_errors(&self) -> bool {
        self.error().is_some()
            || self
                .diagnostics()
                .iter()
                .any(|d| d.severity == Severity::Error)
    }
}

/// Prints the reports and returns true if any of them has errors.
pub fn output_results(reports: &[FileReport], format: &str) -> Result<bool> {
    let has_errors = reports.iter().any(FileReport::has_errors);

    match format {
        "json" => {
            let output: Vec<_> = reports
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "path": r.path.display().to_string(),
                        "diagnostics": r.diagnostics(),
                        "error": r.error(),
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&output).into_diagnostic()?
            );
        }
        _ => {
            for report in reports {
                if let Some(error) = report.error() {
                    println!("\n{}:", report.path.display());
                    println!("  failed: {}", error);
                    continue;
                }
                if report.diagnostics().is_empty() {
                    continue;
                }

                println!("\n{}:", report.path.display());
                for diag in report.diagnostics() {
                    let severity = match diag.severity {
                        Severity::Error => "error",
                        Severity::Warning => "warning",
                        Severity::Info => "info",
                    };
                    println!(
                        "  {}:{} {} [{}]: {}",
                        diag.span.start, diag.span.end, severity, diag.rule_name, diag.message
                    );
                }
            }

            let failed = reports.iter().filter(|r| r.error().is_some()).count();
            let issues: usize = reports.iter().map(|r| r.diagnostics().len()).sum();

            println!();
            println!(
                "Checked {} files ({} failed), found {} issues",
                reports.len(),
                failed,
                issues
            );
        }
    }

    Ok(has_errors)
}
