//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{Manifest, ValidationResult};
use crate::error::Result;
use crate::planner::{ActionType, ApplyPlan, ExecutionResult};
use crate::reconciler::DriftReport;
use crate::state::{ProviderState, TrackedRedirect};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Tracked redirect row for table display.
#[derive(Tabled)]
struct RedirectRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Sources")]
    sources: String,
    #[tabled(rename = "Destination")]
    destination: String,
    #[tabled(rename = "Type")]
    redirect_type: String,
    #[tabled(rename = "DNS")]
    dns: String,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Redirect")]
    resource: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an apply plan for display.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_plan(&self, plan: &ApplyPlan) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(plan),
            OutputFormat::Text => Ok(Self::format_plan_text(plan)),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &ApplyPlan) -> String {
        if plan.is_empty() {
            return format!(
                "{} No changes required - redirects are up to date.\n",
                "✓".green()
            );
        }

        let mut output = String::from("\nApply Plan\n\n");

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_type(a.action_type),
                resource: a.resource_name.clone(),
                reason: Self::truncate(&a.reason, 50),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to update, {} to destroy\n",
            plan.count(ActionType::Create).to_string().green(),
            plan.count(ActionType::Update).to_string().yellow(),
            plan.count(ActionType::Delete).to_string().red()
        );

        output
    }

    /// Formats the outcome of an executed plan.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_execution(&self, result: &ExecutionResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "success": result.success,
                    "executed": result.total_executed,
                    "successful": result.successful,
                    "failed": result.failed,
                    "skipped": result.skipped,
                    "results": result.results.iter().map(|r| serde_json::json!({
                        "action": r.action.action_type,
                        "redirect": r.action.resource_name,
                        "id": r.redirect_id,
                        "success": r.success,
                        "error": r.error,
                    })).collect::<Vec<_>>(),
                });
                to_json(&json)
            }
            OutputFormat::Text => {
                let status = if result.success {
                    format!("{} Apply complete", "✓".green())
                } else {
                    format!("{} Apply failed", "✗".red())
                };

                let mut output = format!("{status}\n   {result}\n");

                let failures: Vec<_> = result.results.iter().filter(|r| !r.success).collect();
                if !failures.is_empty() {
                    let _ = write!(output, "\n{} Errors:\n", "⚠".yellow());
                    for failure in failures {
                        let _ = writeln!(
                            output,
                            "   - {}: {}",
                            failure.action.description(),
                            failure.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                }

                Ok(output)
            }
        }
    }

    /// Formats a drift report.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_drift(&self, report: &DriftReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Text => {
                let mut output = if report.is_converged() {
                    format!(
                        "{} No drift detected - remote state matches the manifest.\n",
                        "✓".green()
                    )
                } else {
                    let mut output = format!("{} Drift detected:\n\n", "⚠".yellow());
                    for entry in report.entries.iter().filter(|e| e.has_drift()) {
                        let detail = if entry.declared {
                            entry.drifted_fields.join(", ")
                        } else {
                            String::from("no longer declared")
                        };
                        let _ = writeln!(output, "   - {}: {detail}", entry.name);
                    }
                    output
                };

                if !report.errors.is_empty() {
                    let _ = write!(output, "\n{} Refresh errors:\n", "✗".red());
                    for error in &report.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                }

                Ok(output)
            }
        }
    }

    /// Formats tracked state, optionally a single redirect.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_state(&self, state: &ProviderState, only: Option<&str>) -> Result<String> {
        let tracked: Vec<&TrackedRedirect> = state
            .resources
            .values()
            .filter(|t| only.is_none_or(|name| t.name == name))
            .collect();

        match self.format {
            OutputFormat::Json => to_json(&tracked),
            OutputFormat::Text => {
                if tracked.is_empty() {
                    return Ok(String::from("   No redirects tracked.\n"));
                }

                let rows: Vec<RedirectRow> = tracked.iter().map(|t| Self::redirect_row(t)).collect();

                let mut output = Table::new(rows).to_string();
                output.push('\n');

                let unverified: Vec<&str> = tracked
                    .iter()
                    .flat_map(|t| &t.resource.domains)
                    .filter(|d| !d.dns.verified)
                    .map(|d| d.fqdn.as_str())
                    .collect();
                if !unverified.is_empty() {
                    let _ = write!(
                        output,
                        "\n{} DNS not verified for: {}\n",
                        "⚠".yellow(),
                        unverified.join(", ")
                    );
                }

                let _ = writeln!(output, "\nLast updated: {}", state.last_updated);
                Ok(output)
            }
        }
    }

    /// Formats a manifest validation result.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_validation(
        &self,
        manifest: &Manifest,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "redirects": manifest.redirect_names(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": result.warnings,
                });
                to_json(&json)
            }
            OutputFormat::Text => {
                let mut output = format!("{} Manifest is valid!\n", "✓".green());

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                let _ = write!(output, "\nManifest summary:\n   Redirects: {}\n", manifest.redirects.len());
                let sources: usize = manifest.redirects.iter().map(|r| r.spec.sources.len()).sum();
                let _ = writeln!(output, "   Source domains: {sources}");
                Ok(output)
            }
        }
    }

    /// Builds a table row for a tracked redirect.
    fn redirect_row(tracked: &TrackedRedirect) -> RedirectRow {
        let attributes = &tracked.resource.attributes;
        let verified = tracked.resource.domains.iter().filter(|d| d.dns.verified).count();

        RedirectRow {
            name: tracked.name.clone(),
            id: tracked
                .id()
                .map_or_else(|| "-".dimmed().to_string(), ToString::to_string),
            sources: attributes.sources.as_ref().map_or_else(
                || String::from("?"),
                |s| Self::truncate(&s.iter().cloned().collect::<Vec<_>>().join(", "), 40),
            ),
            destination: attributes
                .primary_url()
                .map_or_else(|| String::from("?"), |u| Self::truncate(u, 40)),
            redirect_type: attributes
                .redirect_type
                .clone()
                .unwrap_or_else(|| String::from("?")),
            dns: format!("{verified}/{}", tracked.resource.domains.len()),
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::Create => "+create".green().to_string(),
            ActionType::Update => "~update".yellow().to_string(),
            ActionType::Delete => "-delete".red().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

/// Serializes a value as pretty JSON.
fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{RedirectAttributes, RedirectId};
    use crate::config::{Destination, RedirectSpec};
    use crate::reconciler::RedirectResource;

    fn state() -> ProviderState {
        let spec = RedirectSpec::new(["example.com"], vec![Destination::new("https://example.org")]);
        let mut resource = RedirectResource::with_id(RedirectId::from(5));
        resource.attributes = RedirectAttributes::from(&spec);

        let mut state = ProviderState::new();
        state.set(TrackedRedirect::new("blog", "h", resource));
        state.set(TrackedRedirect::new("shop", "h", RedirectResource::new()));
        state
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("a-very-long-name", 8), "a-ver...");
    }

    #[test]
    fn test_state_json_filters_by_name() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let json: serde_json::Value =
            serde_json::from_str(&formatter.format_state(&state(), Some("blog")).unwrap()).unwrap();

        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["resource"]["id"], "5");
    }

    #[test]
    fn test_state_text_lists_redirects() {
        let output = OutputFormatter::new(OutputFormat::Text)
            .format_state(&state(), None)
            .unwrap();
        assert!(output.contains("blog"));
        assert!(output.contains("https://example.org"));
        assert!(output.contains("shop"));
    }

    #[test]
    fn test_json_failure_is_reported() {
        let unserializable = std::collections::BTreeMap::from([((1, 2), "tuple keys")]);
        assert!(matches!(
            to_json(&unserializable),
            Err(crate::error::RedirectError::Serialization(_))
        ));
    }

    #[test]
    fn test_empty_plan_text() {
        let plan = ApplyPlan::destroy(&ProviderState::new(), None);
        let output = OutputFormatter::new(OutputFormat::Text).format_plan(&plan).unwrap();
        assert!(output.contains("No changes required"));
    }
}
