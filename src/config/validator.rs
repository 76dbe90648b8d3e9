//! Validation of desired-state documents.
//!
//! Every check here runs offline, before any remote call. The checks are
//! pure: the same document always yields the same verdict.

use std::collections::HashSet;
use tracing::debug;

use crate::error::{ConfigError, RedirectError, Result, ValidationError};

use super::spec::{Manifest, RedirectSpec, RedirectType, MAX_SOURCES};

/// Rule text for the all-but-one expression requirement.
pub const EXPRESSION_RULE: &str =
    "when multiple destinations are declared, all but one must specify a selecting expression";

/// Validator for manifests.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all problems found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors.
    pub errors: Vec<ValidationError>,
    /// Non-fatal issues.
    pub warnings: Vec<String>,
}

/// Validates a single desired-state document.
///
/// # Errors
///
/// Returns the first violated rule.
pub fn validate_redirect(spec: &RedirectSpec) -> std::result::Result<(), ValidationError> {
    let mut result = ValidationResult::default();
    check_redirect(spec, None, &mut result);
    match result.errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a whole manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn validate(&self, manifest: &Manifest) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if manifest.redirects.is_empty() {
            result
                .warnings
                .push(String::from("No redirects defined in manifest"));
        }

        let mut seen_names = HashSet::new();
        for (i, declaration) in manifest.redirects.iter().enumerate() {
            let prefix = format!("redirects[{i}]");

            if !seen_names.insert(declaration.name.as_str()) {
                return Err(RedirectError::Config(ConfigError::DuplicateName {
                    name: declaration.name.clone(),
                }));
            }

            if !is_valid_name(&declaration.name) {
                result.errors.push(ValidationError::field(
                    format!("{prefix}.name"),
                    format!(
                        "Redirect name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                        declaration.name
                    ),
                ));
            }

            check_redirect(&declaration.spec, Some(&prefix), &mut result);
        }

        if let Some(first_error) = result.errors.first() {
            return Err(RedirectError::Validation(first_error.clone()));
        }

        debug!("Manifest validation passed");
        Ok(result)
    }
}

/// Runs every rule against a document, collecting errors and warnings.
fn check_redirect(spec: &RedirectSpec, prefix: Option<&str>, result: &mut ValidationResult) {
    let field = |name: &str| prefix.map_or_else(|| name.to_string(), |p| format!("{p}.{name}"));

    if spec.sources.is_empty() {
        result
            .errors
            .push(ValidationError::field(field("sources"), "At least one source is required"));
    } else if spec.sources.len() > MAX_SOURCES {
        result.errors.push(ValidationError::field(
            field("sources"),
            format!(
                "At most {MAX_SOURCES} sources are allowed, got {}",
                spec.sources.len()
            ),
        ));
    }

    for source in &spec.sources {
        if source.trim().is_empty() {
            result
                .errors
                .push(ValidationError::field(field("sources"), "Source cannot be empty"));
        } else if source.contains("://") || source.contains('/') {
            result.warnings.push(format!(
                "{}: source '{source}' looks like a URL, expected a bare domain",
                field("sources")
            ));
        }
    }

    if spec.destinations.is_empty() {
        result.errors.push(ValidationError::field(
            field("destinations"),
            "At least one destination is required",
        ));
    }

    for (i, destination) in spec.destinations.iter().enumerate() {
        if destination.url.trim().is_empty() {
            result.errors.push(ValidationError::field(
                field(&format!("destinations[{i}].url")),
                "Destination url cannot be empty",
            ));
        } else if !destination.url.starts_with("http://") && !destination.url.starts_with("https://")
        {
            result.warnings.push(format!(
                "{}: '{}' has no http:// or https:// scheme",
                field(&format!("destinations[{i}].url")),
                destination.url
            ));
        }
    }

    if let Err(err) = spec.redirect_type.parse::<RedirectType>() {
        result
            .errors
            .push(ValidationError::field(field("redirect_type"), err.message));
    }

    if spec.destinations.len() > 1 {
        let with_expression = spec
            .destinations
            .iter()
            .filter(|d| d.has_expression())
            .count();
        if with_expression < spec.destinations.len() - 1 {
            result
                .errors
                .push(ValidationError::field(field("destinations"), EXPRESSION_RULE));
        }
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !name.ends_with('-') && !name.contains("--")
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
