//! Desired-state document types.
//!
//! This module defines the structs that map to the `redirectpizza.yaml`
//! manifest. A [`RedirectSpec`] fully describes the desired state of one
//! remote redirect.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::ValidationError;

/// Maximum number of source domains a single redirect may carry.
pub const MAX_SOURCES: usize = 1000;

/// The root manifest structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    /// Remote API settings.
    #[serde(default)]
    pub provider: ProviderSettings,
    /// Local state settings.
    #[serde(default)]
    pub state: StateSettings,
    /// Declared redirects.
    #[serde(default)]
    pub redirects: Vec<RedirectDeclaration>,
}

/// Remote API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Base URL override (for staging environments).
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Transport-level request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Local state settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateSettings {
    /// Path of the state file.
    #[serde(default)]
    pub path: Option<String>,
}

/// A named redirect in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectDeclaration {
    /// Local name, used as the key in the state file.
    pub name: String,
    /// The desired state.
    #[serde(flatten)]
    pub spec: RedirectSpec,
}

/// Desired state of a single redirect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectSpec {
    /// Source domains. Unordered; duplicates collapse.
    pub sources: BTreeSet<String>,
    /// Ordered destinations. The first one is the default.
    pub destinations: Vec<Destination>,
    /// Redirect type literal, checked by the validator.
    #[serde(default = "default_redirect_type")]
    pub redirect_type: String,
    /// Whether the query string is forwarded to the destination.
    #[serde(default)]
    pub keep_query_string: bool,
    /// Whether the path is forwarded to the destination.
    #[serde(default)]
    pub uri_forwarding: bool,
    /// Whether analytical information is collected.
    #[serde(default = "default_tracking")]
    pub tracking: bool,
    /// Free-form tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// A redirect target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Destination {
    /// The URL the visitor is sent to.
    pub url: String,
    /// Routing predicate selecting this destination. Empty for the catch-all.
    #[serde(default)]
    pub expression: String,
    /// Uptime monitoring mode.
    #[serde(default)]
    pub monitoring: Monitoring,
}

/// Uptime monitoring mode for a destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Monitoring {
    /// Use the account default.
    #[default]
    Inherit,
    /// Monitoring on.
    Enabled,
    /// Monitoring off.
    Disabled,
}

/// Accepted redirect types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum RedirectType {
    /// 301.
    #[default]
    Permanent,
    /// 302.
    Temporary,
    /// Destination rendered in a frame.
    Frame,
    /// 308.
    Permanent308,
    /// 307.
    Temporary307,
}

impl RedirectType {
    /// Every accepted redirect type.
    pub const ALL: [Self; 5] = [
        Self::Permanent,
        Self::Temporary,
        Self::Frame,
        Self::Permanent308,
        Self::Temporary307,
    ];

    /// Returns the wire literal.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Temporary => "temporary",
            Self::Frame => "frame",
            Self::Permanent308 => "permanent:308",
            Self::Temporary307 => "temporary:307",
        }
    }

    /// Returns the accepted literals joined for error messages.
    #[must_use]
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for RedirectType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ValidationError::field(
                    "redirect_type",
                    format!(
                        "Invalid redirect type '{s}'. Supported are: {}",
                        Self::supported_list()
                    ),
                )
            })
    }
}

impl std::fmt::Display for RedirectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Monitoring {
    /// Returns the wire literal.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inherit => "inherit",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for Monitoring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Default value functions

fn default_redirect_type() -> String {
    RedirectType::default().as_str().to_string()
}

const fn default_tracking() -> bool {
    true
}

impl Destination {
    /// Creates a catch-all destination with default monitoring.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expression: String::new(),
            monitoring: Monitoring::default(),
        }
    }

    /// Sets the selecting expression.
    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }

    /// Sets the monitoring mode.
    #[must_use]
    pub const fn with_monitoring(mut self, monitoring: Monitoring) -> Self {
        self.monitoring = monitoring;
        self
    }

    /// Returns true if this destination carries a selecting expression.
    #[must_use]
    pub const fn has_expression(&self) -> bool {
        !self.expression.is_empty()
    }
}

impl RedirectSpec {
    /// Creates a spec with default options.
    #[must_use]
    pub fn new<I, S>(sources: I, destinations: Vec<Destination>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            destinations,
            redirect_type: default_redirect_type(),
            keep_query_string: false,
            uri_forwarding: false,
            tracking: default_tracking(),
            tags: BTreeSet::new(),
        }
    }

    /// Sets the redirect type literal.
    #[must_use]
    pub fn with_redirect_type(mut self, redirect_type: impl Into<String>) -> Self {
        self.redirect_type = redirect_type.into();
        self
    }

    /// Replaces the tag set.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

impl Manifest {
    /// Returns the declaration with the given name.
    #[must_use]
    pub fn redirect(&self, name: &str) -> Option<&RedirectDeclaration> {
        self.redirects.iter().find(|r| r.name == name)
    }

    /// Returns redirect names in declaration order.
    #[must_use]
    pub fn redirect_names(&self) -> Vec<&str> {
        self.redirects.iter().map(|r| r.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_type_parse() {
        for literal in ["permanent", "temporary", "frame", "permanent:308", "temporary:307"] {
            let parsed: RedirectType = literal.parse().expect("literal should parse");
            assert_eq!(parsed.as_str(), literal);
        }
    }

    #[test]
    fn test_redirect_type_invalid_lists_supported() {
        let err = "bogus".parse::<RedirectType>().unwrap_err();
        assert!(err.message.contains("bogus"));
        assert!(err.message.contains("permanent, temporary, frame, permanent:308, temporary:307"));
    }

    #[test]
    fn test_spec_defaults_from_yaml() {
        let yaml = r"
sources: [example.com, example.com, www.example.com]
destinations:
  - url: https://example.org
";
        let spec: RedirectSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.sources.len(), 2);
        assert_eq!(spec.redirect_type, "permanent");
        assert!(!spec.keep_query_string);
        assert!(!spec.uri_forwarding);
        assert!(spec.tracking);
        assert!(spec.tags.is_empty());
        assert_eq!(spec.destinations[0].monitoring, Monitoring::Inherit);
        assert!(!spec.destinations[0].has_expression());
    }
}
