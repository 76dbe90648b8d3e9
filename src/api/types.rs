//! redirect.pizza API types and data structures.
//!
//! This module defines the types used for communication with the remote API
//! and the in-memory model decoded from its responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::config::{Destination, Monitoring, RedirectSpec};
use crate::error::ValidationError;

/// Remote-assigned redirect identifier. Opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedirectId(String);

impl RedirectId {
    /// Creates an id from its textual form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the textual form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RedirectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for RedirectId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Parses a user-supplied id. The id becomes a URL path segment, so it
/// must not carry path, query or fragment syntax.
impl FromStr for RedirectId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        if id.is_empty() || id == "." || id == ".." {
            return Err(ValidationError::field("id", format!("'{s}' is not a redirect id")));
        }
        if id.contains(['/', '\\', '?', '#', '%']) || id.chars().any(char::is_whitespace) {
            return Err(ValidationError::field(
                "id",
                format!("Redirect id '{s}' contains characters not allowed in an id"),
            ));
        }
        Ok(Self::new(id))
    }
}

impl std::fmt::Display for RedirectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outgoing create/replace document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RedirectPayload {
    /// Source domains.
    pub sources: Vec<String>,
    /// Destinations, always as an array of objects.
    pub destination: Vec<DestinationRecord>,
    /// Redirect type literal.
    pub redirect_type: String,
    /// Path forwarding.
    pub uri_forwarding: bool,
    /// Query string forwarding.
    pub keep_query_string: bool,
    /// Analytics collection.
    pub tracking: bool,
    /// Tags.
    pub tags: Vec<String>,
    /// `Some(false)` asks the remote side to replace instead of merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
}

/// A destination object as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestinationRecord {
    /// Target URL.
    pub url: String,
    /// Selecting expression; omitted for the catch-all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Monitoring mode.
    #[serde(default)]
    pub monitoring: Option<Monitoring>,
}

/// Outer `{"data": ...}` wrapper around every resource representation.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub(crate) data: RedirectData,
}

/// Resource attributes as returned by the API.
#[derive(Debug, Deserialize)]
pub(crate) struct RedirectData {
    pub(crate) id: WireId,
    #[serde(default)]
    pub(crate) sources: Option<Vec<SourceRecord>>,
    #[serde(default)]
    pub(crate) domains: Vec<DomainStatus>,
    /// Either an array of destination objects or a bare URL string.
    #[serde(default)]
    pub(crate) destination: Option<Box<RawValue>>,
    #[serde(default)]
    pub(crate) redirect_type: Option<String>,
    #[serde(default)]
    pub(crate) uri_forwarding: Option<bool>,
    #[serde(default)]
    pub(crate) keep_query_string: Option<bool>,
    #[serde(default)]
    pub(crate) tracking: Option<bool>,
    #[serde(default)]
    pub(crate) tags: Option<Vec<String>>,
}

/// Ids arrive as numbers from the API, as strings from imports.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireId {
    Number(u64),
    Text(String),
}

/// A source as returned by the API.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SourceRecord {
    Object {
        url: String,
    },
    Plain(String),
}

/// Server-side state of one source domain. Read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainStatus {
    /// Remote domain id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Fully qualified domain name.
    #[serde(default)]
    pub fqdn: String,
    /// Whether this is an apex domain.
    #[serde(default)]
    pub is_root_domain: bool,
    /// DNS verification state.
    #[serde(default)]
    pub dns: DnsStatus,
    /// Security settings.
    #[serde(default)]
    pub security: SecurityStatus,
    /// Creation time on the server.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time on the server.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// DNS verification state of a domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnsStatus {
    /// Whether DNS points at the service.
    #[serde(default)]
    pub verified: bool,
    /// Records the user must configure.
    #[serde(default)]
    pub required_settings: Vec<DnsRecord>,
}

/// A DNS record the user must configure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnsRecord {
    /// Record type, e.g. `A` or `CNAME`.
    #[serde(rename = "type", default)]
    pub record_type: String,
    /// Record value.
    #[serde(default)]
    pub value: String,
}

/// Security settings of a domain.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityStatus {
    /// HSTS enabled.
    #[serde(default)]
    pub hsts: bool,
    /// Foreign embedding prevented.
    #[serde(default)]
    pub prevent_foreign_embedding: bool,
}

/// Locally tracked attributes of a redirect, as last observed remotely.
///
/// A field is `None` when the remote response did not carry it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectAttributes {
    /// Source domains.
    pub sources: Option<BTreeSet<String>>,
    /// Destinations in order.
    pub destinations: Option<Vec<Destination>>,
    /// Redirect type literal.
    pub redirect_type: Option<String>,
    /// Query string forwarding.
    pub keep_query_string: Option<bool>,
    /// Path forwarding.
    pub uri_forwarding: Option<bool>,
    /// Analytics collection.
    pub tracking: Option<bool>,
    /// Tags.
    pub tags: Option<BTreeSet<String>>,
    /// Set when `destination` arrived as a bare URL string, which carries
    /// no expression or monitoring.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub destination_url_only: bool,
}

/// A decoded remote redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRedirect {
    /// Remote id.
    pub id: RedirectId,
    /// Owned attributes.
    pub attributes: RedirectAttributes,
    /// Server-only domain state.
    pub domains: Vec<DomainStatus>,
}

impl From<DestinationRecord> for Destination {
    fn from(record: DestinationRecord) -> Self {
        Self {
            url: record.url,
            expression: record.expression.unwrap_or_default(),
            monitoring: record.monitoring.unwrap_or_default(),
        }
    }
}

impl From<&Destination> for DestinationRecord {
    fn from(destination: &Destination) -> Self {
        Self {
            url: destination.url.clone(),
            expression: destination
                .has_expression()
                .then(|| destination.expression.clone()),
            monitoring: Some(destination.monitoring),
        }
    }
}

impl From<WireId> for RedirectId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Number(n) => Self::from(n),
            WireId::Text(s) => Self(s),
        }
    }
}

impl SourceRecord {
    pub(crate) fn into_url(self) -> String {
        match self {
            Self::Object { url } | Self::Plain(url) => url,
        }
    }
}

impl RedirectPayload {
    /// Builds the full outgoing document for a desired state.
    #[must_use]
    pub fn from_spec(spec: &RedirectSpec) -> Self {
        Self {
            sources: spec.sources.iter().cloned().collect(),
            destination: spec.destinations.iter().map(DestinationRecord::from).collect(),
            redirect_type: spec.redirect_type.clone(),
            uri_forwarding: spec.uri_forwarding,
            keep_query_string: spec.keep_query_string,
            tracking: spec.tracking,
            tags: spec.tags.iter().cloned().collect(),
            merge: Some(false),
        }
    }
}

impl RedirectAttributes {
    /// Returns the names of owned fields whose observed value differs from
    /// the declaration. Unset fields are not reported.
    #[must_use]
    pub fn drift_from(&self, spec: &RedirectSpec) -> Vec<&'static str> {
        let mut drifted = Vec::new();

        if self.sources.as_ref().is_some_and(|s| *s != spec.sources) {
            drifted.push("sources");
        }
        if self
            .destinations
            .as_ref()
            .is_some_and(|d| self.destinations_differ(d, &spec.destinations))
        {
            drifted.push("destinations");
        }
        if self
            .redirect_type
            .as_ref()
            .is_some_and(|t| *t != spec.redirect_type)
        {
            drifted.push("redirect_type");
        }
        if self
            .keep_query_string
            .is_some_and(|v| v != spec.keep_query_string)
        {
            drifted.push("keep_query_string");
        }
        if self.uri_forwarding.is_some_and(|v| v != spec.uri_forwarding) {
            drifted.push("uri_forwarding");
        }
        if self.tracking.is_some_and(|v| v != spec.tracking) {
            drifted.push("tracking");
        }
        if self.tags.as_ref().is_some_and(|t| *t != spec.tags) {
            drifted.push("tags");
        }

        drifted
    }

    /// Compares destinations, by URL only when the remote shape could not
    /// carry the other fields.
    fn destinations_differ(&self, observed: &[Destination], declared: &[Destination]) -> bool {
        if self.destination_url_only {
            observed.len() != declared.len()
                || observed.iter().zip(declared).any(|(o, d)| o.url != d.url)
        } else {
            observed != declared
        }
    }

    /// Returns the primary destination URL, if known.
    #[must_use]
    pub fn primary_url(&self) -> Option<&str> {
        self.destinations
            .as_ref()
            .and_then(|d| d.first())
            .map(|d| d.url.as_str())
    }
}

impl From<&RedirectSpec> for RedirectAttributes {
    fn from(spec: &RedirectSpec) -> Self {
        Self {
            sources: Some(spec.sources.clone()),
            destinations: Some(spec.destinations.clone()),
            redirect_type: Some(spec.redirect_type.clone()),
            keep_query_string: Some(spec.keep_query_string),
            uri_forwarding: Some(spec.uri_forwarding),
            tracking: Some(spec.tracking),
            tags: Some(spec.tags.clone()),
            destination_url_only: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_record_omits_empty_expression() {
        let record = DestinationRecord::from(&Destination::new("https://example.org"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "url": "https://example.org", "monitoring": "inherit" })
        );
    }

    #[test]
    fn test_drift_ignores_unset_fields() {
        let spec = RedirectSpec::new(["example.com"], vec![Destination::new("https://example.org")]);

        let observed = RedirectAttributes {
            tracking: Some(true),
            ..RedirectAttributes::default()
        };
        assert!(observed.drift_from(&spec).is_empty());

        let mut observed = RedirectAttributes::from(&spec);
        assert!(observed.drift_from(&spec).is_empty());

        observed.redirect_type = Some(String::from("frame"));
        observed.tags = Some(BTreeSet::from([String::from("new")]));
        assert_eq!(observed.drift_from(&spec), vec!["redirect_type", "tags"]);
    }

    #[test]
    fn test_parse_redirect_id() {
        assert_eq!("4711".parse::<RedirectId>().unwrap(), RedirectId::from(4711));
        assert_eq!(" abc-1 ".parse::<RedirectId>().unwrap().as_str(), "abc-1");

        for bad in ["", "..", "1/../x", "1?x=2", "1#top", "1%2F", "a b"] {
            let err = bad.parse::<RedirectId>().unwrap_err();
            assert_eq!(err.field.as_deref(), Some("id"), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_url_only_destination_compares_urls() {
        let spec = RedirectSpec::new(
            ["example.com"],
            vec![Destination::new("https://example.org").with_monitoring(Monitoring::Enabled)],
        );

        let mut observed = RedirectAttributes {
            destinations: Some(vec![Destination::new("https://example.org")]),
            destination_url_only: true,
            ..RedirectAttributes::default()
        };
        assert!(observed.drift_from(&spec).is_empty());

        observed.destinations = Some(vec![Destination::new("https://example.net")]);
        assert_eq!(observed.drift_from(&spec), vec!["destinations"]);

        observed.destinations = Some(vec![Destination::new("https://example.org")]);
        observed.destination_url_only = false;
        assert_eq!(observed.drift_from(&spec), vec!["destinations"]);
    }
}
