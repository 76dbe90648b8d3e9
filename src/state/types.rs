//! State types for tracking reconciled redirects.
//!
//! These types record, per manifest entry, the remote id and the attributes
//! last observed remotely, used for planning and idempotent re-runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::RedirectId;
use crate::reconciler::RedirectResource;

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// All redirects tracked by this workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderState {
    /// State format version.
    pub version: String,
    /// Tracked redirects keyed by local name.
    #[serde(default)]
    pub resources: BTreeMap<String, TrackedRedirect>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
}

/// One tracked redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedRedirect {
    /// Local name (from the manifest).
    pub name: String,
    /// Hash of the declaration when last applied.
    pub spec_hash: String,
    /// Remote id and last observed attributes.
    pub resource: RedirectResource,
    /// When the redirect was first tracked.
    pub created_at: DateTime<Utc>,
    /// When the redirect was last written or refreshed.
    pub updated_at: DateTime<Utc>,
}

impl ProviderState {
    /// Creates a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Gets a tracked redirect by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TrackedRedirect> {
        self.resources.get(name)
    }

    /// Gets a mutable reference to a tracked redirect by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut TrackedRedirect> {
        self.resources.get_mut(name)
    }

    /// Adds or replaces a tracked redirect.
    pub fn set(&mut self, tracked: TrackedRedirect) {
        self.resources.insert(tracked.name.clone(), tracked);
        self.last_updated = Utc::now();
    }

    /// Removes a tracked redirect by name.
    pub fn remove(&mut self, name: &str) -> Option<TrackedRedirect> {
        let result = self.resources.remove(name);
        if result.is_some() {
            self.last_updated = Utc::now();
        }
        result
    }

    /// Returns the name tracking a given remote id, if any.
    #[must_use]
    pub fn name_for_id(&self, id: &RedirectId) -> Option<&str> {
        self.resources
            .values()
            .find(|t| t.resource.id.as_ref() == Some(id))
            .map(|t| t.name.as_str())
    }

    /// Returns all tracked names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for ProviderState {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackedRedirect {
    /// Creates a new tracked redirect.
    #[must_use]
    pub fn new(name: &str, spec_hash: &str, resource: RedirectResource) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            spec_hash: spec_hash.to_string(),
            resource,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the remote id, if created.
    #[must_use]
    pub const fn id(&self) -> Option<&RedirectId> {
        self.resource.id.as_ref()
    }

    /// Records a fresh declaration hash.
    pub fn set_spec_hash(&mut self, spec_hash: &str) {
        self.spec_hash = spec_hash.to_string();
        self.touch();
    }

    /// Bumps the update timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_remove() {
        let mut state = ProviderState::new();
        assert!(state.is_empty());

        let resource = RedirectResource::with_id(RedirectId::from(12));
        state.set(TrackedRedirect::new("blog", "abc", resource));

        assert_eq!(state.names(), vec!["blog"]);
        assert_eq!(state.get("blog").and_then(TrackedRedirect::id), Some(&RedirectId::from(12)));
        assert_eq!(state.name_for_id(&RedirectId::from(12)), Some("blog"));
        assert_eq!(state.name_for_id(&RedirectId::from(13)), None);

        assert!(state.remove("blog").is_some());
        assert!(state.remove("blog").is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn test_state_serializes_resource() {
        let mut state = ProviderState::new();
        state.set(TrackedRedirect::new(
            "blog",
            "abc",
            RedirectResource::with_id(RedirectId::from(12)),
        ));

        let json = serde_json::to_value(&state).expect("serialize");
        assert_eq!(json["version"], STATE_VERSION);
        assert_eq!(json["resources"]["blog"]["resource"]["id"], "12");
        assert_eq!(json["resources"]["blog"]["spec_hash"], "abc");
    }
}
