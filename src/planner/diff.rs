//! Diff engine for comparing the manifest against tracked state.
//!
//! A declared redirect is compared twice: its declaration hash against the
//! hash recorded when it was last applied, and its declaration against the
//! attributes last observed remotely.

use serde::Serialize;
use tracing::debug;

use crate::api::RedirectId;
use crate::config::{Manifest, RedirectDeclaration, SpecHasher};
use crate::state::{ProviderState, TrackedRedirect};

/// Engine for computing diffs between declared and tracked states.
#[derive(Debug, Default)]
pub struct DiffEngine {
    /// Declaration hasher.
    hasher: SpecHasher,
}

/// Difference for a single redirect.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDiff {
    /// Local name.
    pub name: String,
    /// Type of difference.
    pub diff_type: DiffType,
    /// Fields that differ, if known.
    pub details: Vec<String>,
    /// Remote id, if tracked.
    pub id: Option<RedirectId>,
    /// Previously applied hash.
    pub old_hash: Option<String>,
    /// Hash of the current declaration.
    pub new_hash: Option<String>,
}

/// Type of difference detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffType {
    /// Redirect needs to be created.
    Create,
    /// Declaration changed since last apply.
    Update,
    /// Redirect is tracked but no longer declared.
    Delete,
    /// Redirect is unchanged.
    NoChange,
    /// Remote redirect was changed outside this tool.
    Drift,
}

/// Complete diff result.
#[derive(Debug, Serialize)]
pub struct DiffResult {
    /// All redirect diffs.
    pub diffs: Vec<ResourceDiff>,
    /// Number of redirects to create.
    pub creates: usize,
    /// Number of redirects to update (including drift).
    pub updates: usize,
    /// Number of redirects to delete.
    pub deletes: usize,
    /// Number of unchanged redirects.
    pub unchanged: usize,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hasher: SpecHasher::new(),
        }
    }

    /// Computes the diff between the manifest and tracked state.
    #[must_use]
    pub fn compute_diff(&self, manifest: &Manifest, state: Option<&ProviderState>) -> DiffResult {
        let mut diffs = Vec::new();

        for declaration in &manifest.redirects {
            let tracked = state.and_then(|s| s.get(&declaration.name));
            diffs.push(self.compute_redirect_diff(declaration, tracked));
        }

        if let Some(state) = state {
            for tracked in state.resources.values() {
                if manifest.redirect(&tracked.name).is_none() {
                    debug!("Found undeclared redirect: {}", tracked.name);
                    diffs.push(ResourceDiff {
                        name: tracked.name.clone(),
                        diff_type: DiffType::Delete,
                        details: vec![],
                        id: tracked.id().cloned(),
                        old_hash: Some(tracked.spec_hash.clone()),
                        new_hash: None,
                    });
                }
            }
        }

        let count = |t: DiffType| diffs.iter().filter(|d| d.diff_type == t).count();
        let creates = count(DiffType::Create);
        let updates = count(DiffType::Update) + count(DiffType::Drift);
        let deletes = count(DiffType::Delete);
        let unchanged = count(DiffType::NoChange);

        DiffResult {
            diffs,
            creates,
            updates,
            deletes,
            unchanged,
        }
    }

    /// Computes the diff for a single declared redirect.
    fn compute_redirect_diff(
        &self,
        declaration: &RedirectDeclaration,
        tracked: Option<&TrackedRedirect>,
    ) -> ResourceDiff {
        let name = declaration.name.clone();
        let new_hash = self.hasher.hash_spec(&declaration.spec);

        let Some(tracked) = tracked.filter(|t| t.resource.is_created()) else {
            debug!("Redirect {name} needs to be created");
            return ResourceDiff {
                name,
                diff_type: DiffType::Create,
                details: vec![],
                id: None,
                old_hash: None,
                new_hash: Some(new_hash),
            };
        };

        let drifted: Vec<String> = tracked
            .resource
            .attributes
            .drift_from(&declaration.spec)
            .into_iter()
            .map(String::from)
            .collect();

        let diff_type = if tracked.spec_hash != new_hash {
            DiffType::Update
        } else if drifted.is_empty() {
            DiffType::NoChange
        } else {
            DiffType::Drift
        };
        debug!("Redirect {name}: {diff_type}");

        ResourceDiff {
            name,
            diff_type,
            details: drifted,
            id: tracked.id().cloned(),
            old_hash: Some(tracked.spec_hash.clone()),
            new_hash: Some(new_hash),
        }
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::NoChange => "no change",
            Self::Drift => "drift",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ResourceDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.diff_type)?;
        if !self.details.is_empty() {
            write!(f, " ({})", self.details.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RedirectAttributes;
    use crate::config::{Destination, RedirectSpec};
    use crate::reconciler::RedirectResource;

    fn declaration(name: &str, url: &str) -> RedirectDeclaration {
        RedirectDeclaration {
            name: name.to_string(),
            spec: RedirectSpec::new([format!("{name}.example.com")], vec![Destination::new(url)]),
        }
    }

    fn tracked_from(declaration: &RedirectDeclaration, id: u64) -> TrackedRedirect {
        let mut resource = RedirectResource::with_id(RedirectId::from(id));
        resource.attributes = RedirectAttributes::from(&declaration.spec);
        TrackedRedirect::new(
            &declaration.name,
            &SpecHasher::new().hash_spec(&declaration.spec),
            resource,
        )
    }

    #[test]
    fn test_untracked_redirects_are_created() {
        let manifest = Manifest {
            redirects: vec![declaration("blog", "https://example.org")],
            ..Manifest::default()
        };

        let diff = DiffEngine::new().compute_diff(&manifest, None);
        assert_eq!(diff.creates, 1);
        assert_eq!(diff.diffs[0].diff_type, DiffType::Create);

        // A tracked entry without id is created again
        let mut state = ProviderState::new();
        state.set(TrackedRedirect::new("blog", "x", RedirectResource::new()));
        let diff = DiffEngine::new().compute_diff(&manifest, Some(&state));
        assert_eq!(diff.diffs[0].diff_type, DiffType::Create);
    }

    #[test]
    fn test_update_drift_and_no_change() {
        let unchanged = declaration("same", "https://example.org");
        let changed = declaration("changed", "https://example.org");
        let drifted = declaration("drifted", "https://example.org");

        let mut state = ProviderState::new();
        state.set(tracked_from(&unchanged, 1));

        let mut tracked = tracked_from(&changed, 2);
        tracked.spec_hash = String::from("stale");
        state.set(tracked);

        let mut tracked = tracked_from(&drifted, 3);
        tracked.resource.attributes.tracking = Some(false);
        state.set(tracked);

        let manifest = Manifest {
            redirects: vec![unchanged, changed, drifted],
            ..Manifest::default()
        };
        let diff = DiffEngine::new().compute_diff(&manifest, Some(&state));

        let types: Vec<DiffType> = diff.diffs.iter().map(|d| d.diff_type).collect();
        assert_eq!(types, vec![DiffType::NoChange, DiffType::Update, DiffType::Drift]);
        assert_eq!(diff.diffs[2].details, vec!["tracking"]);
        assert_eq!(diff.updates, 2);
        assert_eq!(diff.unchanged, 1);
    }

    #[test]
    fn test_undeclared_redirects_are_deleted() {
        let gone = declaration("gone", "https://example.org");
        let mut state = ProviderState::new();
        state.set(tracked_from(&gone, 9));

        let diff = DiffEngine::new().compute_diff(&Manifest::default(), Some(&state));
        assert_eq!(diff.deletes, 1);
        assert_eq!(diff.diffs[0].diff_type, DiffType::Delete);
        assert_eq!(diff.diffs[0].id, Some(RedirectId::from(9)));
    }
}
