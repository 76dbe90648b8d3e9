//! Apply plan types and construction.
//!
//! This module defines the structure of apply plans and provides
//! functionality for converting diffs into executable plans.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::RedirectId;
use crate::config::{Manifest, RedirectSpec};
use crate::state::ProviderState;

use super::diff::{DiffResult, DiffType};

/// A complete apply plan.
#[derive(Debug, Serialize)]
pub struct ApplyPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Planned actions in execution order.
    pub actions: Vec<PlannedAction>,
}

/// A single planned action.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// Local redirect name.
    pub resource_name: String,
    /// Desired state (creates and updates).
    #[serde(skip)]
    pub spec: Option<RedirectSpec>,
    /// Remote id (updates and deletes).
    pub redirect_id: Option<RedirectId>,
    /// Reason for this action.
    pub reason: String,
    /// New declaration hash (creates and updates).
    #[serde(skip)]
    pub new_hash: Option<String>,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Create a new redirect.
    Create,
    /// Replace an existing redirect in place.
    Update,
    /// Delete a redirect.
    Delete,
}

impl ApplyPlan {
    /// Creates a new plan from a diff result.
    ///
    /// Deletes come first, then creates, then updates.
    #[must_use]
    pub fn from_diff(diff: &DiffResult, manifest: &Manifest) -> Self {
        let mut actions = Vec::new();

        for resource_diff in &diff.diffs {
            if resource_diff.diff_type == DiffType::Delete {
                actions.push(PlannedAction {
                    action_type: ActionType::Delete,
                    resource_name: resource_diff.name.clone(),
                    spec: None,
                    redirect_id: resource_diff.id.clone(),
                    reason: String::from("Redirect removed from manifest"),
                    new_hash: None,
                });
            }
        }

        for resource_diff in &diff.diffs {
            if resource_diff.diff_type != DiffType::Create {
                continue;
            }
            if let Some(declaration) = manifest.redirect(&resource_diff.name) {
                actions.push(PlannedAction {
                    action_type: ActionType::Create,
                    resource_name: resource_diff.name.clone(),
                    spec: Some(declaration.spec.clone()),
                    redirect_id: None,
                    reason: String::from("Redirect declared in manifest"),
                    new_hash: resource_diff.new_hash.clone(),
                });
            }
        }

        for resource_diff in &diff.diffs {
            if !matches!(resource_diff.diff_type, DiffType::Update | DiffType::Drift) {
                continue;
            }
            if let Some(declaration) = manifest.redirect(&resource_diff.name) {
                let reason = if resource_diff.diff_type == DiffType::Drift {
                    format!("Remote drift in {}", resource_diff.details.join(", "))
                } else {
                    String::from("Declaration changed")
                };

                actions.push(PlannedAction {
                    action_type: ActionType::Update,
                    resource_name: resource_diff.name.clone(),
                    spec: Some(declaration.spec.clone()),
                    redirect_id: resource_diff.id.clone(),
                    reason,
                    new_hash: resource_diff.new_hash.clone(),
                });
            }
        }

        Self {
            created_at: Utc::now(),
            actions,
        }
    }

    /// Creates a plan deleting tracked redirects, optionally only one.
    #[must_use]
    pub fn destroy(state: &ProviderState, only: Option<&str>) -> Self {
        let actions = state
            .resources
            .values()
            .filter(|t| only.is_none_or(|name| t.name == name))
            .map(|t| PlannedAction {
                action_type: ActionType::Delete,
                resource_name: t.name.clone(),
                spec: None,
                redirect_id: t.id().cloned(),
                reason: String::from("Destroy requested"),
                new_hash: None,
            })
            .collect();

        Self {
            created_at: Utc::now(),
            actions,
        }
    }

    /// Returns true if the plan is empty (no changes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of actions.
    #[must_use]
    pub const fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Returns the number of actions of a given type.
    #[must_use]
    pub fn count(&self, action_type: ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }
}

impl PlannedAction {
    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self.action_type {
            ActionType::Create => format!("Create redirect '{}'", self.resource_name),
            ActionType::Update => format!("Update redirect '{}'", self.resource_name),
            ActionType::Delete => format!("Delete redirect '{}'", self.resource_name),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action_type, self.resource_name)?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ApplyPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Apply Plan ({} actions):", self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {i}. {action}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Destination, RedirectDeclaration};
    use crate::planner::ResourceDiff;
    use crate::reconciler::RedirectResource;
    use crate::state::TrackedRedirect;

    fn diff(name: &str, diff_type: DiffType) -> ResourceDiff {
        ResourceDiff {
            name: name.to_string(),
            diff_type,
            details: vec![String::from("tags")],
            id: None,
            old_hash: None,
            new_hash: Some(String::from("h")),
        }
    }

    #[test]
    fn test_actions_are_ordered_deletes_creates_updates() {
        let spec = RedirectSpec::new(["example.com"], vec![Destination::new("https://example.org")]);
        let manifest = Manifest {
            redirects: ["upd", "new", "drift", "same"]
                .iter()
                .map(|n| RedirectDeclaration { name: n.to_string(), spec: spec.clone() })
                .collect(),
            ..Manifest::default()
        };

        let result = DiffResult {
            diffs: vec![
                diff("upd", DiffType::Update),
                diff("new", DiffType::Create),
                diff("drift", DiffType::Drift),
                diff("same", DiffType::NoChange),
                diff("old", DiffType::Delete),
            ],
            creates: 1,
            updates: 2,
            deletes: 1,
            unchanged: 1,
        };

        let plan = ApplyPlan::from_diff(&result, &manifest);
        let order: Vec<(ActionType, &str)> = plan
            .actions
            .iter()
            .map(|a| (a.action_type, a.resource_name.as_str()))
            .collect();

        assert_eq!(
            order,
            vec![
                (ActionType::Delete, "old"),
                (ActionType::Create, "new"),
                (ActionType::Update, "upd"),
                (ActionType::Update, "drift"),
            ]
        );
        assert_eq!(plan.actions[3].reason, "Remote drift in tags");
        assert!(plan.actions[1].spec.is_some());
        assert_eq!(plan.count(ActionType::Update), 2);
    }

    #[test]
    fn test_destroy_plan() {
        let mut state = ProviderState::new();
        for (name, id) in [("a", 1), ("b", 2)] {
            state.set(TrackedRedirect::new(name, "h", RedirectResource::with_id(RedirectId::from(id))));
        }

        assert_eq!(ApplyPlan::destroy(&state, None).action_count(), 2);

        let plan = ApplyPlan::destroy(&state, Some("b"));
        assert_eq!(plan.action_count(), 1);
        assert_eq!(plan.actions[0].redirect_id, Some(RedirectId::from(2)));

        assert!(ApplyPlan::destroy(&state, Some("c")).is_empty());
    }
}
