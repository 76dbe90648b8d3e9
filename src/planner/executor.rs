//! Plan executor for applying plans.
//!
//! Actions run one at a time through the [`Reconciler`] and their outcomes
//! are recorded in the tracked state as they complete.

use chrono::Utc;
use tracing::{debug, error, info};

use crate::api::{RedirectApi, RedirectId};
use crate::config::RedirectSpec;
use crate::error::{ReconcileError, RedirectError, Result};
use crate::reconciler::{Reconciler, RedirectResource};
use crate::state::{ProviderState, TrackedRedirect};

use super::plan::{ActionType, ApplyPlan, PlannedAction};

/// Executor for apply plans.
#[derive(Debug)]
pub struct PlanExecutor<'a, A: RedirectApi> {
    /// Reconciliation engine.
    reconciler: &'a Reconciler<A>,
    /// Whether to continue on errors.
    continue_on_error: bool,
}

/// Result of executing a single action.
#[derive(Debug)]
pub struct ActionResult {
    /// Action index.
    pub index: usize,
    /// Action that was executed.
    pub action: PlannedAction,
    /// Whether the action succeeded.
    pub success: bool,
    /// Remote id involved, if any.
    pub redirect_id: Option<RedirectId>,
    /// Error message (if failed).
    pub error: Option<String>,
}

/// Result of executing the entire plan.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Individual action results.
    pub results: Vec<ActionResult>,
    /// Total actions executed.
    pub total_executed: usize,
    /// Number of successful actions.
    pub successful: usize,
    /// Number of failed actions.
    pub failed: usize,
    /// Number of actions not run after a failure.
    pub skipped: usize,
    /// Whether the entire plan succeeded.
    pub success: bool,
}

impl<'a, A: RedirectApi> PlanExecutor<'a, A> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(reconciler: &'a Reconciler<A>) -> Self {
        Self {
            reconciler,
            continue_on_error: false,
        }
    }

    /// Sets whether to continue on errors.
    #[must_use]
    pub const fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Executes an apply plan, recording outcomes in `state`.
    ///
    /// Stops at the first failure unless `continue_on_error` is set.
    pub async fn execute(&self, plan: &ApplyPlan, state: &mut ProviderState) -> ExecutionResult {
        info!("Executing apply plan with {} actions", plan.actions.len());

        let mut results = Vec::new();

        for (idx, action) in plan.actions.iter().enumerate() {
            let result = self.execute_action(idx, action, state).await;
            let failed = !result.success;
            results.push(result);

            if failed && !self.continue_on_error {
                break;
            }
        }

        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful;

        ExecutionResult {
            total_executed: results.len(),
            successful,
            failed,
            skipped: plan.actions.len() - results.len(),
            success: failed == 0,
            results,
        }
    }

    /// Executes a single action.
    async fn execute_action(
        &self,
        index: usize,
        action: &PlannedAction,
        state: &mut ProviderState,
    ) -> ActionResult {
        info!("Executing action {}: {}", index, action.description());

        let outcome = match action.action_type {
            ActionType::Create => self.execute_create(action, state).await,
            ActionType::Update => self.execute_update(action, state).await,
            ActionType::Delete => self.execute_delete(action, state).await,
        };

        match outcome {
            Ok(redirect_id) => ActionResult {
                index,
                action: action.clone(),
                success: true,
                redirect_id,
                error: None,
            },
            Err(e) => {
                error!("Failed to {} redirect {}: {}", action.action_type, action.resource_name, e);
                ActionResult {
                    index,
                    action: action.clone(),
                    success: false,
                    redirect_id: action.redirect_id.clone(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Creates a redirect and starts tracking it. Nothing is stored on failure.
    async fn execute_create(
        &self,
        action: &PlannedAction,
        state: &mut ProviderState,
    ) -> Result<Option<RedirectId>> {
        let spec = Self::require_spec(action)?;
        let spec_hash = action.new_hash.as_deref().unwrap_or_default();

        let mut resource = RedirectResource::new();
        self.reconciler.create(&mut resource, spec).await?;

        let id = resource.id.clone();
        state.set(TrackedRedirect::new(&action.resource_name, spec_hash, resource));
        Ok(id)
    }

    /// Replaces a tracked redirect with its declaration.
    async fn execute_update(
        &self,
        action: &PlannedAction,
        state: &mut ProviderState,
    ) -> Result<Option<RedirectId>> {
        let spec = Self::require_spec(action)?;

        let Some(tracked) = state.get_mut(&action.resource_name) else {
            return Err(Self::failure(action, "redirect is not tracked"));
        };

        self.reconciler.update(&mut tracked.resource, spec).await?;
        if let Some(hash) = &action.new_hash {
            tracked.set_spec_hash(hash);
        }

        let id = tracked.id().cloned();
        state.last_updated = Utc::now();
        Ok(id)
    }

    /// Deletes a redirect and stops tracking it. The id is kept on failure.
    async fn execute_delete(
        &self,
        action: &PlannedAction,
        state: &mut ProviderState,
    ) -> Result<Option<RedirectId>> {
        let Some(tracked) = state
            .get_mut(&action.resource_name)
            .filter(|t| t.resource.is_created())
        else {
            debug!("No remote id for {}, dropping it from state", action.resource_name);
            state.remove(&action.resource_name);
            return Ok(None);
        };

        let id = tracked.id().cloned();
        match self.reconciler.delete(&mut tracked.resource).await {
            Ok(()) => {}
            Err(RedirectError::Api(e)) if e.status() == Some(404) => {
                info!("Redirect {} was already deleted", action.resource_name);
            }
            Err(e) => return Err(e),
        }

        state.remove(&action.resource_name);
        Ok(id)
    }

    fn require_spec(action: &PlannedAction) -> Result<&RedirectSpec> {
        action
            .spec
            .as_ref()
            .ok_or_else(|| Self::failure(action, "missing declaration"))
    }

    fn failure(action: &PlannedAction, reason: &str) -> RedirectError {
        ReconcileError::ResourceReconcileFailed {
            name: action.resource_name.clone(),
            reason: reason.to_string(),
        }
        .into()
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Executed {} actions: {} successful, {} failed, {} skipped",
            self.total_executed, self.successful, self.failed, self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockRedirectApi, RedirectAttributes, RemoteRedirect};
    use crate::config::{Destination, Manifest, Monitoring, RedirectDeclaration, SpecHasher};
    use crate::error::ApiError;
    use crate::planner::DiffEngine;

    fn spec(host: &str) -> RedirectSpec {
        RedirectSpec::new([host], vec![Destination::new("https://example.org")])
    }

    fn remote(id: u64, spec: &RedirectSpec) -> RemoteRedirect {
        RemoteRedirect {
            id: RedirectId::from(id),
            attributes: RedirectAttributes::from(spec),
            domains: vec![],
        }
    }

    fn failure(status: u16) -> ApiError {
        ApiError::UnexpectedStatus {
            operation: "test",
            expected: 204,
            status,
            body: String::new(),
        }
    }

    fn manifest(names: &[&str]) -> Manifest {
        Manifest {
            redirects: names
                .iter()
                .map(|n| RedirectDeclaration {
                    name: n.to_string(),
                    spec: spec(&format!("{n}.example.com")),
                })
                .collect(),
            ..Manifest::default()
        }
    }

    fn tracked(name: &str, id: u64) -> TrackedRedirect {
        let spec = spec(&format!("{name}.example.com"));
        let mut resource = RedirectResource::with_id(RedirectId::from(id));
        resource.attributes = RedirectAttributes::from(&spec);
        TrackedRedirect::new(name, &SpecHasher::new().hash_spec(&spec), resource)
    }

    fn plan_for(manifest: &Manifest, state: &ProviderState) -> ApplyPlan {
        let diff = DiffEngine::new().compute_diff(manifest, Some(state));
        ApplyPlan::from_diff(&diff, manifest)
    }

    #[tokio::test]
    async fn test_apply_creates_and_tracks() {
        let manifest = manifest(&["blog"]);
        let mut state = ProviderState::new();

        let mut api = MockRedirectApi::new();
        api.expect_create()
            .times(1)
            .returning(|_| Ok(remote(10, &spec("blog.example.com"))));
        let reconciler = Reconciler::new(api);

        let plan = plan_for(&manifest, &state);
        let result = PlanExecutor::new(&reconciler).execute(&plan, &mut state).await;

        assert!(result.success);
        assert_eq!(result.successful, 1);
        let tracked = state.get("blog").expect("blog should be tracked");
        assert_eq!(tracked.id(), Some(&RedirectId::from(10)));

        // A second run against the recorded state is a no-op
        assert!(plan_for(&manifest, &state).is_empty());
    }

    #[tokio::test]
    async fn test_apply_converges_after_bare_string_echo() {
        let declared = RedirectSpec::new(
            ["blog.example.com"],
            vec![Destination::new("https://example.org").with_monitoring(Monitoring::Enabled)],
        );
        let manifest = Manifest {
            redirects: vec![RedirectDeclaration {
                name: String::from("blog"),
                spec: declared.clone(),
            }],
            ..Manifest::default()
        };
        let mut state = ProviderState::new();

        let mut api = MockRedirectApi::new();
        api.expect_create().times(1).returning(move |_| {
            let mut echoed = remote(10, &declared);
            echoed.attributes.destinations = Some(vec![Destination::new("https://example.org")]);
            echoed.attributes.destination_url_only = true;
            Ok(echoed)
        });
        api.expect_replace().never();
        let reconciler = Reconciler::new(api);

        let plan = plan_for(&manifest, &state);
        assert_eq!(plan.count(ActionType::Create), 1);
        let result = PlanExecutor::new(&reconciler).execute(&plan, &mut state).await;
        assert!(result.success);

        assert!(plan_for(&manifest, &state).is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_stores_nothing() {
        let manifest = manifest(&["blog"]);
        let mut state = ProviderState::new();

        let mut api = MockRedirectApi::new();
        api.expect_create().returning(|_| Err(ApiError::transport("refused")));
        let reconciler = Reconciler::new(api);

        let plan = plan_for(&manifest, &state);
        let result = PlanExecutor::new(&reconciler).execute(&plan, &mut state).await;

        assert!(!result.success);
        assert_eq!(result.failed, 1);
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_id() {
        let mut state = ProviderState::new();
        state.set(tracked("old", 7));

        let mut api = MockRedirectApi::new();
        api.expect_delete().returning(|_| Err(failure(500)));
        let reconciler = Reconciler::new(api);

        let plan = plan_for(&Manifest::default(), &state);
        let result = PlanExecutor::new(&reconciler).execute(&plan, &mut state).await;

        assert_eq!(result.failed, 1);
        assert_eq!(state.get("old").and_then(TrackedRedirect::id), Some(&RedirectId::from(7)));
    }

    #[tokio::test]
    async fn test_delete_of_missing_redirect_untracks_it() {
        let mut state = ProviderState::new();
        state.set(tracked("old", 7));

        let mut api = MockRedirectApi::new();
        api.expect_delete().returning(|_| Err(failure(404)));
        let reconciler = Reconciler::new(api);

        let plan = ApplyPlan::destroy(&state, None);
        let result = PlanExecutor::new(&reconciler).execute(&plan, &mut state).await;

        assert!(result.success);
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_update_applies_declaration_and_keeps_id() {
        let manifest = manifest(&["blog"]);
        let mut state = ProviderState::new();
        let mut stale = tracked("blog", 3);
        stale.spec_hash = String::from("stale");
        state.set(stale);

        let mut api = MockRedirectApi::new();
        api.expect_replace()
            .times(1)
            .withf(|id, _| id.as_str() == "3")
            .returning(|_, _| Ok(remote(3, &spec("blog.example.com"))));
        let reconciler = Reconciler::new(api);

        let plan = plan_for(&manifest, &state);
        let result = PlanExecutor::new(&reconciler).execute(&plan, &mut state).await;

        assert!(result.success);
        let tracked = state.get("blog").expect("blog should be tracked");
        assert_eq!(tracked.id(), Some(&RedirectId::from(3)));
        assert_eq!(tracked.spec_hash, SpecHasher::new().hash_spec(&spec("blog.example.com")));
    }

    #[tokio::test]
    async fn test_failure_isolation() {
        let manifest = manifest(&["alpha", "beta"]);

        let build = || {
            let mut api = MockRedirectApi::new();
            api.expect_create()
                .withf(|body| String::from_utf8_lossy(body).contains("alpha.example.com"))
                .returning(|_| Err(ApiError::transport("refused")));
            api.expect_create()
                .withf(|body| String::from_utf8_lossy(body).contains("beta.example.com"))
                .returning(|_| Ok(remote(2, &spec("beta.example.com"))));
            Reconciler::new(api)
        };

        // Stops at the first failure by default
        let reconciler = build();
        let mut state = ProviderState::new();
        let plan = plan_for(&manifest, &state);
        let result = PlanExecutor::new(&reconciler).execute(&plan, &mut state).await;
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 1);
        assert!(state.is_empty());

        // Keeps going when asked to
        let reconciler = build();
        let mut state = ProviderState::new();
        let result = PlanExecutor::new(&reconciler)
            .with_continue_on_error(true)
            .execute(&plan, &mut state)
            .await;
        assert_eq!(result.failed, 1);
        assert_eq!(result.successful, 1);
        assert_eq!(state.names(), vec!["beta"]);
    }
}
