//! Reconciliation engine for a single redirect.
//!
//! A [`RedirectResource`] moves through a small lifecycle: it is created
//! (and assigned a remote id), read back from remote truth, replaced in
//! place, and finally deleted. Every operation validates and encodes locally
//! before exactly one remote call, and only touches local state once that
//! call has succeeded.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{self, DomainStatus, RedirectApi, RedirectAttributes, RedirectId, RemoteRedirect};
use crate::config::{validate_redirect, Manifest, RedirectSpec};
use crate::error::{ReconcileError, Result};
use crate::state::ProviderState;

/// Local view of one remote redirect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectResource {
    /// Remote id. `None` until created, cleared on delete.
    pub id: Option<RedirectId>,
    /// Owned attributes as last observed remotely.
    #[serde(default)]
    pub attributes: RedirectAttributes,
    /// Server-only domain state, read-only.
    #[serde(default)]
    pub domains: Vec<DomainStatus>,
}

impl RedirectResource {
    /// Creates an un-created resource.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resource known only by an externally supplied id.
    #[must_use]
    pub fn with_id(id: RedirectId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Returns true once the resource has a remote id.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        self.id.is_some()
    }

    fn require_id(&self, operation: &'static str) -> Result<RedirectId> {
        self.id
            .clone()
            .ok_or_else(|| ReconcileError::NotCreated { operation }.into())
    }

    /// Takes over attributes from a remote representation, keeping the id.
    fn refresh_from(&mut self, remote: RemoteRedirect) {
        self.attributes = remote.attributes;
        self.domains = remote.domains;
    }
}

/// Drives the four lifecycle operations against the remote API.
#[derive(Debug)]
pub struct Reconciler<A: RedirectApi> {
    /// Remote API.
    api: A,
}

impl<A: RedirectApi> Reconciler<A> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(api: A) -> Self {
        Self { api }
    }

    /// Creates the remote redirect and adopts its id and attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource already has an id, the desired state
    /// is invalid, or the remote call fails. The resource is left untouched.
    pub async fn create(&self, resource: &mut RedirectResource, desired: &RedirectSpec) -> Result<()> {
        if let Some(id) = &resource.id {
            return Err(ReconcileError::AlreadyCreated { id: id.to_string() }.into());
        }

        validate_redirect(desired)?;
        let body = api::encode(desired)?;

        let remote = self.api.create(body).await?;
        info!("Created redirect with id {}", remote.id);

        resource.id = Some(remote.id.clone());
        resource.refresh_from(remote);
        Ok(())
    }

    /// Re-fetches the redirect and overwrites every tracked attribute.
    ///
    /// Fields absent from the response become unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource has no id or the remote call fails.
    pub async fn read(&self, resource: &mut RedirectResource) -> Result<()> {
        let id = resource.require_id("read")?;

        let remote = self.api.fetch(&id).await?;
        if remote.id != id {
            warn!("Fetched redirect {id} but the API answered with id {}", remote.id);
        }
        debug!("Refreshed redirect {id}");

        resource.refresh_from(remote);
        Ok(())
    }

    /// Replaces the remote redirect wholesale with the desired state.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource has no id, the desired state is
    /// invalid, or the remote call fails.
    pub async fn update(&self, resource: &mut RedirectResource, desired: &RedirectSpec) -> Result<()> {
        let id = resource.require_id("update")?;

        validate_redirect(desired)?;
        let body = api::encode(desired)?;

        let remote = self.api.replace(&id, body).await?;
        info!("Updated redirect {id}");

        resource.refresh_from(remote);
        Ok(())
    }

    /// Deletes the remote redirect and clears the local id.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource has no id or the remote call fails;
    /// the id is kept so a retry targets the same remote redirect.
    pub async fn delete(&self, resource: &mut RedirectResource) -> Result<()> {
        let id = resource.require_id("delete")?;

        self.api.delete(&id).await?;
        info!("Deleted redirect {id}");

        *resource = RedirectResource::new();
        Ok(())
    }

    /// Builds a fully populated resource from an externally supplied id.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn import(&self, id: RedirectId) -> Result<RedirectResource> {
        let mut resource = RedirectResource::with_id(id);
        self.read(&mut resource).await?;
        Ok(resource)
    }

    /// Reads every tracked redirect and reports drift from the manifest.
    ///
    /// A failing read is recorded and does not stop the others.
    pub async fn refresh(&self, manifest: &Manifest, state: &mut ProviderState) -> DriftReport {
        let mut report = DriftReport::default();

        for (name, tracked) in &mut state.resources {
            if !tracked.resource.is_created() {
                continue;
            }

            if let Err(e) = self.read(&mut tracked.resource).await {
                warn!("Failed to refresh redirect '{name}': {e}");
                report.errors.push(format!("{name}: {e}"));
                continue;
            }
            tracked.touch();

            let declaration = manifest.redirect(name);
            let drifted_fields = declaration
                .map(|d| tracked.resource.attributes.drift_from(&d.spec))
                .unwrap_or_default();

            report.entries.push(DriftEntry {
                name: name.clone(),
                id: tracked.resource.id.clone(),
                declared: declaration.is_some(),
                drifted_fields: drifted_fields.into_iter().map(String::from).collect(),
            });
        }

        report
    }
}

/// Result of refreshing tracked redirects.
#[derive(Debug, Default, Serialize)]
pub struct DriftReport {
    /// One entry per successfully refreshed redirect.
    pub entries: Vec<DriftEntry>,
    /// Refresh failures.
    pub errors: Vec<String>,
}

/// Drift of a single redirect.
#[derive(Debug, Serialize)]
pub struct DriftEntry {
    /// Local name.
    pub name: String,
    /// Remote id.
    pub id: Option<RedirectId>,
    /// Whether the manifest still declares it.
    pub declared: bool,
    /// Owned fields whose remote value differs from the declaration.
    pub drifted_fields: Vec<String>,
}

impl DriftEntry {
    /// Returns true if the remote redirect no longer matches.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.declared || !self.drifted_fields.is_empty()
    }
}

impl DriftReport {
    /// Returns true if every refreshed redirect matches its declaration.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.entries.iter().all(|e| !e.has_drift())
    }
}

impl std::fmt::Display for DriftReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_converged() {
            writeln!(f, "No drift detected - remote state matches the manifest")?;
        } else {
            writeln!(f, "Drift detected:")?;
            for entry in self.entries.iter().filter(|e| e.has_drift()) {
                if entry.declared {
                    writeln!(f, "  - {}: {}", entry.name, entry.drifted_fields.join(", "))?;
                } else {
                    writeln!(f, "  - {}: no longer declared", entry.name)?;
                }
            }
        }

        if !self.errors.is_empty() {
            writeln!(f, "Errors:")?;
            for error in &self.errors {
                writeln!(f, "  - {error}")?;
            }
        }

        Ok(())
    }
}
