//! Local file-based state storage backend.
//!
//! State is kept as a single pretty-printed JSON file, written atomically.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Result, StateError};

use super::store::StateStore;
use super::types::{ProviderState, STATE_VERSION};

/// Default state file location, relative to the working directory.
pub const DEFAULT_STATE_PATH: &str = ".redirectpizza/state.json";

/// Local file-based state store.
#[derive(Debug)]
pub struct LocalStateStore {
    /// Path to the state file.
    state_path: PathBuf,
}

impl LocalStateStore {
    /// Creates a new local state store at the default path.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state_path(DEFAULT_STATE_PATH)
    }

    /// Creates a new local state store from a custom state file path.
    #[must_use]
    pub fn with_state_path(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    /// Returns the state file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.state_path
    }

    /// Ensures the state directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        let Some(dir) = self.state_path.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(());
        };

        if !dir.exists() {
            debug!("Creating state directory: {}", dir.display());
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StateError::storage(format!("Failed to create state directory: {e}")))?;
        }
        Ok(())
    }
}

impl Default for LocalStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<ProviderState>> {
        if !self.state_path.exists() {
            debug!("State file does not exist: {}", self.state_path.display());
            return Ok(None);
        }

        debug!("Loading state from: {}", self.state_path.display());

        let content = fs::read_to_string(&self.state_path).await.map_err(|e| StateError::Corrupted {
            message: format!("Failed to read state file: {e}"),
        })?;

        let state: ProviderState = serde_json::from_str(&content).map_err(|e| StateError::Corrupted {
            message: format!("Failed to parse state file: {e}"),
        })?;

        if state.version != STATE_VERSION {
            return Err(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: state.version,
            }
            .into());
        }

        Ok(Some(state))
    }

    async fn save(&self, state: &ProviderState) -> Result<()> {
        self.ensure_dir().await?;

        info!("Saving state to: {}", self.state_path.display());

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::serialization(format!("Failed to serialize state: {e}")))?;

        // Write to a temporary file first, then rename
        let temp_path = self.state_path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StateError::storage(format!("Failed to create temp state file: {e}")))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| StateError::storage(format!("Failed to write state file: {e}")))?;

        file.sync_all()
            .await
            .map_err(|e| StateError::storage(format!("Failed to sync state file: {e}")))?;

        fs::rename(&temp_path, &self.state_path)
            .await
            .map_err(|e| StateError::storage(format!("Failed to rename state file: {e}")))?;

        debug!("State saved successfully");
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        if self.state_path.exists() {
            info!("Deleting state file: {}", self.state_path.display());
            fs::remove_file(&self.state_path)
                .await
                .map_err(|e| StateError::storage(format!("Failed to delete state file: {e}")))?;
        }
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.state_path.exists())
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RedirectId;
    use crate::error::RedirectError;
    use crate::reconciler::RedirectResource;
    use crate::state::TrackedRedirect;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalStateStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_state_path(temp_dir.path().join("nested/state.json"));
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store();

        let mut state = ProviderState::new();
        state.set(TrackedRedirect::new(
            "blog",
            "hash",
            RedirectResource::with_id(RedirectId::from(99)),
        ));
        store.save(&state).await.expect("Failed to save state");

        let loaded = store
            .load()
            .await
            .expect("Failed to load state")
            .expect("State should exist");

        let tracked = loaded.get("blog").expect("blog should be tracked");
        assert_eq!(tracked.id(), Some(&RedirectId::from(99)));
        assert_eq!(tracked.spec_hash, "hash");
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store();

        let result = store.load().await.expect("Load should not fail");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let (store, _temp) = create_test_store();

        assert!(!store.exists().await.expect("exists check failed"));

        store.save(&ProviderState::new()).await.expect("Failed to save state");
        assert!(store.exists().await.expect("exists check failed"));

        store.delete().await.expect("Failed to delete state");
        assert!(!store.exists().await.expect("exists check failed"));
    }

    #[tokio::test]
    async fn test_boxed_store() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store: Box<dyn StateStore> =
            Box::new(LocalStateStore::with_state_path(temp_dir.path().join("state.json")));
        assert_eq!(store.backend_type(), "local");

        let mut state = ProviderState::new();
        state.set(TrackedRedirect::new("blog", "hash", RedirectResource::new()));
        store.save(&state).await.expect("Failed to save state");

        let loaded = store
            .load()
            .await
            .expect("Failed to load state")
            .expect("State should exist");
        assert_eq!(loaded.names(), vec!["blog"]);
    }

    #[tokio::test]
    async fn test_corrupted_and_mismatched_state() {
        let (store, _temp) = create_test_store();
        store.save(&ProviderState::new()).await.expect("Failed to save state");

        fs::write(store.path(), "{ not json").await.expect("write");
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, RedirectError::State(StateError::Corrupted { .. })));

        let mut state = ProviderState::new();
        state.version = String::from("0.1");
        store.save(&state).await.expect("Failed to save state");
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, RedirectError::State(StateError::VersionMismatch { .. })));
    }
}
