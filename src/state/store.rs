//! State store trait definition.
//!
//! This module defines the common interface for state storage backends.

use async_trait::async_trait;

use super::types::ProviderState;
use crate::error::Result;

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the tracked state.
    ///
    /// Returns `None` if no state exists yet.
    async fn load(&self) -> Result<Option<ProviderState>>;

    /// Saves the tracked state.
    async fn save(&self, state: &ProviderState) -> Result<()>;

    /// Deletes the tracked state.
    async fn delete(&self) -> Result<()>;

    /// Checks if state exists.
    async fn exists(&self) -> Result<bool>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}
