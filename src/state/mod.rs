//! State management module.
//!
//! This module provides persistent storage for tracked redirects: the
//! remote id and last observed attributes of every manifest entry.

mod local;
mod store;
mod types;

pub use local::{LocalStateStore, DEFAULT_STATE_PATH};
pub use store::StateStore;
pub use types::{ProviderState, TrackedRedirect, STATE_VERSION};
