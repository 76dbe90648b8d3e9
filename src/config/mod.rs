//! Configuration module for the redirect reconciliation system.
//!
//! This module handles all desired-state functionality:
//! - Parsing and deserializing `redirectpizza.yaml`
//! - Validation of desired-state documents before any remote call
//! - Computing declaration hashes for change detection

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{
    Destination, Manifest, Monitoring, ProviderSettings, RedirectDeclaration, RedirectSpec,
    RedirectType, StateSettings, MAX_SOURCES,
};
pub use parser::{
    find_config_file, ConfigParser, BASE_URL_ENV, DEFAULT_CONFIG_FILES, STATE_ENV, TOKEN_ENV,
};
pub use validator::{validate_redirect, ConfigValidator, ValidationResult, EXPRESSION_RULE};
pub use hash::SpecHasher;
