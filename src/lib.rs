// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # redirectpizza
//!
//! Declarative, idempotent management of redirect.pizza redirects.
//!
//! ## Overview
//!
//! A redirect maps one or more source domains to one or more destination
//! URLs. This crate keeps remote redirects converged with a declared
//! desired state:
//!
//! - Declare redirects in a YAML manifest
//! - Validate every document before anything is sent
//! - Create, read, replace and delete redirects over the REST API
//! - Track remote ids locally and detect drift
//!
//! ## Architecture
//!
//! Every operation follows the same flow, one redirect at a time:
//!
//! 1. **Validation**: structural and cross-field rules, checked offline
//! 2. **Wire codec**: the desired state is encoded into a request body
//! 3. **Client**: exactly one HTTP round trip
//! 4. **Decode**: the response (whose `destination` field comes in two shapes)
//!    becomes the new local state
//!
//! ## Modules
//!
//! - [`config`]: Manifest parsing, validation and hashing
//! - [`api`]: Wire codec and HTTP client
//! - [`reconciler`]: Per-redirect lifecycle engine
//! - [`state`]: Local tracked state
//! - [`planner`]: Diff computation and plan execution
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! redirects:
//!   - name: marketing
//!     sources: [example.com, www.example.com]
//!     destinations:
//!       - url: https://example.org/en
//!         expression: 'language == "en"'
//!       - url: https://example.org
//!     redirect_type: permanent
//!     tags: [campaign]
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod planner;
pub mod reconciler;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{ClientConfig, RedirectApi, RedirectClient, RedirectId};
pub use config::{ConfigParser, ConfigValidator, Manifest, RedirectSpec, SpecHasher};
pub use error::{RedirectError, Result};
pub use planner::{ApplyPlan, DiffEngine, PlanExecutor};
pub use reconciler::{DriftReport, Reconciler, RedirectResource};
pub use state::{LocalStateStore, ProviderState, StateStore};
