//! Planning module for apply operations.
//!
//! This module compares the manifest against tracked state and turns the
//! difference into an ordered plan run through the reconciliation engine.

mod diff;
mod executor;
mod plan;

pub use diff::{DiffEngine, DiffResult, DiffType, ResourceDiff};
pub use executor::{ActionResult, ExecutionResult, PlanExecutor};
pub use plan::{ActionType, ApplyPlan, PlannedAction};
