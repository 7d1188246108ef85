//! Change detection module.
//!
//! This module determines which deploy units changed in a commit window:
//! - [`ChangeSetResolver`] diffs two commits with git
//! - [`ChangeSet`] carries the resulting unit names to the orchestrator

mod resolver;
mod types;

pub use resolver::{
    ChangeSetResolver, ChangeWindow, is_deployable, unit_from_path, units_from_changes,
    working_dir,
};
pub use types::{ChangeSet, UnitName};
