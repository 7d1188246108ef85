// ============================================================================
// Strict linting - Unsafe code and undocumented items are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code warning
#![warn(non_camel_case_types)]        // Types should follow CamelCase convention

// Additional strictness
#![warn(unused_imports)]              // Unused imports warning
#![warn(unused_variables)]            // Unused variables warning
#![warn(unused_must_use)]             // Result and Option should be handled
#![warn(non_snake_case)]              // Variables and functions should be snake_case
#![warn(non_upper_case_globals)]      // Constants should be UPPER_CASE
#![warn(nonstandard_style)]           // Non-standard code style warning
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
#![warn(clippy::module_inception)]    // Module with same name as crate warning
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

//! # fnship
//!
//! Selective deployment of serverless functions from a mono-repository.
//!
//! ## Overview
//!
//! A repository keeps one directory per function under a watched root
//! (`AWSLambdaFunctions/` by default). On every push, fnship:
//!
//! - Diffs the pushed commit window and finds the functions whose files changed
//! - Packages each changed directory into a reproducible zip archive
//! - Pushes each archive to the remote function of the same name
//!
//! Unchanged functions are never touched. The first failure stops the run
//! unless the continue-on-error policy is selected.
//!
//! ## Modules
//!
//! - [`changeset`]: Change set types and git-based resolution
//! - [`package`]: Archive building
//! - [`lambda`]: Remote function deployment
//! - [`orchestrator`]: Sequential build-and-deploy driver and run reports
//! - [`sync`]: Static bucket mirroring
//! - [`config`]: Configuration parsing and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! functions:
//!   watched_root: AWSLambdaFunctions
//!   failure_policy: fail_fast
//!
//! aws:
//!   region: us-east-1
//!
//! sync:
//!   bucket: dave-static-site
//!   local_dir: DaveBucket
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod changeset;
pub mod cli;
pub mod config;
pub mod error;
pub mod lambda;
pub mod orchestrator;
pub mod package;
pub mod sync;

// ============================================================================
// Re-exports
// ============================================================================

pub use changeset::{ChangeSet, ChangeSetResolver, UnitName};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, FnshipConfig};
pub use error::{FnshipError, Result};
pub use lambda::{FunctionDeployer, LambdaDeployer};
pub use orchestrator::{DeploymentOrchestrator, DeploymentReport};
pub use package::{Archive, PackageBuilder};
pub use sync::{BucketSync, ObjectStore, S3ObjectStore, SyncPlan};
