//! Packaging module.
//!
//! Turns a unit directory into the zip archive uploaded as function code.
//! Archives are transient build artifacts rebuilt on every run.

mod builder;

pub use builder::{Archive, PackageBuilder};
