//! Bucket synchronization module.
//!
//! Mirrors a local directory into an S3 bucket:
//! - [`scan_local`] hashes the local files
//! - [`SyncPlan`] decides what to upload and delete
//! - [`BucketSync`] applies the plan through an [`ObjectStore`]

mod bucket;
mod local;
mod plan;
mod s3;
mod store;

pub use bucket::{BucketSync, SyncReport};
pub use local::{LocalFile, hash_file, scan_local};
pub use plan::{PlannedUpload, SyncPlan, UploadReason};
pub use s3::{HASH_METADATA_KEY, S3ObjectStore};
pub use store::ObjectStore;
