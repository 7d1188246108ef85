//! Bucket mirror runner.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{FnshipError, Result};

use super::local::scan_local;
use super::plan::SyncPlan;
use super::store::ObjectStore;

/// Result of a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Remote location.
    pub location: String,
    /// Local source directory.
    pub local_dir: PathBuf,
    /// Computed plan.
    pub plan: SyncPlan,
    /// True if the plan was only printed.
    pub dry_run: bool,
    /// Objects uploaded.
    pub uploaded: usize,
    /// Objects deleted.
    pub deleted: usize,
}

/// Mirrors a local directory into an object store.
pub struct BucketSync<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    delete_removed: bool,
    dry_run: bool,
}

impl<'a, S: ObjectStore + ?Sized> BucketSync<'a, S> {
    /// Creates a sync that deletes remote keys with no local file.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
            delete_removed: true,
            dry_run: false,
        }
    }

    /// Sets whether remote extras are deleted.
    #[must_use]
    pub const fn with_delete_removed(mut self, delete_removed: bool) -> Self {
        self.delete_removed = delete_removed;
        self
    }

    /// Sets dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Computes the plan for `local_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan or a remote lookup fails.
    pub async fn plan(&self, local_dir: &Path) -> Result<SyncPlan> {
        let dir = local_dir.to_path_buf();
        let local = tokio::task::spawn_blocking(move || scan_local(&dir))
            .await
            .map_err(|e| FnshipError::internal(format!("Scan task failed: {e}")))??;
        info!("Found {} local file(s) in {}", local.len(), local_dir.display());

        let mut remote = BTreeMap::new();
        for key in self.store.list_keys().await? {
            // Only keys that also exist locally need their hash.
            let hash = if local.contains_key(&key) {
                self.store.object_hash(&key).await?
            } else {
                None
            };
            remote.insert(key, hash);
        }

        Ok(SyncPlan::compute(&local, &remote, self.delete_removed))
    }

    /// Computes and applies the plan, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first scan, lookup, upload or delete failure.
    pub async fn run(&self, local_dir: &Path) -> Result<SyncReport> {
        let location = self.store.location();
        info!("Syncing {} to {location}", local_dir.display());

        let plan = self.plan(local_dir).await?;
        info!("Sync plan: {plan}");

        let mut report = SyncReport {
            location,
            local_dir: local_dir.to_path_buf(),
            plan,
            dry_run: self.dry_run,
            uploaded: 0,
            deleted: 0,
        };

        if self.dry_run {
            return Ok(report);
        }

        for upload in &report.plan.uploads {
            info!("Uploading {} ({:?})", upload.key, upload.reason);
            self.store
                .upload(&upload.key, &upload.path, &upload.sha256)
                .await?;
            report.uploaded += 1;
        }

        for key in &report.plan.deletes {
            warn!("Deleting {key}");
            self.store.delete(key).await?;
            report.deleted += 1;
        }

        Ok(report)
    }
}
