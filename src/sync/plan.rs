//! Sync plan computation.
//!
//! The plan is a pure function of the local scan and the remote listing,
//! so it can be printed for `--dry-run` and tested without a bucket.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use super::local::LocalFile;

/// Why a file is uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadReason {
    /// No remote object with this key.
    New,
    /// Remote hash differs or is unknown.
    Modified,
}

/// A planned upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpload {
    /// Object key, relative to the prefix.
    pub key: String,
    /// Local source path.
    pub path: PathBuf,
    /// Hex sha256 of the local file.
    pub sha256: String,
    /// Why the upload is needed.
    pub reason: UploadReason,
}

/// Work needed to make the bucket mirror the local directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    /// Uploads in key order.
    pub uploads: Vec<PlannedUpload>,
    /// Remote keys to delete, in key order.
    pub deletes: Vec<String>,
    /// Files already up to date.
    pub unchanged: usize,
}

impl SyncPlan {
    /// Computes the plan.
    ///
    /// `remote` maps each remote key to its stored hash, if any.
    #[must_use]
    pub fn compute(
        local: &BTreeMap<String, LocalFile>,
        remote: &BTreeMap<String, Option<String>>,
        delete_removed: bool,
    ) -> Self {
        let mut plan = Self::default();

        for (key, file) in local {
            let reason = match remote.get(key) {
                None => UploadReason::New,
                Some(Some(hash)) if *hash == file.sha256 => {
                    plan.unchanged += 1;
                    continue;
                }
                Some(_) => UploadReason::Modified,
            };
            plan.uploads.push(PlannedUpload {
                key: key.clone(),
                path: file.path.clone(),
                sha256: file.sha256.clone(),
                reason,
            });
        }

        if delete_removed {
            plan.deletes = remote
                .keys()
                .filter(|key| !local.contains_key(*key))
                .cloned()
                .collect();
        }

        plan
    }

    /// Returns true if nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.deletes.is_empty()
    }
}

impl fmt::Display for SyncPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let new = self
            .uploads
            .iter()
            .filter(|u| u.reason == UploadReason::New)
            .count();
        write!(
            f,
            "{new} new, {} modified, {} to delete, {} unchanged",
            self.uploads.len() - new,
            self.deletes.len(),
            self.unchanged
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(entries: &[(&str, &str)]) -> BTreeMap<String, LocalFile> {
        entries
            .iter()
            .map(|(key, hash)| {
                (
                    (*key).to_string(),
                    LocalFile {
                        path: PathBuf::from("DaveBucket").join(key),
                        sha256: (*hash).to_string(),
                    },
                )
            })
            .collect()
    }

    fn remote(entries: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
        entries
            .iter()
            .map(|(key, hash)| ((*key).to_string(), hash.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_classifies_every_key() {
        let local = local(&[("a.txt", "h1"), ("b.txt", "h2"), ("c.txt", "h3"), ("d.txt", "h4")]);
        let remote = remote(&[
            ("b.txt", Some("h2")),
            ("c.txt", Some("old")),
            ("d.txt", None),
            ("gone.txt", Some("h9")),
        ]);

        let plan = SyncPlan::compute(&local, &remote, true);

        let uploads: Vec<(&str, UploadReason)> = plan
            .uploads
            .iter()
            .map(|u| (u.key.as_str(), u.reason))
            .collect();
        assert_eq!(
            uploads,
            vec![
                ("a.txt", UploadReason::New),
                ("c.txt", UploadReason::Modified),
                ("d.txt", UploadReason::Modified),
            ]
        );
        assert_eq!(plan.deletes, vec![String::from("gone.txt")]);
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.to_string(), "1 new, 2 modified, 1 to delete, 1 unchanged");
    }

    #[test]
    fn test_keeps_remote_extras_without_delete() {
        let plan = SyncPlan::compute(
            &local(&[("a.txt", "h1")]),
            &remote(&[("a.txt", Some("h1")), ("extra.txt", None)]),
            false,
        );
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 1);
    }
}
