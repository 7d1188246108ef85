//! Git-backed change set resolution.
//!
//! Computes which units under the watched root changed between two commits.
//! Deltas that only delete files never produce a unit.

use std::path::{Component, Path, PathBuf};

use git2::{Delta, DiffFindOptions, DiffOptions, Oid, Repository, Sort};
use tracing::{debug, info, warn};

use crate::error::{FnshipError, ResolveError, Result};

use super::types::{ChangeSet, UnitName};

/// The commit pair a diff is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeWindow {
    /// Effective base commit.
    pub base: Oid,
    /// Head commit.
    pub head: Oid,
    /// True when the requested base did not resolve and the root commit
    /// was used instead.
    pub fell_back_to_root: bool,
}

/// Resolves change sets from a git repository.
pub struct ChangeSetResolver {
    /// Open repository.
    repo: Repository,
}

impl std::fmt::Debug for ChangeSetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSetResolver")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl ChangeSetResolver {
    /// Opens the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if no repository is found.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|e| {
            FnshipError::Resolve(ResolveError::RepositoryOpen {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            })
        })?;

        debug!("Opened repository at {}", repo.path().display());
        Ok(Self { repo })
    }

    /// Returns the working directory, unit paths are relative to it.
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Returns the names of units changed between `base` and `head`.
    ///
    /// # Errors
    ///
    /// Returns an error if `head` does not resolve or git fails. An
    /// unresolvable `base` is not an error.
    pub fn resolve(&self, base: &str, head: &str, watched_root: &Path) -> Result<ChangeSet> {
        let window = self.resolve_window(base, head)?;
        self.diff_window(&window, watched_root)
    }

    /// Resolves the commit pair, falling back to the root commit of
    /// `head`'s history when `base` is not a known commit.
    ///
    /// # Errors
    ///
    /// Returns an error if `head` does not resolve or the history walk fails.
    pub fn resolve_window(&self, base: &str, head: &str) -> Result<ChangeWindow> {
        let head_oid = self
            .repo
            .revparse_single(head)
            .and_then(|obj| obj.peel_to_commit())
            .map(|commit| commit.id())
            .map_err(|e| {
                FnshipError::Resolve(ResolveError::HeadNotFound {
                    reference: head.to_string(),
                    message: e.message().to_string(),
                })
            })?;

        if let Some(base_oid) = self.lookup_commit(base) {
            return Ok(ChangeWindow {
                base: base_oid,
                head: head_oid,
                fell_back_to_root: false,
            });
        }

        let root = self.root_commit(head_oid)?;
        warn!(
            "Base reference '{base}' is not a known commit, diffing from root commit {}",
            short(root)
        );

        Ok(ChangeWindow {
            base: root,
            head: head_oid,
            fell_back_to_root: true,
        })
    }

    /// Diffs the window and collects unit names.
    ///
    /// # Errors
    ///
    /// Returns an error if a commit or tree cannot be read.
    pub fn diff_window(&self, window: &ChangeWindow, watched_root: &Path) -> Result<ChangeSet> {
        let root = normalize_root(watched_root);
        let base_tree = self.repo.find_commit(window.base)?.tree()?;
        let head_tree = self.repo.find_commit(window.head)?.tree()?;

        let mut opts = DiffOptions::new();
        opts.pathspec(root.as_path());

        let mut diff =
            self.repo
                .diff_tree_to_tree(Some(&base_tree), Some(&head_tree), Some(&mut opts))?;

        let mut find = DiffFindOptions::new();
        find.renames(true).copies(true);
        diff.find_similar(Some(&mut find))?;

        let changes: Vec<(PathBuf, Delta)> = diff
            .deltas()
            .filter_map(|delta| {
                let path = delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())?;
                Some((path.to_path_buf(), delta.status()))
            })
            .collect();

        debug!(
            "{} deltas under {} between {} and {}",
            changes.len(),
            root.display(),
            short(window.base),
            short(window.head)
        );

        let set = units_from_changes(changes.iter().map(|(p, s)| (p.as_path(), *s)), &root);
        info!("Resolved {} changed unit(s): [{set}]", set.len());
        Ok(set)
    }

    /// Resolves `reference` to a commit, or `None` if it names nothing.
    fn lookup_commit(&self, reference: &str) -> Option<Oid> {
        let reference = reference.trim();
        if reference.is_empty() || reference.chars().all(|c| c == '0') {
            return None;
        }

        match self
            .repo
            .revparse_single(reference)
            .and_then(|obj| obj.peel_to_commit())
        {
            Ok(commit) => Some(commit.id()),
            Err(e) => {
                debug!("Base reference '{reference}' did not resolve: {}", e.message());
                None
            }
        }
    }

    /// Finds the parentless commit reached by walking back from `head`.
    fn root_commit(&self, head: Oid) -> Result<Oid> {
        let mut walk = self.repo.revwalk()?;
        walk.push(head)?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;

        for oid in walk {
            let oid = oid?;
            if self.repo.find_commit(oid)?.parent_count() == 0 {
                return Ok(oid);
            }
        }

        Err(FnshipError::Resolve(ResolveError::Git {
            message: format!("No root commit found in the history of {}", short(head)),
        }))
    }
}

/// Returns the working directory of the repository containing `path`, or
/// `path` itself when it is not inside a checkout.
#[must_use]
pub fn working_dir(path: &Path) -> PathBuf {
    match Repository::discover(path) {
        Ok(repo) => repo
            .workdir()
            .map_or_else(|| path.to_path_buf(), Path::to_path_buf),
        Err(e) => {
            debug!("No repository at {}: {}", path.display(), e.message());
            path.to_path_buf()
        }
    }
}

/// Returns true for delta statuses that carry new code to deploy.
///
/// Pure deletions carry none. Unmerged paths surface as `Conflicted`.
/// libgit2 has no status for an unknown change type, and `Unmodified`,
/// `Ignored`, `Untracked` and `Unreadable` never occur in a tree-to-tree diff.
#[must_use]
pub const fn is_deployable(status: Delta) -> bool {
    matches!(
        status,
        Delta::Added
            | Delta::Copied
            | Delta::Modified
            | Delta::Renamed
            | Delta::Typechange
            | Delta::Conflicted
    )
}

/// Extracts the unit a changed path belongs to.
///
/// The unit is the first segment after `watched_root`. Files sitting directly
/// in the watched root belong to no unit.
#[must_use]
pub fn unit_from_path(path: &Path, watched_root: &Path) -> Option<UnitName> {
    let relative = path.strip_prefix(watched_root).ok()?;
    let mut components = relative.components();

    let Some(Component::Normal(first)) = components.next() else {
        return None;
    };
    components.next()?;

    UnitName::new(first.to_string_lossy().into_owned()).ok()
}

/// Builds a change set from `(path, status)` pairs.
pub fn units_from_changes<'a, I>(changes: I, watched_root: &Path) -> ChangeSet
where
    I: IntoIterator<Item = (&'a Path, Delta)>,
{
    let root = normalize_root(watched_root);
    changes
        .into_iter()
        .filter(|(_, status)| is_deployable(*status))
        .filter_map(|(path, _)| unit_from_path(path, &root))
        .collect()
}

/// Drops `.` components so `./AWSLambdaFunctions/` matches git's paths.
fn normalize_root(watched_root: &Path) -> PathBuf {
    watched_root
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn short(oid: Oid) -> String {
    let mut s = oid.to_string();
    s.truncate(8);
    s
}
