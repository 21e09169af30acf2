//! Repository data consumed by URL resolution and the remote selector.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::domain::model::{BranchRef, RemoteRecord, TagRef};

/// Read-only access to the local repository.
///
/// Errors are genuine service failures. "Not found" is always expressed as `Ok(None)`
/// or an empty list.
pub trait RepositoryService {
    /// Working directory root of the repository.
    fn root(&self) -> &Path;

    /// Local and remote-tracking branches.
    fn branches(&self) -> Result<Vec<BranchRef>>;

    fn tags(&self) -> Result<Vec<TagRef>>;

    /// Map a repository-relative path onto the working tree. When `validate` is set,
    /// paths that do not exist on disk yield `None`.
    fn to_absolute_path(&self, relative: &str, validate: bool) -> Result<Option<PathBuf>>;

    /// Default branch advertised by `remote` (its `HEAD`), e.g. `origin/main`.
    fn default_branch_name(&self, remote: &str) -> Result<Option<String>>;

    /// Resolve a branch or tag name to the commit it points at.
    fn resolve_ref(&self, name: &str) -> Result<Option<String>>;

    fn remotes(&self) -> Result<Vec<RemoteRecord>>;
}

/// Join `relative` onto `root`, refusing paths that climb out of the root.
pub fn join_within(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut joined = root.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            segment => joined.push(segment),
        }
    }
    (joined != root).then_some(joined)
}
