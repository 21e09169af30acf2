//! Git integration utilities.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::app::repository::{RepositoryService, join_within};
use crate::domain::model::{BranchRef, RemoteRecord, TagRef};

/// Repository access backed by [`gix::Repository`].
pub struct GitClient {
    repo: gix::Repository,
    root: PathBuf,
}

impl GitClient {
    /// Locate the git repository containing `path`.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = gix::discover(path)
            .with_context(|| format!("not inside a git repository: {}", path.display()))?;
        let root = repo
            .work_dir()
            .map(Path::to_path_buf)
            .or_else(|| repo.path().parent().map(Path::to_path_buf))
            .context("repository has no working directory")?;
        Ok(Self { repo, root })
    }

    fn collect_branches<'r, E: std::fmt::Display>(
        refs: impl Iterator<Item = Result<gix::Reference<'r>, E>>,
        remote: bool,
        out: &mut Vec<BranchRef>,
    ) -> Result<()> {
        for reference in refs {
            let mut reference = reference.map_err(|err| anyhow!("failed to read branch: {err}"))?;
            let name = reference.name().shorten().to_string();
            if remote && name.ends_with("/HEAD") {
                continue;
            }
            let sha = reference
                .peel_to_id_in_place()
                .ok()
                .map(|id| id.detach().to_string());
            out.push(BranchRef { name, remote, sha });
        }
        Ok(())
    }
}

impl RepositoryService for GitClient {
    fn root(&self) -> &Path {
        &self.root
    }

    fn branches(&self) -> Result<Vec<BranchRef>> {
        let platform = self.repo.references().context("failed to open references")?;
        let mut branches = Vec::new();
        Self::collect_branches(
            platform.local_branches().context("failed to list local branches")?,
            false,
            &mut branches,
        )?;
        Self::collect_branches(
            platform.remote_branches().context("failed to list remote branches")?,
            true,
            &mut branches,
        )?;
        Ok(branches)
    }

    fn tags(&self) -> Result<Vec<TagRef>> {
        let platform = self.repo.references().context("failed to open references")?;
        let mut tags = Vec::new();
        for reference in platform.tags().context("failed to list tags")? {
            let mut reference = reference.map_err(|err| anyhow!("failed to read tag: {err}"))?;
            let name = reference.name().shorten().to_string();
            let sha = reference
                .peel_to_id_in_place()
                .ok()
                .map(|id| id.detach().to_string());
            tags.push(TagRef { name, sha });
        }
        Ok(tags)
    }

    fn to_absolute_path(&self, relative: &str, validate: bool) -> Result<Option<PathBuf>> {
        let Some(path) = join_within(&self.root, relative) else {
            return Ok(None);
        };
        if validate && !path.exists() {
            tracing::debug!(path = %path.display(), "file not present in working tree");
            return Ok(None);
        }
        Ok(Some(path))
    }

    fn default_branch_name(&self, remote: &str) -> Result<Option<String>> {
        let head = self
            .repo
            .try_find_reference(format!("refs/remotes/{remote}/HEAD").as_str())
            .with_context(|| format!("failed to read HEAD of remote {remote}"))?;
        Ok(head.and_then(|head| {
            head.target()
                .try_name()
                .map(|target| target.shorten().to_string())
        }))
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<String>> {
        let branch = self.branches()?.into_iter().find(|branch| {
            branch.sha.is_some() && (branch.name == name || branch.name_without_remote() == name)
        });
        if let Some(branch) = branch {
            return Ok(branch.sha);
        }
        if let Some(tag) = self.tags()?.into_iter().find(|tag| tag.name == name) {
            return Ok(tag.sha);
        }
        Ok(self
            .repo
            .rev_parse_single(name)
            .ok()
            .map(|id| id.detach().to_string()))
    }

    fn remotes(&self) -> Result<Vec<RemoteRecord>> {
        let mut remotes = Vec::new();
        for name in self.repo.remote_names() {
            let remote = self
                .repo
                .find_remote(&*name)
                .with_context(|| format!("failed to load remote {name}"))?;
            let Some(url) = remote.url(gix::remote::Direction::Fetch) else {
                continue;
            };
            remotes.push(RemoteRecord {
                name: name.to_string(),
                url: url.to_bstring().to_string(),
            });
        }
        Ok(remotes)
    }
}
