//! In-memory repository used by unit tests.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::app::repository::{RepositoryService, join_within};
use crate::domain::model::{BranchRef, RemoteRecord, TagRef};

#[derive(Debug, Default)]
pub struct FakeRepository {
    root: PathBuf,
    files: HashSet<String>,
    branches: Vec<BranchRef>,
    tags: Vec<TagRef>,
    remotes: Vec<RemoteRecord>,
    default_branches: HashMap<String, String>,
    fail_branches: bool,
    fail_lookups: bool,
    branch_queries: Cell<usize>,
    ref_lookups: Cell<usize>,
}

impl FakeRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, relative: &str) -> Self {
        self.files.insert(relative.to_owned());
        self
    }

    pub fn with_remote_branch(mut self, remote: &str, name: &str, sha: &str) -> Self {
        self.branches.push(BranchRef {
            name: format!("{remote}/{name}"),
            remote: true,
            sha: Some(sha.to_owned()),
        });
        self
    }

    pub fn with_local_branch(mut self, name: &str) -> Self {
        self.branches.push(BranchRef {
            name: name.to_owned(),
            remote: false,
            sha: None,
        });
        self
    }

    pub fn with_tag(mut self, name: &str, sha: &str) -> Self {
        self.tags.push(TagRef {
            name: name.to_owned(),
            sha: Some(sha.to_owned()),
        });
        self
    }

    pub fn with_remote(mut self, name: &str, url: &str) -> Self {
        self.remotes.push(RemoteRecord {
            name: name.to_owned(),
            url: url.to_owned(),
        });
        self
    }

    pub fn with_default_branch(mut self, remote: &str, branch: &str) -> Self {
        self.default_branches
            .insert(remote.to_owned(), format!("{remote}/{branch}"));
        self
    }

    pub fn failing_branches(mut self) -> Self {
        self.fail_branches = true;
        self
    }

    /// Make default-branch and ref lookups fail.
    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn branch_queries(&self) -> usize {
        self.branch_queries.get()
    }

    pub fn ref_lookups(&self) -> usize {
        self.ref_lookups.get()
    }
}

impl RepositoryService for FakeRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn branches(&self) -> Result<Vec<BranchRef>> {
        self.branch_queries.set(self.branch_queries.get() + 1);
        if self.fail_branches {
            bail!("branch listing failed");
        }
        Ok(self.branches.clone())
    }

    fn tags(&self) -> Result<Vec<TagRef>> {
        Ok(self.tags.clone())
    }

    fn to_absolute_path(&self, relative: &str, validate: bool) -> Result<Option<PathBuf>> {
        if validate && !self.files.contains(relative) {
            return Ok(None);
        }
        Ok(join_within(&self.root, relative))
    }

    fn default_branch_name(&self, remote: &str) -> Result<Option<String>> {
        if self.fail_lookups {
            bail!("default branch lookup failed");
        }
        Ok(self.default_branches.get(remote).cloned())
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<String>> {
        self.ref_lookups.set(self.ref_lookups.get() + 1);
        if self.fail_lookups {
            bail!("ref lookup failed");
        }
        let branch = self
            .branches
            .iter()
            .find(|branch| branch.name == name || branch.name_without_remote() == name)
            .and_then(|branch| branch.sha.clone());
        let tag = || {
            self.tags
                .iter()
                .find(|tag| tag.name == name)
                .and_then(|tag| tag.sha.clone())
        };
        Ok(branch.or_else(tag))
    }

    fn remotes(&self) -> Result<Vec<RemoteRecord>> {
        Ok(self.remotes.clone())
    }
}
