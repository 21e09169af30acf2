//! Gerrit family providers (Gerrit, GerritHub, Google Source).
//!
//! Gerrit splits its web presence in two: files, branches and tags are browsed through
//! Gitiles on the configured domain, while changes and commits live on a separate review
//! host whose first label carries a `-review` suffix.

use std::collections::HashSet;

use anyhow::Result;
use url::Url;

use crate::app::provider::{Autolink, RemoteProvider, ResolveOptions, with_path};
use crate::app::repository::RepositoryService;
use crate::domain::errors::DomainError;
use crate::domain::model::{LineRange, ProviderConfig, ResolvedLocation};

const HEADS_PREFIX: &str = "refs/heads/";
const TAGS_PREFIX: &str = "refs/tags/";

/// Which member of the Gerrit family a provider represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GerritFlavor {
    Gerrit,
    GoogleSource,
}

impl GerritFlavor {
    fn id(self) -> &'static str {
        match self {
            GerritFlavor::Gerrit => "gerrit",
            GerritFlavor::GoogleSource => "google-source",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            GerritFlavor::Gerrit => "Gerrit",
            GerritFlavor::GoogleSource => "Google Source",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GerritProvider {
    config: ProviderConfig,
    flavor: GerritFlavor,
    base_url: Url,
    review_base_url: Url,
}

impl GerritProvider {
    /// Build a provider. A leading `a/` (Gerrit's authenticated clone prefix) is dropped
    /// from the project path.
    pub fn new(config: ProviderConfig, flavor: GerritFlavor) -> Result<Self, DomainError> {
        let config = match config.path().strip_prefix("a/") {
            Some(project) if !project.is_empty() => ProviderConfig::new(
                config.domain(),
                project,
                config.protocol(),
                config.name().map(str::to_owned),
                config.is_custom(),
            )?,
            _ => config,
        };

        let protocol = config.protocol().as_str();
        let invalid = |_| DomainError::InvalidDomain(config.domain().to_owned());
        let root = Url::parse(&format!("{protocol}://{}/", config.domain())).map_err(invalid)?;
        let base_url = with_path(&root, config.path());
        let review_base_url = Url::parse(&format!(
            "{protocol}://{}/",
            review_domain(config.domain())
        ))
        .map_err(invalid)?;

        Ok(Self {
            config,
            flavor,
            base_url,
            review_base_url,
        })
    }

    /// Default ports are elided on both sides, so `host:443` matches `https://host/`.
    fn matches_domain(&self, url: &Url) -> bool {
        let (Some(host), Some(expected)) = (url.host_str(), self.base_url.host_str()) else {
            return false;
        };
        host.eq_ignore_ascii_case(expected) && url.port() == self.base_url.port()
    }

    /// Resolve `<name>/<file>` where `name` is one of `known`, preferring the longest name.
    fn resolve_qualified_path(
        &self,
        repository: &dyn RepositoryService,
        qualified: &str,
        known: &HashSet<String>,
        options: ResolveOptions,
        start_line: Option<u32>,
    ) -> Result<Option<ResolvedLocation>> {
        for (name, file) in ref_candidates(qualified) {
            if !known.contains(name) {
                continue;
            }
            if let Some(path) = repository.to_absolute_path(file, options.validate)? {
                return Ok(Some(ResolvedLocation { path, start_line }));
            }
            tracing::debug!(reference = name, file, "reference matched but file is missing");
        }
        Ok(None)
    }
}

impl RemoteProvider for GerritProvider {
    fn id(&self) -> &'static str {
        self.flavor.id()
    }

    fn name(&self) -> String {
        match self.config.name() {
            Some(name) => name.to_owned(),
            None if self.config.is_custom() => {
                format!("{} ({})", self.flavor.display_name(), self.config.domain())
            }
            None => self.flavor.display_name().to_owned(),
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn autolinks(&self) -> Vec<Autolink> {
        let review_base = self.review_base_url.as_str().trim_end_matches('/');
        vec![Autolink {
            prefix: "Change-Id: ".into(),
            url: format!("{review_base}/q/<num>"),
            title: format!("Open Change #<num> on {}", self.name()),
            alphanumeric: true,
            ignore_case: true,
        }]
    }

    fn url_for_repo(&self) -> Url {
        self.base_url.clone()
    }

    fn url_for_branches(&self) -> Url {
        with_path(
            &self.review_base_url,
            &format!("admin/repos/{},branches", self.config.path()),
        )
    }

    fn url_for_branch(&self, branch: &str) -> Url {
        with_path(&self.base_url, &format!("+/{HEADS_PREFIX}{branch}"))
    }

    fn url_for_tag(&self, tag: &str) -> Url {
        with_path(&self.base_url, &format!("+/{TAGS_PREFIX}{tag}"))
    }

    fn url_for_commit(&self, sha: &str) -> Url {
        with_path(&self.review_base_url, &format!("q/{sha}"))
    }

    fn url_for_file(
        &self,
        file_name: &str,
        branch: Option<&str>,
        sha: Option<&str>,
        range: Option<LineRange>,
    ) -> Url {
        let revision = match (sha, branch) {
            (Some(sha), _) => sha.to_owned(),
            (None, Some(branch)) => format!("{HEADS_PREFIX}{branch}"),
            (None, None) => "HEAD".to_owned(),
        };
        let mut url = with_path(&self.base_url, &format!("+/{revision}/{file_name}"));
        if let Some(range) = range {
            url.set_fragment(Some(&range.start.to_string()));
        }
        url
    }

    fn resolve_incoming_url(
        &self,
        repository: &dyn RepositoryService,
        url: &Url,
        options: ResolveOptions,
    ) -> Result<Option<ResolvedLocation>> {
        if !self.matches_domain(url) {
            return Ok(None);
        }

        let Ok(path) = urlencoding::decode(url.path()) else {
            return Ok(None);
        };
        if options.validate && !path.starts_with(&format!("/{}/", self.config.path())) {
            return Ok(None);
        }

        let start_line = url.fragment().and_then(parse_line_fragment);

        let Some(rest) = permalink_rest(&path) else {
            tracing::debug!(url = %url, "not a gitiles permalink");
            return Ok(None);
        };

        if let Some((revision, file)) = rest.split_once('/')
            && (is_commit_id(revision) || revision == "HEAD")
        {
            if let Some(path) = repository.to_absolute_path(file, options.validate)? {
                return Ok(Some(ResolvedLocation { path, start_line }));
            }
            return Ok(None);
        }

        if let Some(qualified) = rest.strip_prefix(HEADS_PREFIX) {
            if ref_candidates(qualified).next().is_none() {
                return Ok(None);
            }
            let known: HashSet<String> = repository
                .branches()?
                .iter()
                .filter(|branch| branch.remote)
                .map(|branch| branch.name_without_remote().to_owned())
                .collect();
            return self.resolve_qualified_path(repository, qualified, &known, options, start_line);
        }

        if let Some(qualified) = rest.strip_prefix(TAGS_PREFIX) {
            if ref_candidates(qualified).next().is_none() {
                return Ok(None);
            }
            let known: HashSet<String> = repository
                .tags()?
                .into_iter()
                .map(|tag| tag.name)
                .collect();
            return self.resolve_qualified_path(repository, qualified, &known, options, start_line);
        }

        Ok(None)
    }
}

/// Review host for `domain`: `-review` is appended to the first label, any port is kept.
pub fn review_domain(domain: &str) -> String {
    let (host, port) = match domain.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            (host, Some(port))
        }
        _ => (domain, None),
    };
    let host = match host.split_once('.') {
        Some((first, rest)) => format!("{first}-review.{rest}"),
        None => format!("{host}-review"),
    };
    match port {
        Some(port) => format!("{host}:{port}"),
        None => host,
    }
}

/// Extract `<rest>` from `/<project>/+/<rest>`.
fn permalink_rest(path: &str) -> Option<&str> {
    let (project, rest) = path.strip_prefix('/')?.split_once("/+/")?;
    (!project.is_empty() && !rest.is_empty()).then_some(rest)
}

/// A full commit id: 40 hex digits, or 64 for SHA-256 repositories.
fn is_commit_id(value: &str) -> bool {
    matches!(value.len(), 40 | 64) && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_line_fragment(fragment: &str) -> Option<u32> {
    if fragment.is_empty() || !fragment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    fragment.parse().ok()
}

/// Split `<name>/<file>` at every `/`, rightmost split first.
///
/// Scanning stops once the split index reaches the start of the string, so an empty name
/// is never produced.
fn ref_candidates(qualified: &str) -> impl Iterator<Item = (&str, &str)> {
    qualified
        .rmatch_indices('/')
        .map(|(index, _)| index)
        .take_while(|index| *index > 0)
        .map(|index| (&qualified[..index], &qualified[index + 1..]))
}
