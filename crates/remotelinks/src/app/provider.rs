//! Hosting provider abstraction: outbound URL builders and inbound URL resolution.

use std::fmt;
use std::ops::Range;

use anyhow::{Context, Result};
use regex::RegexBuilder;
use url::Url;

use crate::app::repository::RepositoryService;
use crate::domain::model::{LineRange, ProviderConfig, PullRequestRef, RemoteResource, ResolvedLocation};

/// Options for [`RemoteProvider::resolve_incoming_url`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Require the URL to belong to the configured project and the target file to exist.
    pub validate: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { validate: true }
    }
}

/// A hosting provider that knows its URL scheme.
///
/// Builders never perform IO. Only [`RemoteProvider::resolve_incoming_url`] consults
/// the repository.
pub trait RemoteProvider: fmt::Debug + Send + Sync {
    /// Stable identifier, e.g. `gerrit`.
    fn id(&self) -> &'static str;

    /// Display name, honoring a configured override.
    fn name(&self) -> String;

    fn config(&self) -> &ProviderConfig;

    /// Whether the provider exposes an API integration.
    fn has_api(&self) -> bool {
        false
    }

    /// Default branch according to the provider's API.
    fn default_branch(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Inline text patterns that link to this provider.
    fn autolinks(&self) -> Vec<Autolink> {
        Vec::new()
    }

    fn url_for_repo(&self) -> Url;

    fn url_for_branches(&self) -> Url;

    fn url_for_branch(&self, branch: &str) -> Url;

    fn url_for_tag(&self, tag: &str) -> Url;

    fn url_for_commit(&self, sha: &str) -> Url;

    fn url_for_file(
        &self,
        file_name: &str,
        branch: Option<&str>,
        sha: Option<&str>,
        range: Option<LineRange>,
    ) -> Url;

    fn url_for_comparison(&self, _base: &str, _compare: &str) -> Option<Url> {
        None
    }

    fn url_for_create_pull_request(
        &self,
        _base: &PullRequestRef,
        _compare: &PullRequestRef,
    ) -> Option<Url> {
        None
    }

    /// Turn a provider URL back into a local file location.
    ///
    /// `Ok(None)` means the URL does not describe anything in `repository`.
    fn resolve_incoming_url(
        &self,
        repository: &dyn RepositoryService,
        url: &Url,
        options: ResolveOptions,
    ) -> Result<Option<ResolvedLocation>>;

    /// Build the URL for any resource, or `None` when the provider has no page for it.
    fn url_for_resource(&self, resource: &RemoteResource) -> Option<Url> {
        match resource {
            RemoteResource::Branch { branch } => Some(self.url_for_branch(branch)),
            RemoteResource::Branches => Some(self.url_for_branches()),
            RemoteResource::Commit { sha } => Some(self.url_for_commit(sha)),
            RemoteResource::Comparison { base, compare } => self.url_for_comparison(base, compare),
            RemoteResource::CreatePullRequest { base, compare } => {
                self.url_for_create_pull_request(base, compare)
            }
            RemoteResource::File {
                file_name,
                branch_or_tag,
                range,
            } => Some(self.url_for_file(file_name, branch_or_tag.as_deref(), None, *range)),
            RemoteResource::Repo => Some(self.url_for_repo()),
            RemoteResource::Revision {
                file_name,
                sha,
                branch_or_tag,
                range,
            } => Some(self.url_for_file(
                file_name,
                branch_or_tag.as_deref(),
                Some(sha),
                *range,
            )),
            RemoteResource::Tag { tag } => Some(self.url_for_tag(tag)),
        }
    }
}

/// Append `/`-separated `path` to `base`, percent-encoding each segment.
pub fn with_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
    }
    url
}

/// An inline text pattern that links to a provider page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Autolink {
    /// Literal text preceding the reference, e.g. `Change-Id: `.
    pub prefix: String,
    /// URL template; `<num>` is replaced by the reference.
    pub url: String,
    /// Title template; `<num>` is replaced by the reference.
    pub title: String,
    pub alphanumeric: bool,
    pub ignore_case: bool,
}

/// A reference found in text by an [`Autolink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutolinkMatch {
    pub reference: String,
    /// Byte range of prefix and reference in the searched text.
    pub range: Range<usize>,
    pub url: String,
    pub title: String,
}

impl Autolink {
    pub fn url_for(&self, reference: &str) -> String {
        self.url
            .replace("<num>", &urlencoding::encode(reference))
    }

    pub fn title_for(&self, reference: &str) -> String {
        self.title.replace("<num>", reference)
    }

    /// Find every reference in `text`.
    pub fn find_in(&self, text: &str) -> Result<Vec<AutolinkMatch>> {
        let token = if self.alphanumeric {
            "[A-Za-z0-9]+"
        } else {
            "[0-9]+"
        };
        let pattern = format!(
            r"(?:^|[\s(\[{{])({}({token}))\b",
            regex::escape(&self.prefix)
        );
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(self.ignore_case)
            .multi_line(true)
            .build()
            .with_context(|| format!("invalid autolink pattern for prefix `{}`", self.prefix))?;

        Ok(regex
            .captures_iter(text)
            .filter_map(|captures| {
                let whole = captures.get(1)?;
                let reference = captures.get(2)?.as_str();
                Some(AutolinkMatch {
                    reference: reference.to_owned(),
                    range: whole.range(),
                    url: self.url_for(reference),
                    title: self.title_for(reference),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change_id_link() -> Autolink {
        Autolink {
            prefix: "Change-Id: ".into(),
            url: "https://foo-review.example.com/q/<num>".into(),
            title: "Open Change #<num> on Gerrit".into(),
            alphanumeric: true,
            ignore_case: true,
        }
    }

    #[test]
    fn with_path_encodes_each_segment() {
        let base = Url::parse("https://example.com/project").unwrap();
        let url = with_path(&base, "+/refs/heads/feature/a b#1");
        assert_eq!(
            url.as_str(),
            "https://example.com/project/+/refs/heads/feature/a%20b%231"
        );
    }

    #[test]
    fn autolink_finds_change_ids_in_commit_messages() {
        let message = "Fix crash\n\nchange-id: I0123abcd\nChange-Id: Ideadbeef\n";
        let matches = change_id_link().find_in(message).unwrap();

        let references: Vec<_> = matches.iter().map(|m| m.reference.as_str()).collect();
        assert_eq!(references, ["I0123abcd", "Ideadbeef"]);
        assert_eq!(
            matches[1].url,
            "https://foo-review.example.com/q/Ideadbeef"
        );
        assert_eq!(matches[1].title, "Open Change #Ideadbeef on Gerrit");
        assert_eq!(&message[matches[1].range.clone()], "Change-Id: Ideadbeef");
    }

    #[test]
    fn autolink_requires_a_boundary_before_the_prefix() {
        let matches = change_id_link().find_in("XChange-Id: I1").unwrap();
        assert!(matches.is_empty());
    }
}
