//! Domain models for provider configuration, remote resources, and resolved locations.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::errors::DomainError;

/// URL scheme used to reach a hosting provider's web interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl FromStr for Protocol {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(DomainError::UnsupportedProtocol(other.to_owned())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of where a provider lives and which project it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    domain: String,
    path: String,
    protocol: Protocol,
    name: Option<String>,
    custom: bool,
}

impl ProviderConfig {
    /// Build a configuration, validating that `domain` is a usable host.
    ///
    /// Leading and trailing slashes are trimmed from `path` so that it can be joined
    /// directly onto the domain.
    pub fn new(
        domain: impl Into<String>,
        path: impl Into<String>,
        protocol: Protocol,
        name: Option<String>,
        custom: bool,
    ) -> Result<Self, DomainError> {
        let domain = domain.into().trim().trim_end_matches('/').to_owned();
        if domain.is_empty() || domain.contains('/') || domain.contains(char::is_whitespace) {
            return Err(DomainError::InvalidDomain(domain));
        }
        Url::parse(&format!("{}://{}/", protocol.as_str(), domain))
            .map_err(|_| DomainError::InvalidDomain(domain.clone()))?;

        let path = path.into().trim_matches('/').to_owned();

        Ok(Self {
            domain,
            path,
            protocol,
            name: name.filter(|name| !name.trim().is_empty()),
            custom,
        })
    }

    /// Host (and optional port) of the provider, e.g. `foo.example.com`.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Project identifier on the provider, e.g. `platform/build`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Display-name override configured by the user.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the provider came from user configuration rather than auto-detection.
    pub fn is_custom(&self) -> bool {
        self.custom
    }
}

/// How the remote selector may skip presenting the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoPick {
    /// Prefer the default remote when several exist, then pick a lone candidate.
    #[default]
    Default,
    /// Pick automatically only when exactly one remote exists.
    #[serde(alias = "always")]
    Single,
    /// Always present the list.
    #[serde(alias = "off")]
    Never,
}

impl FromStr for AutoPick {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(AutoPick::Default),
            "single" | "always" | "true" => Ok(AutoPick::Single),
            "never" | "off" | "false" => Ok(AutoPick::Never),
            other => Err(DomainError::InvalidAutoPick(other.to_owned())),
        }
    }
}

/// A range of lines in a file. Lines are kept exactly as supplied; URL anchors carry
/// the start line unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn single(line: u32) -> Self {
        Self {
            start: line,
            end: line,
        }
    }
}

impl FromStr for LineRange {
    type Err = DomainError;

    /// Parse `N` or `N-M`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidLineRange(value.to_owned());
        let parse = |part: &str| part.trim().parse::<u32>().map_err(|_| invalid());

        match value.split_once('-') {
            Some((start, end)) => Ok(Self::new(parse(start)?, parse(end)?)),
            None => Ok(Self::single(parse(value)?)),
        }
    }
}

/// Branch reference used when creating a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub branch: Option<String>,
    pub remote: String,
}

/// The thing a user wants a provider URL for.
///
/// Each variant carries only the fields that are meaningful for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResource {
    Branch {
        branch: String,
    },
    Branches,
    Commit {
        sha: String,
    },
    Comparison {
        base: String,
        compare: String,
    },
    CreatePullRequest {
        base: PullRequestRef,
        compare: PullRequestRef,
    },
    File {
        file_name: String,
        branch_or_tag: Option<String>,
        range: Option<LineRange>,
    },
    Repo,
    Revision {
        file_name: String,
        sha: String,
        branch_or_tag: Option<String>,
        range: Option<LineRange>,
    },
    Tag {
        tag: String,
    },
}

impl RemoteResource {
    /// Short label for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteResource::Branch { .. } => "branch",
            RemoteResource::Branches => "branches",
            RemoteResource::Commit { .. } => "commit",
            RemoteResource::Comparison { .. } => "comparison",
            RemoteResource::CreatePullRequest { .. } => "pull request",
            RemoteResource::File { .. } => "file",
            RemoteResource::Repo => "repository",
            RemoteResource::Revision { .. } => "revision",
            RemoteResource::Tag { .. } => "tag",
        }
    }
}

/// Local coordinates produced by reverse-resolving a provider URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub path: PathBuf,
    pub start_line: Option<u32>,
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start_line {
            Some(line) => write!(f, "{}:{line}", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// A branch known to the local repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    /// Short name, e.g. `main` or `origin/feature/x`.
    pub name: String,
    pub remote: bool,
    pub sha: Option<String>,
}

impl BranchRef {
    /// Name with the leading `<remote>/` removed for remote branches.
    pub fn name_without_remote(&self) -> &str {
        if !self.remote {
            return &self.name;
        }
        self.name
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.name)
    }
}

/// A tag known to the local repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub sha: Option<String>,
}

/// A configured git remote as recorded in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub name: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_config_trims_path_and_rejects_bad_domains() {
        let config =
            ProviderConfig::new("foo.example.com", "/platform/build/", Protocol::Https, None, false)
                .unwrap();
        assert_eq!(config.path(), "platform/build");
        assert_eq!(config.domain(), "foo.example.com");

        assert!(ProviderConfig::new("", "p", Protocol::Https, None, false).is_err());
        assert!(ProviderConfig::new("foo/bar", "p", Protocol::Https, None, false).is_err());
        assert!(ProviderConfig::new("foo bar", "p", Protocol::Https, None, false).is_err());
    }

    #[test]
    fn protocol_parses_case_insensitively() {
        assert_eq!("HTTP".parse::<Protocol>().unwrap(), Protocol::Http);
        assert!(matches!(
            "ftp".parse::<Protocol>(),
            Err(DomainError::UnsupportedProtocol(_))
        ));
    }

    #[test]
    fn auto_pick_accepts_boolean_spellings() {
        assert_eq!("true".parse::<AutoPick>().unwrap(), AutoPick::Single);
        assert_eq!("False".parse::<AutoPick>().unwrap(), AutoPick::Never);
        assert_eq!("default".parse::<AutoPick>().unwrap(), AutoPick::Default);
        assert!("sometimes".parse::<AutoPick>().is_err());
    }

    #[test]
    fn line_range_parses_single_and_reversed_ranges() {
        assert_eq!("12".parse::<LineRange>().unwrap(), LineRange::single(12));
        assert_eq!("9-3".parse::<LineRange>().unwrap(), LineRange::new(3, 9));
        assert!("x-3".parse::<LineRange>().is_err());
    }

    #[test]
    fn branch_name_without_remote_strips_first_segment_only() {
        let branch = BranchRef {
            name: "origin/feature/login".into(),
            remote: true,
            sha: None,
        };
        assert_eq!(branch.name_without_remote(), "feature/login");

        let local = BranchRef {
            name: "feature/login".into(),
            remote: false,
            sha: None,
        };
        assert_eq!(local.name_without_remote(), "feature/login");
    }
}
