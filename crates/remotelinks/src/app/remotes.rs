//! Remote discovery, provider detection, and default-remote persistence.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::gerrit::{GerritFlavor, GerritProvider};
use crate::app::provider::RemoteProvider;
use crate::app::repository::RepositoryService;
use crate::domain::errors::DomainError;
use crate::domain::model::{Protocol, ProviderConfig};
use crate::infra::config::{Config, ProviderSettings};

const STATE_DIR: &str = ".remotelinks";
const STATE_FILE: &str = "state.json";

static SCP_LIKE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-zA-Z\-_.]+@[^/:]+:").expect("valid scp-like url regex"));

/// A git remote paired with the provider that hosts it.
#[derive(Debug, Clone)]
pub struct Remote {
    name: String,
    repo_path: PathBuf,
    url: String,
    provider: Arc<dyn RemoteProvider>,
    default: bool,
}

impl Remote {
    pub fn new(
        name: impl Into<String>,
        repo_path: impl Into<PathBuf>,
        url: impl Into<String>,
        provider: Arc<dyn RemoteProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            repo_path: repo_path.into(),
            url: url.into(),
            provider,
            default: false,
        }
    }

    pub fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root of the working tree the remote belongs to.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Fetch URL as configured in git.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn provider(&self) -> &dyn RemoteProvider {
        self.provider.as_ref()
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    /// Flag (or unflag) this remote as the repository default and persist the choice.
    pub fn set_as_default(&mut self, store: &DefaultRemoteStore, value: bool) -> Result<()> {
        let name = value.then_some(self.name.as_str());
        store.set_default_remote(name)?;
        self.default = value;
        tracing::debug!(
            remote = %self.name,
            repo = %self.repo_path.display(),
            default = value,
            "updated default remote"
        );
        Ok(())
    }
}

/// Persisted per-repository state.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RemoteState {
    pub default_remote: Option<String>,
}

/// Persists the default remote to `.remotelinks/state.json` under the repository root.
#[derive(Debug)]
pub struct DefaultRemoteStore {
    root: PathBuf,
    path: PathBuf,
    cached: Mutex<Option<RemoteState>>,
}

impl DefaultRemoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let path = root.join(STATE_DIR).join(STATE_FILE);
        Self {
            root,
            path,
            cached: Mutex::new(None),
        }
    }

    pub fn load(&self) -> Result<RemoteState> {
        let mut cached = self.cached.lock();
        if let Some(state) = cached.as_ref() {
            return Ok(state.clone());
        }

        let state = if self.path.exists() {
            let data = fs::read_to_string(&self.path)
                .with_context(|| format!("failed to read state file at {}", self.path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("invalid state data in {}", self.path.display()))?
        } else {
            RemoteState::default()
        };

        *cached = Some(state.clone());
        Ok(state)
    }

    pub fn default_remote(&self) -> Result<Option<String>> {
        Ok(self.load()?.default_remote)
    }

    pub fn set_default_remote(&self, name: Option<&str>) -> Result<()> {
        let mut state = self.load()?;
        state.default_remote = name.map(str::to_owned);

        let dir = self.path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create state directory {}", dir.display()))?;
        let data =
            serde_json::to_string_pretty(&state).context("failed to serialize remote state")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write state file to {}", self.path.display()))?;

        *self.cached.lock() = Some(state);
        Ok(())
    }
}

/// Host and project extracted from a git remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRemoteUrl {
    pub scheme: String,
    /// Host, with the port kept only for http(s) remotes.
    pub domain: String,
    pub path: String,
}

/// Parse `https://host/a/project`, `ssh://user@host:29418/project` or
/// `user@host:project.git`.
pub fn parse_remote_url(remote_url: &str) -> Option<ParsedRemoteUrl> {
    let remote_url = remote_url.trim();
    let url = if SCP_LIKE_URL.is_match(remote_url) {
        Url::parse(&format!("ssh://{}", remote_url.replacen(':', "/", 1))).ok()?
    } else {
        Url::parse(remote_url).ok()?
    };

    let host = url.host_str()?;
    let scheme = url.scheme().to_owned();
    let domain = match (scheme.as_str(), url.port()) {
        ("http" | "https", Some(port)) => format!("{host}:{port}"),
        _ => host.to_owned(),
    };
    let path = url.path().trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path).to_owned();

    Some(ParsedRemoteUrl {
        scheme,
        domain,
        path,
    })
}

/// Pick a provider for a remote: user-configured providers first, then known hosts.
pub fn provider_for_remote(
    remote_url: &str,
    settings: &[ProviderSettings],
    default_protocol: Protocol,
) -> Result<Option<Arc<dyn RemoteProvider>>> {
    let Some(parsed) = parse_remote_url(remote_url) else {
        tracing::debug!(url = remote_url, "unparseable remote url");
        return Ok(None);
    };
    let host = parsed
        .domain
        .split(':')
        .next()
        .unwrap_or(&parsed.domain)
        .to_ascii_lowercase();

    if let Some(custom) = settings.iter().find(|custom| {
        let domain = custom.domain.to_ascii_lowercase();
        domain == parsed.domain.to_ascii_lowercase() || domain == host
    }) {
        let flavor = flavor_for_kind(&custom.kind)?;
        let protocol = match custom.protocol.as_deref() {
            Some(protocol) => protocol.parse::<Protocol>()?,
            None => default_protocol,
        };
        let config = ProviderConfig::new(
            custom.domain.clone(),
            parsed.path,
            protocol,
            custom.name.clone(),
            true,
        )?;
        return Ok(Some(Arc::new(GerritProvider::new(config, flavor)?)));
    }

    let flavor = if host.ends_with(".googlesource.com") || host == "googlesource.com" {
        GerritFlavor::GoogleSource
    } else if host == "gerrithub.io" || host.ends_with(".gerrithub.io") || host.contains("gerrit")
    {
        GerritFlavor::Gerrit
    } else {
        tracing::debug!(host = %host, "no provider matches remote host");
        return Ok(None);
    };

    let protocol = if parsed.scheme == "http" {
        Protocol::Http
    } else {
        default_protocol
    };
    let domain = if parsed.scheme.starts_with("http") {
        parsed.domain
    } else {
        host
    };
    let config = ProviderConfig::new(domain, parsed.path, protocol, None, false)?;
    Ok(Some(Arc::new(GerritProvider::new(config, flavor)?)))
}

fn flavor_for_kind(kind: &str) -> Result<GerritFlavor, DomainError> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "gerrit" => Ok(GerritFlavor::Gerrit),
        "google-source" | "googlesource" => Ok(GerritFlavor::GoogleSource),
        other => Err(DomainError::UnknownProviderType(other.to_owned())),
    }
}

/// Build remotes for every git remote whose host has a known provider.
///
/// The default remote sorts first, then `origin`, then the rest by name.
pub fn discover_remotes(
    repository: &dyn RepositoryService,
    config: &Config,
    store: &DefaultRemoteStore,
) -> Result<Vec<Remote>> {
    let default_protocol: Protocol = config
        .defaults
        .protocol
        .parse::<Protocol>()
        .context("invalid default protocol")?;
    let default_remote = store.default_remote()?;

    let mut remotes = Vec::new();
    for record in repository.remotes()? {
        let Some(provider) = provider_for_remote(&record.url, &config.providers, default_protocol)
            .with_context(|| format!("failed to configure provider for remote {}", record.name))?
        else {
            continue;
        };
        let is_default = default_remote.as_deref() == Some(record.name.as_str());
        remotes.push(
            Remote::new(record.name, repository.root(), record.url, provider)
                .with_default(is_default),
        );
    }

    remotes.sort_by(|a, b| {
        b.is_default()
            .cmp(&a.is_default())
            .then_with(|| (b.name() == "origin").cmp(&(a.name() == "origin")))
            .then_with(|| a.name().cmp(b.name()))
    });
    Ok(remotes)
}

/// Find a remote by name.
pub fn find_remote<'a>(remotes: &'a mut [Remote], name: &str) -> Result<&'a mut Remote, DomainError> {
    remotes
        .iter_mut()
        .find(|remote| remote.name() == name)
        .ok_or_else(|| DomainError::UnknownRemote(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::FakeRepository;

    fn gerrit_settings() -> Vec<ProviderSettings> {
        vec![ProviderSettings {
            kind: "gerrit".into(),
            domain: "git.corp.example".into(),
            protocol: Some("http".into()),
            name: Some("Corp".into()),
        }]
    }

    #[test]
    fn parses_common_remote_url_shapes() {
        let https = parse_remote_url("https://foo.googlesource.com/a/platform/build.git").unwrap();
        assert_eq!(https.domain, "foo.googlesource.com");
        assert_eq!(https.path, "a/platform/build");

        let ssh = parse_remote_url("ssh://jane@review.example.com:29418/tools/repo").unwrap();
        assert_eq!(ssh.domain, "review.example.com");
        assert_eq!(ssh.path, "tools/repo");

        let scp = parse_remote_url("git@gerrit.example.com:team/app.git").unwrap();
        assert_eq!(scp.scheme, "ssh");
        assert_eq!(scp.domain, "gerrit.example.com");
        assert_eq!(scp.path, "team/app");

        let port = parse_remote_url("http://localhost:8080/proj").unwrap();
        assert_eq!(port.domain, "localhost:8080");

        assert!(parse_remote_url("not a url").is_none());
    }

    #[test]
    fn detects_known_gerrit_hosts() {
        let provider =
            provider_for_remote("https://chromium.googlesource.com/a/chromium/src", &[], Protocol::Https)
                .unwrap()
                .unwrap();
        assert_eq!(provider.id(), "google-source");
        assert_eq!(provider.config().path(), "chromium/src");
        assert!(!provider.config().is_custom());

        let provider =
            provider_for_remote("ssh://me@review.gerrithub.io:29418/org/repo", &[], Protocol::Https)
                .unwrap()
                .unwrap();
        assert_eq!(provider.id(), "gerrit");
        assert_eq!(provider.config().domain(), "review.gerrithub.io");

        assert!(
            provider_for_remote("https://github.com/org/repo.git", &[], Protocol::Https)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn custom_providers_take_precedence() {
        let provider = provider_for_remote(
            "git@git.corp.example:platform/tools.git",
            &gerrit_settings(),
            Protocol::Https,
        )
        .unwrap()
        .unwrap();
        assert!(provider.config().is_custom());
        assert_eq!(provider.config().protocol(), Protocol::Http);
        assert_eq!(provider.name(), "Corp");
        assert_eq!(
            provider.url_for_repo().as_str(),
            "http://git.corp.example/platform/tools"
        );
    }

    #[test]
    fn unknown_custom_kind_is_an_error() {
        let settings = vec![ProviderSettings {
            kind: "forgejo".into(),
            domain: "git.corp.example".into(),
            protocol: None,
            name: None,
        }];
        let result = provider_for_remote("https://git.corp.example/x", &settings, Protocol::Https);
        assert!(result.is_err());
    }

    #[test]
    fn discovers_and_orders_remotes() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = DefaultRemoteStore::new(temp.path());
        store.set_default_remote(Some("upstream"))?;

        let repository = FakeRepository::new(temp.path())
            .with_remote("origin", "https://foo.googlesource.com/proj")
            .with_remote("github", "https://github.com/org/proj.git")
            .with_remote("mirror", "https://gerrit.example.com/proj")
            .with_remote("upstream", "https://bar.googlesource.com/proj");

        let remotes = discover_remotes(&repository, &Config::default(), &store)?;
        let names: Vec<_> = remotes.iter().map(Remote::name).collect();
        assert_eq!(names, ["upstream", "origin", "mirror"]);
        assert!(remotes[0].is_default());
        assert!(!remotes[1].is_default());
        assert!(remotes.iter().all(|remote| remote.repo_path() == temp.path()));
        assert_eq!(remotes[1].url(), "https://foo.googlesource.com/proj");
        Ok(())
    }

    #[test]
    fn default_remote_round_trips_through_store() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = DefaultRemoteStore::new(temp.path());
        assert_eq!(store.default_remote()?, None);

        let provider =
            provider_for_remote("https://foo.googlesource.com/proj", &[], Protocol::Https)?
                .context("provider")?;
        let mut remote = Remote::new(
            "origin",
            temp.path(),
            "https://foo.googlesource.com/proj",
            provider,
        );
        remote.set_as_default(&store, true)?;
        assert!(remote.is_default());

        let reopened = DefaultRemoteStore::new(temp.path());
        assert_eq!(reopened.default_remote()?, Some("origin".into()));

        remote.set_as_default(&reopened, false)?;
        assert_eq!(DefaultRemoteStore::new(temp.path()).default_remote()?, None);
        Ok(())
    }

    #[test]
    fn find_remote_reports_unknown_names() {
        let mut remotes: Vec<Remote> = Vec::new();
        assert_eq!(
            find_remote(&mut remotes, "origin").unwrap_err(),
            DomainError::UnknownRemote("origin".into())
        );
    }
}
