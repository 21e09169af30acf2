//! Command dispatch.

use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use url::Url;

use crate::app::provider::ResolveOptions;
use crate::app::remotes::{DefaultRemoteStore, Remote, discover_remotes, find_remote};
use crate::app::repository::RepositoryService;
use crate::app::selector::{RemotePick, RemoteSelector, SelectOptions, UrlSink};
use crate::domain::errors::DomainError;
use crate::domain::model::RemoteResource;
use crate::infra::config::{Config, DEFAULT_WORKSPACE_CONFIG_PATH, global_config_path};
use crate::infra::git::GitClient;
use crate::infra::sink::{StdoutSink, SystemSink};
use crate::ui::cli::{Cli, Command, LinkArgs, print_completions};
use crate::ui::picker::{PickerKeys, TerminalPicker};

/// Loaded repository context shared by the repository-bound commands.
struct Workspace {
    repository: GitClient,
    config: Config,
    store: DefaultRemoteStore,
}

impl Workspace {
    fn open() -> Result<Self> {
        let cwd = std::env::current_dir().context("unable to determine working directory")?;
        let repository = GitClient::discover(&cwd)?;
        let config = Config::load()?;
        let store = DefaultRemoteStore::new(repository.root());
        Ok(Self {
            repository,
            config,
            store,
        })
    }

    fn remotes(&self) -> Result<Vec<Remote>> {
        discover_remotes(&self.repository, &self.config, &self.store)
    }
}

/// Entry point for the command-line interface.
pub struct UiApp {
    cli: Cli,
}

impl UiApp {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub fn run(self) -> Result<()> {
        match self.cli.command {
            Command::Open(args) => link(args, false),
            Command::Copy(args) => link(args, true),
            Command::Resolve { url, no_validate } => resolve(&url, no_validate),
            Command::Remotes => list_remotes(),
            Command::SetDefault { remote } => set_default(&remote),
            Command::Autolinks { text } => autolinks(text),
            Command::Completions { shell } => {
                print_completions(shell);
                Ok(())
            }
        }
    }
}

fn link(args: LinkArgs, clipboard: bool) -> Result<()> {
    let workspace = Workspace::open()?;
    let mut remotes = workspace.remotes()?;
    if let Some(name) = args.remote.as_deref() {
        let remote = find_remote(&mut remotes, name)?.clone();
        remotes = vec![remote];
    }

    let file_name = match args.resource.path() {
        Some(path) => {
            let cwd = std::env::current_dir().context("unable to determine working directory")?;
            Some(repo_relative(workspace.repository.root(), &cwd, path)?)
        }
        None => None,
    };
    let pr_remote = remotes
        .first()
        .map(|remote| remote.name().to_owned())
        .unwrap_or_else(|| "origin".to_owned());
    let resource = args.resource.into_resource(file_name, &pr_remote);

    let defaults = &workspace.config.defaults;
    let options = SelectOptions {
        auto_pick: args.auto_pick.unwrap_or(defaults.auto_pick),
        clipboard,
        set_default: defaults.set_default && !args.no_set_default,
    };
    let (title, placeholder) = prompts(&resource, clipboard);

    let keys = PickerKeys::from_config(&workspace.config.keybindings)?;
    let mut picker = TerminalPicker::new(keys);
    let pick = RemoteSelector::new(&mut picker, &workspace.store).select(
        &title,
        &placeholder,
        &resource,
        &remotes,
        options,
    )?;

    let action = match pick {
        None => {
            tracing::debug!("remote selection cancelled");
            return Ok(());
        }
        Some(RemotePick::ConfigureProvider) => {
            let global = global_config_path()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "the global config".to_owned());
            eprintln!(
                "No remote provider found. Add a [[providers]] entry to {global} or {DEFAULT_WORKSPACE_CONFIG_PATH}."
            );
            return Ok(());
        }
        Some(RemotePick::Remote(action)) => action,
    };

    let mut sink: Box<dyn UrlSink> = if args.print {
        Box::new(StdoutSink)
    } else {
        Box::new(SystemSink::new())
    };
    let url = action.execute(&workspace.repository, sink.as_mut())?;
    let Some(url) = url else {
        return Err(DomainError::UnsupportedResource {
            provider: action.remote().provider().name(),
            resource: action.resource().kind(),
        }
        .into());
    };
    if action.clipboard() && !args.print {
        eprintln!("Copied {url}");
    }
    Ok(())
}

fn prompts(resource: &RemoteResource, clipboard: bool) -> (String, String) {
    let noun = match resource {
        RemoteResource::Branch { .. } => "Branch",
        RemoteResource::Branches => "Branches",
        RemoteResource::Commit { .. } => "Commit",
        RemoteResource::Comparison { .. } => "Comparison",
        RemoteResource::CreatePullRequest { .. } => "Pull Request",
        RemoteResource::File { .. } | RemoteResource::Revision { .. } => "File",
        RemoteResource::Repo => "Repository",
        RemoteResource::Tag { .. } => "Tag",
    };
    if clipboard {
        (
            format!("Copy Remote {noun} Url"),
            format!("Choose which remote to copy the {} url from", noun.to_lowercase()),
        )
    } else {
        (
            format!("Open {noun} on Remote"),
            format!("Choose which remote to open the {} on", noun.to_lowercase()),
        )
    }
}

/// Express `path` (relative to `cwd`, or absolute) relative to the repository root.
fn repo_relative(root: &Path, cwd: &Path, path: &str) -> Result<String> {
    let cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
    let candidate = cwd.join(path);
    let absolute = candidate.canonicalize().unwrap_or(candidate);
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let relative = absolute
        .strip_prefix(&root)
        .with_context(|| format!("{path} is outside the repository"))?;
    let segments: Vec<_> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect();
    Ok(segments.join("/"))
}

fn resolve(url: &str, no_validate: bool) -> Result<()> {
    let workspace = Workspace::open()?;
    let parsed = Url::parse(url).with_context(|| format!("invalid url: {url}"))?;
    let options = ResolveOptions {
        validate: workspace.config.defaults.validate && !no_validate,
    };

    for remote in workspace.remotes()? {
        if let Some(location) =
            remote
                .provider()
                .resolve_incoming_url(&workspace.repository, &parsed, options)?
        {
            tracing::debug!(remote = remote.name(), "resolved url");
            println!("{location}");
            return Ok(());
        }
    }
    bail!("no local location for {url}")
}

fn list_remotes() -> Result<()> {
    let workspace = Workspace::open()?;
    for remote in workspace.remotes()? {
        let marker = if remote.is_default() { "*" } else { " " };
        println!(
            "{marker} {}\t{}\t{}\t{}",
            remote.name(),
            remote.provider().name(),
            remote.provider().url_for_repo(),
            remote.url()
        );
    }
    Ok(())
}

fn set_default(name: &str) -> Result<()> {
    let workspace = Workspace::open()?;
    let mut remotes = workspace.remotes()?;
    let remote = find_remote(&mut remotes, name)?;
    remote.set_as_default(&workspace.store, true)?;
    println!(
        "Default remote for {} set to {name}",
        remote.repo_path().display()
    );
    Ok(())
}

fn autolinks(text: Vec<String>) -> Result<()> {
    let text = if text.is_empty() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read message from stdin")?;
        buffer
    } else {
        text.join(" ")
    };

    let workspace = Workspace::open()?;
    let remotes = workspace.remotes()?;
    let Some(remote) = remotes.first() else {
        bail!("no remote with a recognised provider");
    };
    for autolink in remote.provider().autolinks() {
        for found in autolink.find_in(&text)? {
            println!("{}\t{}\t{}", found.reference, found.url, found.title);
        }
    }
    Ok(())
}
