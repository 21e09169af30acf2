//! Choosing a remote for a resource and dispatching the copy/open action.

use anyhow::Result;
use url::Url;

use crate::app::remotes::{DefaultRemoteStore, Remote};
use crate::app::repository::RepositoryService;
use crate::domain::model::{AutoPick, PullRequestRef, RemoteResource};

/// Placeholder shown when no remote has a provider.
pub const NO_PROVIDERS_PLACEHOLDER: &str = "No auto-detected or configured remote providers found";

const CONFIGURE_LABEL: &str = "Configure custom remote provider...";

/// Providers whose file URLs cannot name arbitrary branches; file links to them are
/// pinned to the commit the branch or tag points at.
const COMMIT_PINNED_FILE_PROVIDERS: &[&str] = &["bitbucket", "bitbucket-server"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    pub auto_pick: AutoPick,
    /// Copy the URL instead of opening it.
    pub clipboard: bool,
    /// Offer the set-as-default button on each remote.
    pub set_default: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            auto_pick: AutoPick::Never,
            clipboard: false,
            set_default: true,
        }
    }
}

/// Item-scoped action buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemButton {
    SetDefault,
}

/// One row of the interactive list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerEntry {
    pub label: String,
    pub description: Option<String>,
    pub detail: Option<String>,
    pub buttons: Vec<ItemButton>,
}

#[derive(Debug, Clone, Copy)]
pub struct PickRequest<'a> {
    pub title: &'a str,
    pub placeholder: &'a str,
    pub entries: &'a [PickerEntry],
}

/// Events emitted by an open picker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerEvent {
    /// The user confirmed; `active` is the highlighted entry, if any.
    Accepted { active: Option<usize> },
    Dismissed,
    ButtonTriggered { index: usize, button: ItemButton },
}

/// An interactive list widget.
pub trait Picker {
    /// Show the list. The returned session releases the widget when dropped.
    fn present(&mut self, request: PickRequest<'_>) -> Result<Box<dyn PickerSession + '_>>;
}

pub trait PickerSession {
    /// Block until the user does something.
    fn next_event(&mut self) -> Result<PickerEvent>;
}

/// Where finished URLs go.
pub trait UrlSink {
    fn copy(&mut self, text: &str) -> Result<()>;
    fn open(&mut self, url: &Url) -> Result<()>;
}

/// The outcome of a selection.
#[derive(Debug, Clone)]
pub enum RemotePick {
    Remote(RemoteAction),
    /// No provider is configured; the caller should guide the user to configuration.
    ConfigureProvider,
}

impl RemotePick {
    fn entry(&self) -> PickerEntry {
        match self {
            RemotePick::Remote(action) => action.entry(),
            RemotePick::ConfigureProvider => PickerEntry {
                label: CONFIGURE_LABEL.to_owned(),
                description: None,
                detail: None,
                buttons: Vec::new(),
            },
        }
    }
}

/// Copy or open `resource` on one remote.
#[derive(Debug, Clone)]
pub struct RemoteAction {
    remote: Remote,
    resource: RemoteResource,
    clipboard: bool,
    buttons: Vec<ItemButton>,
}

impl RemoteAction {
    pub fn new(remote: Remote, resource: RemoteResource, clipboard: bool) -> Self {
        Self {
            remote,
            resource,
            clipboard,
            buttons: Vec::new(),
        }
    }

    fn with_buttons(mut self, buttons: Vec<ItemButton>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn remote(&self) -> &Remote {
        &self.remote
    }

    pub fn resource(&self) -> &RemoteResource {
        &self.resource
    }

    pub fn clipboard(&self) -> bool {
        self.clipboard
    }

    pub fn set_as_default(&mut self, store: &DefaultRemoteStore) -> Result<()> {
        self.remote.set_as_default(store, true)
    }

    /// The resource adjusted for this remote's provider.
    ///
    /// Default-branch and commit lookups are best effort: a failed lookup leaves the
    /// field as it was.
    pub fn prepare_resource(&self, repository: &dyn RepositoryService) -> RemoteResource {
        let remote = self.remote.name();
        match &self.resource {
            RemoteResource::Comparison { base, compare } => RemoteResource::Comparison {
                base: strip_remote(base, remote).to_owned(),
                compare: strip_remote(compare, remote).to_owned(),
            },
            RemoteResource::CreatePullRequest { base, compare } if base.branch.is_none() => {
                RemoteResource::CreatePullRequest {
                    base: PullRequestRef {
                        branch: self.default_branch(repository),
                        remote: base.remote.clone(),
                    },
                    compare: compare.clone(),
                }
            }
            RemoteResource::File {
                file_name,
                branch_or_tag: Some(reference),
                range,
            } if COMMIT_PINNED_FILE_PROVIDERS.contains(&self.remote.provider().id()) => {
                match lookup_commit(repository, reference) {
                    Some(sha) => RemoteResource::Revision {
                        file_name: file_name.clone(),
                        sha,
                        branch_or_tag: None,
                        range: *range,
                    },
                    None => self.resource.clone(),
                }
            }
            resource => resource.clone(),
        }
    }

    /// Build the provider URL, or `None` when the provider has no page for the resource.
    pub fn url(&self, repository: &dyn RepositoryService) -> Option<Url> {
        let resource = self.prepare_resource(repository);
        self.remote.provider().url_for_resource(&resource)
    }

    /// Copy or open the URL. Returns the URL that was dispatched.
    pub fn execute(
        &self,
        repository: &dyn RepositoryService,
        sink: &mut dyn UrlSink,
    ) -> Result<Option<Url>> {
        let Some(url) = self.url(repository) else {
            tracing::warn!(
                provider = %self.remote.provider().name(),
                resource = self.resource.kind(),
                "provider has no url for resource"
            );
            return Ok(None);
        };

        if self.clipboard {
            sink.copy(url.as_str())?;
        } else {
            sink.open(&url)?;
        }
        Ok(Some(url))
    }

    fn default_branch(&self, repository: &dyn RepositoryService) -> Option<String> {
        let remote = self.remote.name();
        let branch = repository
            .default_branch_name(remote)
            .unwrap_or_else(|err| {
                tracing::warn!(remote, error = %err, "default branch lookup failed");
                None
            })
            .or_else(|| {
                let provider = self.remote.provider();
                if !provider.has_api() {
                    return None;
                }
                provider
                    .default_branch()
                    .unwrap_or_else(|err| {
                        tracing::warn!(remote, error = %err, "provider default branch lookup failed");
                        None
                    })
                    .map(|name| format!("{remote}/{name}"))
            })?;
        Some(strip_remote(&branch, remote).to_owned())
    }

    fn entry(&self) -> PickerEntry {
        let verb = if self.clipboard {
            "Copy link to"
        } else {
            "Open"
        };
        let provider = self.remote.provider();
        let description = if self.remote.is_default() {
            format!("{} (default)", self.remote.name())
        } else {
            self.remote.name().to_owned()
        };
        let config = provider.config();
        PickerEntry {
            label: format!("{verb} {} on {}", self.resource.kind(), provider.name()),
            description: Some(description),
            detail: Some(format!("{}/{}", config.domain(), config.path())),
            buttons: self.buttons.clone(),
        }
    }
}

fn strip_remote<'a>(reference: &'a str, remote: &str) -> &'a str {
    reference
        .strip_prefix(remote)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(reference)
}

fn lookup_commit(repository: &dyn RepositoryService, reference: &str) -> Option<String> {
    repository.resolve_ref(reference).unwrap_or_else(|err| {
        tracing::warn!(reference, error = %err, "commit lookup failed");
        None
    })
}

/// Presents remotes for a resource and resolves the user's choice.
pub struct RemoteSelector<'a> {
    picker: &'a mut dyn Picker,
    store: &'a DefaultRemoteStore,
}

impl<'a> RemoteSelector<'a> {
    pub fn new(picker: &'a mut dyn Picker, store: &'a DefaultRemoteStore) -> Self {
        Self { picker, store }
    }

    /// Choose a remote for `resource`. Dismissing the list yields `Ok(None)`.
    pub fn select(
        &mut self,
        title: &str,
        placeholder: &str,
        resource: &RemoteResource,
        remotes: &[Remote],
        options: SelectOptions,
    ) -> Result<Option<RemotePick>> {
        let mut placeholder = placeholder;
        let mut picks: Vec<RemotePick> = if remotes.is_empty() {
            placeholder = NO_PROVIDERS_PLACEHOLDER;
            vec![RemotePick::ConfigureProvider]
        } else {
            let mut candidates: Vec<&Remote> = remotes.iter().collect();
            if options.auto_pick == AutoPick::Default
                && candidates.len() > 1
                && let Some(default) = remotes.iter().find(|remote| remote.is_default())
            {
                candidates = vec![default];
            }

            let buttons = if options.set_default {
                vec![ItemButton::SetDefault]
            } else {
                Vec::new()
            };
            candidates
                .into_iter()
                .map(|remote| {
                    RemotePick::Remote(
                        RemoteAction::new(remote.clone(), resource.clone(), options.clipboard)
                            .with_buttons(buttons.clone()),
                    )
                })
                .collect()
        };

        if options.auto_pick != AutoPick::Never && picks.len() == 1 {
            return Ok(picks.pop());
        }

        let entries: Vec<PickerEntry> = picks.iter().map(RemotePick::entry).collect();
        let mut session = self.picker.present(PickRequest {
            title,
            placeholder,
            entries: &entries,
        })?;

        loop {
            match session.next_event()? {
                PickerEvent::Dismissed => return Ok(None),
                PickerEvent::Accepted { active: Some(index) } if index < picks.len() => {
                    return Ok(Some(picks.swap_remove(index)));
                }
                PickerEvent::Accepted { .. } => {}
                PickerEvent::ButtonTriggered {
                    index,
                    button: ItemButton::SetDefault,
                } => {
                    if let Some(RemotePick::Remote(action)) = picks.get_mut(index)
                        && action.buttons.contains(&ItemButton::SetDefault)
                    {
                        action.set_as_default(self.store)?;
                        return Ok(Some(picks.swap_remove(index)));
                    }
                }
            }
        }
    }
}
