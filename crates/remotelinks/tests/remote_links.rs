use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use url::Url;

use remotelinks::app::gerrit::{GerritFlavor, GerritProvider};
use remotelinks::app::provider::{RemoteProvider, ResolveOptions};
use remotelinks::app::remotes::{DefaultRemoteStore, discover_remotes};
use remotelinks::app::repository::RepositoryService;
use remotelinks::app::selector::{
    ItemButton, PickRequest, Picker, PickerEvent, PickerSession, RemotePick, RemoteSelector,
    SelectOptions, UrlSink,
};
use remotelinks::domain::model::{
    AutoPick, BranchRef, LineRange, Protocol, ProviderConfig, RemoteRecord, RemoteResource,
    TagRef,
};
use remotelinks::infra::config::Config;

/// A checkout of `platform/build` with a couple of branches and tags.
struct Checkout {
    root: PathBuf,
    files: HashSet<&'static str>,
}

impl Checkout {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            files: HashSet::from(["core/main.mk", "docs/README.md", "tools/lint.py"]),
        }
    }
}

impl RepositoryService for Checkout {
    fn root(&self) -> &Path {
        &self.root
    }

    fn branches(&self) -> Result<Vec<BranchRef>> {
        Ok(["origin/main", "origin/release", "origin/release/14", "main"]
            .into_iter()
            .map(|name| BranchRef {
                name: name.to_owned(),
                remote: name.starts_with("origin/"),
                sha: Some("0123456789abcdef0123456789abcdef01234567".to_owned()),
            })
            .collect())
    }

    fn tags(&self) -> Result<Vec<TagRef>> {
        Ok(vec![TagRef {
            name: "android-14.0.0_r1".into(),
            sha: None,
        }])
    }

    fn to_absolute_path(&self, relative: &str, validate: bool) -> Result<Option<PathBuf>> {
        if validate && !self.files.contains(relative) {
            return Ok(None);
        }
        Ok(Some(self.root.join(relative)))
    }

    fn default_branch_name(&self, remote: &str) -> Result<Option<String>> {
        Ok(Some(format!("{remote}/main")))
    }

    fn resolve_ref(&self, _name: &str) -> Result<Option<String>> {
        Err(anyhow!("not needed"))
    }

    fn remotes(&self) -> Result<Vec<RemoteRecord>> {
        Ok(vec![
            RemoteRecord {
                name: "aosp".into(),
                url: "https://android.googlesource.com/platform/build".into(),
            },
            RemoteRecord {
                name: "origin".into(),
                url: "ssh://dev@gerrit.example.org:29418/platform/build".into(),
            },
        ])
    }
}

fn provider() -> GerritProvider {
    let config = ProviderConfig::new(
        "android.googlesource.com",
        "platform/build",
        Protocol::Https,
        None,
        false,
    )
    .expect("valid config");
    GerritProvider::new(config, GerritFlavor::GoogleSource).expect("valid provider")
}

fn resolve(checkout: &Checkout, url: &str) -> Result<Option<String>> {
    let url = Url::parse(url)?;
    let location = provider().resolve_incoming_url(checkout, &url, ResolveOptions::default())?;
    Ok(location.map(|location| {
        let relative = location
            .path
            .strip_prefix(&checkout.root)
            .expect("inside root")
            .to_string_lossy()
            .replace('\\', "/");
        match location.start_line {
            Some(line) => format!("{relative}:{line}"),
            None => relative,
        }
    }))
}

#[test]
fn builder_urls_resolve_back_to_the_checkout() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let checkout = Checkout::new(temp.path());
    let provider = provider();

    let by_branch = provider.url_for_file(
        "tools/lint.py",
        Some("release/14"),
        None,
        Some(LineRange::new(7, 9)),
    );
    assert_eq!(
        by_branch.as_str(),
        "https://android.googlesource.com/platform/build/+/refs/heads/release/14/tools/lint.py#7"
    );
    assert_eq!(
        resolve(&checkout, by_branch.as_str())?.as_deref(),
        Some("tools/lint.py:7")
    );

    let at_head = provider.url_for_file("core/main.mk", None, None, None);
    assert_eq!(resolve(&checkout, at_head.as_str())?.as_deref(), Some("core/main.mk"));
    Ok(())
}

#[test]
fn tags_and_foreign_urls() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let checkout = Checkout::new(temp.path());

    assert_eq!(
        resolve(
            &checkout,
            "https://android.googlesource.com/platform/build/+/refs/tags/android-14.0.0_r1/docs/README.md#notes"
        )?
        .as_deref(),
        Some("docs/README.md")
    );
    assert_eq!(
        resolve(
            &checkout,
            "https://android.googlesource.com/platform/other/+/refs/heads/main/core/main.mk"
        )?,
        None
    );
    assert_eq!(
        resolve(
            &checkout,
            "https://example.com/platform/build/+/refs/heads/main/core/main.mk"
        )?,
        None
    );
    Ok(())
}

struct Script(Vec<PickerEvent>);

struct ScriptSession<'a>(&'a mut Vec<PickerEvent>);

impl Picker for Script {
    fn present(&mut self, request: PickRequest<'_>) -> Result<Box<dyn PickerSession + '_>> {
        assert_eq!(request.entries.len(), 2);
        assert!(request.entries.iter().all(|entry| entry.buttons == [ItemButton::SetDefault]));
        Ok(Box::new(ScriptSession(&mut self.0)))
    }
}

impl PickerSession for ScriptSession<'_> {
    fn next_event(&mut self) -> Result<PickerEvent> {
        self.0.pop().ok_or_else(|| anyhow!("no more events"))
    }
}

#[derive(Default)]
struct Opened(Vec<String>);

impl UrlSink for Opened {
    fn copy(&mut self, _text: &str) -> Result<()> {
        Err(anyhow!("unexpected copy"))
    }

    fn open(&mut self, url: &Url) -> Result<()> {
        self.0.push(url.to_string());
        Ok(())
    }
}

#[test]
fn chosen_default_remote_is_remembered() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let checkout = Checkout::new(temp.path());
    let store = DefaultRemoteStore::new(temp.path());
    let config = Config::default();
    let resource = RemoteResource::Branch {
        branch: "release/14".into(),
    };
    let options = SelectOptions {
        auto_pick: AutoPick::Default,
        clipboard: false,
        set_default: true,
    };

    let remotes = discover_remotes(&checkout, &config, &store)?;
    let names: Vec<_> = remotes.iter().map(|remote| remote.name()).collect();
    assert_eq!(names, ["origin", "aosp"]);

    let mut picker = Script(vec![PickerEvent::ButtonTriggered {
        index: 1,
        button: ItemButton::SetDefault,
    }]);
    let Some(RemotePick::Remote(action)) = RemoteSelector::new(&mut picker, &store).select(
        "Open Branch on Remote",
        "Choose which remote to open the branch on",
        &resource,
        &remotes,
        options,
    )?
    else {
        panic!("expected a remote");
    };
    let mut sink = Opened::default();
    action.execute(&checkout, &mut sink)?;
    assert_eq!(
        sink.0,
        ["https://android.googlesource.com/platform/build/+/refs/heads/release/14"]
    );

    let remotes = discover_remotes(&checkout, &config, &store)?;
    assert_eq!(remotes[0].name(), "aosp");
    assert!(remotes[0].is_default());

    let mut untouched = Script(Vec::new());
    let pick = RemoteSelector::new(&mut untouched, &store).select(
        "Open Branch on Remote",
        "Choose which remote to open the branch on",
        &resource,
        &remotes,
        options,
    )?;
    assert!(matches!(pick, Some(RemotePick::Remote(action)) if action.remote().name() == "aosp"));
    Ok(())
}
