//! Configuration management utilities.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::model::AutoPick;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
pub static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".remotelinks/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Config {
    pub defaults: Defaults,
    pub providers: Vec<ProviderSettings>,
    pub keybindings: Keybindings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Defaults {
    pub auto_pick: AutoPick,
    pub protocol: String,
    pub validate: bool,
    pub set_default: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            auto_pick: AutoPick::default(),
            protocol: "https".into(),
            validate: true,
            set_default: true,
        }
    }
}

/// A user-configured provider matched against git remote hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider family, `gerrit` or `google-source`.
    #[serde(rename = "type")]
    pub kind: String,
    pub domain: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keybindings {
    pub up: String,
    pub down: String,
    pub accept: String,
    pub dismiss: String,
    pub set_default: String,
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            up: "k".into(),
            down: "j".into(),
            accept: "enter".into(),
            dismiss: "esc".into(),
            set_default: "ctrl+d".into(),
        }
    }
}

/// One config file as written. Unset keys fall through to the layer below.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigLayer {
    #[serde(default)]
    defaults: DefaultsLayer,
    #[serde(default)]
    providers: Vec<ProviderSettings>,
    #[serde(default)]
    keybindings: KeybindingsLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DefaultsLayer {
    auto_pick: Option<AutoPick>,
    protocol: Option<String>,
    validate: Option<bool>,
    set_default: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct KeybindingsLayer {
    up: Option<String>,
    down: Option<String>,
    accept: Option<String>,
    dismiss: Option<String>,
    set_default: Option<String>,
}

impl ConfigLayer {
    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse TOML config")
    }

    fn merge(self, overlay: Self) -> Self {
        Self {
            defaults: DefaultsLayer {
                auto_pick: overlay.defaults.auto_pick.or(self.defaults.auto_pick),
                protocol: overlay.defaults.protocol.or(self.defaults.protocol),
                validate: overlay.defaults.validate.or(self.defaults.validate),
                set_default: overlay.defaults.set_default.or(self.defaults.set_default),
            },
            providers: merge_providers(self.providers, overlay.providers),
            keybindings: KeybindingsLayer {
                up: overlay.keybindings.up.or(self.keybindings.up),
                down: overlay.keybindings.down.or(self.keybindings.down),
                accept: overlay.keybindings.accept.or(self.keybindings.accept),
                dismiss: overlay.keybindings.dismiss.or(self.keybindings.dismiss),
                set_default: overlay.keybindings.set_default.or(self.keybindings.set_default),
            },
        }
    }

    fn resolve(self) -> Config {
        let defaults = Defaults::default();
        let keys = Keybindings::default();
        Config {
            defaults: Defaults {
                auto_pick: self.defaults.auto_pick.unwrap_or(defaults.auto_pick),
                protocol: self.defaults.protocol.unwrap_or(defaults.protocol),
                validate: self.defaults.validate.unwrap_or(defaults.validate),
                set_default: self.defaults.set_default.unwrap_or(defaults.set_default),
            },
            providers: self.providers,
            keybindings: Keybindings {
                up: self.keybindings.up.unwrap_or(keys.up),
                down: self.keybindings.down.unwrap_or(keys.down),
                accept: self.keybindings.accept.unwrap_or(keys.accept),
                dismiss: self.keybindings.dismiss.unwrap_or(keys.dismiss),
                set_default: self.keybindings.set_default.unwrap_or(keys.set_default),
            },
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    auto_pick: Option<String>,
    protocol: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            auto_pick: env::var("REMOTELINKS_AUTO_PICK").ok(),
            protocol: env::var("REMOTELINKS_PROTOCOL").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(auto_pick: &str, protocol: &str) -> Self {
        Self {
            auto_pick: Some(auto_pick.to_owned()),
            protocol: Some(protocol.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers = vec![ConfigLayer::from_str(&DEFAULT_CONFIG)?];

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(ConfigLayer::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(ConfigLayer::from_file(&workspace_path)?);
        }

        let merged = layers
            .into_iter()
            .reduce(ConfigLayer::merge)
            .unwrap_or_default()
            .resolve();
        apply_env_overrides(merged, env_overrides)
    }
}

/// Overlay providers come first and shadow base entries for the same domain.
fn merge_providers(
    base: Vec<ProviderSettings>,
    overlay: Vec<ProviderSettings>,
) -> Vec<ProviderSettings> {
    let mut seen = HashSet::new();
    overlay
        .into_iter()
        .chain(base)
        .filter(|provider| seen.insert(provider.domain.to_ascii_lowercase()))
        .collect()
}

pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("remotelinks/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(auto_pick) = env.auto_pick {
        config.defaults.auto_pick = auto_pick
            .parse::<AutoPick>()
            .context("invalid REMOTELINKS_AUTO_PICK")?;
    }
    if let Some(protocol) = env.protocol {
        config.defaults.protocol = protocol;
    }
    Ok(config)
}
