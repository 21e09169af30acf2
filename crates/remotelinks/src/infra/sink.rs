//! Clipboard and browser integration.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};
use url::Url;

use crate::app::selector::UrlSink;

/// Copies to the system clipboard and opens URLs in the default browser, with
/// command-line fallbacks for headless environments.
pub struct SystemSink {
    clipboard: Option<arboard::Clipboard>,
}

impl SystemSink {
    pub fn new() -> Self {
        let clipboard = arboard::Clipboard::new().ok();
        Self { clipboard }
    }
}

impl Default for SystemSink {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlSink for SystemSink {
    fn copy(&mut self, text: &str) -> Result<()> {
        if let Some(clipboard) = self.clipboard.as_mut()
            && clipboard.set_text(text.to_owned()).is_ok()
        {
            return Ok(());
        }

        self.clipboard = None;
        for command in copy_commands() {
            if run_with_stdin(command, text).is_ok() {
                return Ok(());
            }
        }
        Err(anyhow!("failed to copy text to clipboard using available backends"))
    }

    fn open(&mut self, url: &Url) -> Result<()> {
        for command in open_commands() {
            match run(command, url.as_str()) {
                Ok(()) => return Ok(()),
                Err(err) => tracing::debug!(error = %err, "browser launcher failed"),
            }
        }
        Err(anyhow!("failed to open {url} in a browser"))
    }
}

/// Writes URLs to stdout; used with `--print`.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl UrlSink for StdoutSink {
    fn copy(&mut self, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }

    fn open(&mut self, url: &Url) -> Result<()> {
        println!("{url}");
        Ok(())
    }
}

fn run(command: &[&str], argument: &str) -> Result<()> {
    let (program, args) = command.split_first().context("launcher command missing program")?;
    let status = Command::new(program)
        .args(args)
        .arg(argument)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to spawn {program}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("{program} exited with status {status}"))
    }
}

fn run_with_stdin(command: &[&str], text: &str) -> Result<()> {
    let (program, args) = command
        .split_first()
        .context("clipboard command missing program")?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn clipboard command: {program}"))?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(text.as_bytes())
            .context("failed to write clipboard contents")?;
    }

    let status = child
        .wait()
        .with_context(|| format!("clipboard command did not exit cleanly: {program}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("clipboard command exited with status {status}"))
    }
}

#[cfg(target_os = "macos")]
fn copy_commands() -> Vec<&'static [&'static str]> {
    vec![&["pbcopy"]]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn copy_commands() -> Vec<&'static [&'static str]> {
    vec![&["xclip", "-selection", "clipboard"], &["wl-copy"]]
}

#[cfg(target_os = "windows")]
fn copy_commands() -> Vec<&'static [&'static str]> {
    vec![&["powershell.exe", "-NoProfile", "-Command", "Set-Clipboard"]]
}

#[cfg(not(any(unix, target_os = "windows")))]
fn copy_commands() -> Vec<&'static [&'static str]> {
    Vec::new()
}

#[cfg(target_os = "macos")]
fn open_commands() -> Vec<&'static [&'static str]> {
    vec![&["open"]]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn open_commands() -> Vec<&'static [&'static str]> {
    vec![&["xdg-open"], &["gio", "open"], &["sensible-browser"]]
}

#[cfg(target_os = "windows")]
fn open_commands() -> Vec<&'static [&'static str]> {
    vec![&["cmd", "/C", "start", ""]]
}

#[cfg(not(any(unix, target_os = "windows")))]
fn open_commands() -> Vec<&'static [&'static str]> {
    Vec::new()
}
