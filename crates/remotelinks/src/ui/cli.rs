//! Command-line definitions.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};

use crate::domain::model::{AutoPick, LineRange, PullRequestRef, RemoteResource};

/// Open, copy, and resolve Gerrit and Google Source links for the current repository.
#[derive(Parser, Debug)]
#[command(name = "remotelinks", version, about, long_about = None)]
pub struct Cli {
    /// Log debug details to stderr.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a resource on a remote in the browser.
    Open(LinkArgs),

    /// Copy the URL of a resource on a remote to the clipboard.
    Copy(LinkArgs),

    /// Map a provider URL back to a local file.
    Resolve {
        url: String,

        /// Accept paths that do not exist locally and skip the project check.
        #[arg(long)]
        no_validate: bool,
    },

    /// List remotes with a recognised provider.
    Remotes,

    /// Make a remote the default for this repository.
    SetDefault { remote: String },

    /// Expand Change-Id references in a commit message (reads stdin when empty).
    Autolinks { text: Vec<String> },

    /// Generate shell completions.
    Completions { shell: Shell },
}

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// When to skip the picker: default, single or never.
    #[arg(long)]
    pub auto_pick: Option<AutoPick>,

    /// Hide the set-as-default button in the picker.
    #[arg(long)]
    pub no_set_default: bool,

    /// Print the URL instead of opening or copying it.
    #[arg(long)]
    pub print: bool,

    /// Use this remote instead of choosing one.
    #[arg(long)]
    pub remote: Option<String>,

    #[command(subcommand)]
    pub resource: ResourceArg,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ResourceArg {
    /// A file, optionally at a branch or commit.
    File {
        path: String,

        /// Line or range, e.g. `12` or `12-20`.
        #[arg(long)]
        lines: Option<LineRange>,

        #[arg(long)]
        branch: Option<String>,

        #[arg(long, conflicts_with = "branch")]
        sha: Option<String>,
    },
    Commit { sha: String },
    Branch { name: String },
    /// The branch list of the project.
    Branches,
    Tag { name: String },
    /// A comparison between two refs.
    Compare { base: String, compare: String },
    /// A new pull request from `compare`.
    Pr {
        compare: String,

        /// Target branch; the remote's default branch when omitted.
        #[arg(long)]
        base: Option<String>,
    },
    /// The project home page.
    Repo,
}

impl ResourceArg {
    /// Build the resource. `file_name` replaces the file argument once it has been made
    /// repository-relative; `remote` names the remote pull request refs live on.
    pub fn into_resource(self, file_name: Option<String>, remote: &str) -> RemoteResource {
        match self {
            ResourceArg::File {
                path,
                lines,
                branch,
                sha,
            } => {
                let file_name = file_name.unwrap_or(path);
                match sha {
                    Some(sha) => RemoteResource::Revision {
                        file_name,
                        sha,
                        branch_or_tag: branch,
                        range: lines,
                    },
                    None => RemoteResource::File {
                        file_name,
                        branch_or_tag: branch,
                        range: lines,
                    },
                }
            }
            ResourceArg::Commit { sha } => RemoteResource::Commit { sha },
            ResourceArg::Branch { name } => RemoteResource::Branch { branch: name },
            ResourceArg::Branches => RemoteResource::Branches,
            ResourceArg::Tag { name } => RemoteResource::Tag { tag: name },
            ResourceArg::Compare { base, compare } => RemoteResource::Comparison { base, compare },
            ResourceArg::Pr { compare, base } => RemoteResource::CreatePullRequest {
                base: PullRequestRef {
                    branch: base,
                    remote: remote.to_owned(),
                },
                compare: PullRequestRef {
                    branch: Some(compare),
                    remote: remote.to_owned(),
                },
            },
            ResourceArg::Repo => RemoteResource::Repo,
        }
    }

    /// The file argument, for resources that name one.
    pub fn path(&self) -> Option<&str> {
        match self {
            ResourceArg::File { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Write completions for `shell` to stdout.
pub fn print_completions(shell: Shell) {
    let mut command = Cli::command();
    generate(shell, &mut command, "remotelinks", &mut std::io::stdout());
}
