use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use folderstore_common::location::{parse_locations, Location};

use crate::git::GitSettings;

const ABOUT: &str = "git-lfs custom transfer adapter to store all data in a folder";

const AFTER_HELP: &str = "\
This tool should only be called by git-lfs as documented in Custom Transfers:
  https://github.com/git-lfs/git-lfs/blob/master/docs/custom-transfers.md

The arguments should be provided via gitconfig at lfs.customtransfer.<name>.args";

#[derive(Debug, Parser)]
#[command(name = "lfs-folderstore", version, about = ABOUT, after_help = AFTER_HELP)]
pub struct Cli {
    /// Base directory for the object store
    #[arg(value_name = "BASEDIR")]
    pub base_dir: Option<String>,

    /// Base directory for all file operations; overrides BASEDIR
    #[arg(short = 'd', long = "basedir", value_name = "DIR")]
    pub basedir_flag: Option<String>,

    /// Optional base directory for uploads; defaults to basedir
    #[arg(short = 'p', long = "pushdir", value_name = "DIR")]
    pub pushdir: Option<String>,

    /// Also perform transfers using LFS-provided actions (deprecated)
    #[arg(long)]
    pub useaction: bool,

    /// Allow fallback pulling from main LFS remote
    #[arg(long)]
    pub pullmain: bool,

    /// Also push to main LFS remote
    #[arg(long)]
    pub pushmain: bool,

    /// rclone executable used for remote locations
    #[arg(long, env = "LFS_FOLDERSTORE_RCLONE", default_value = "rclone", value_name = "PATH")]
    pub rclone: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Required: base directory (use --basedir or git config lfs.folderstore.pull)")]
    MissingBaseDir,
    #[error("{0:?} does not exist or is not a directory")]
    NoUsableLocation(String),
}

impl ConfigError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConfigError::MissingBaseDir => 1,
            ConfigError::NoUsableLocation(_) => 3,
        }
    }
}

/// Resolved settings for one agent process. Built once at startup and never
/// modified afterwards.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub pull: String,
    pub push: String,
    pub pull_action: bool,
    pub push_action: bool,
    pub rclone: PathBuf,
}

impl TransferConfig {
    pub fn new(pull: impl Into<String>, push: impl Into<String>) -> Self {
        Self {
            pull: pull.into(),
            push: push.into(),
            pull_action: false,
            push_action: false,
            rclone: PathBuf::from("rclone"),
        }
    }

    pub fn with_actions(mut self, pull: bool, push: bool) -> Self {
        self.pull_action = pull;
        self.push_action = push;
        self
    }

    pub fn with_rclone(mut self, rclone: impl Into<PathBuf>) -> Self {
        self.rclone = rclone.into();
        self
    }

    pub fn has_pull_location(&self) -> bool {
        !self.pull.trim().is_empty()
    }

    pub fn pull_locations(&self) -> Vec<Location> {
        parse_locations(&self.pull)
    }

    /// Upload locations; the pull locations when no push location is set.
    pub fn push_locations(&self) -> Vec<Location> {
        if self.push.trim().is_empty() {
            self.pull_locations()
        } else {
            parse_locations(&self.push)
        }
    }
}

impl Cli {
    /// Combine command-line flags with git config. Flags win over git config;
    /// the push location falls back to the pull location.
    pub fn resolve(self, git: &GitSettings) -> Result<TransferConfig, ConfigError> {
        let pull = first_non_empty([self.basedir_flag.as_deref(), self.base_dir.as_deref(), git.pull.as_deref()])
            .ok_or(ConfigError::MissingBaseDir)?;
        ensure_usable(&pull)?;

        let push = first_non_empty([self.pushdir.as_deref(), git.push.as_deref()]).unwrap_or_else(|| pull.clone());
        ensure_usable(&push)?;

        let (pull_action, push_action) = if self.useaction {
            (true, true)
        } else {
            (
                self.pullmain || git.pull_main.unwrap_or(false),
                self.pushmain || git.push_main.unwrap_or(false),
            )
        };

        Ok(TransferConfig {
            pull,
            push,
            pull_action,
            push_action,
            rclone: self.rclone,
        })
    }
}

fn first_non_empty<const N: usize>(candidates: [Option<&str>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// At least one segment must be usable. Remote and script segments are taken
/// on trust; directory segments must exist.
fn ensure_usable(spec: &str) -> Result<(), ConfigError> {
    let mut usable = false;
    for location in parse_locations(spec) {
        match &location {
            Location::Directory(path) if !path.is_dir() => {
                warn!(location = %location, "Location does not exist or is not a directory");
            }
            _ => usable = true,
        }
    }
    if usable {
        Ok(())
    } else {
        Err(ConfigError::NoUsableLocation(spec.to_string()))
    }
}
