//! Queries against the git repository the agent was launched in.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use crate::error::GitError;

async fn git(args: &[&str]) -> Result<String, GitError> {
    git_in(None, args).await
}

async fn git_in(cwd: Option<&Path>, args: &[&str]) -> Result<String, GitError> {
    let mut cmd = Command::new("git");
    cmd.args(args).stdin(std::process::Stdio::null());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = cmd.output().await?;
    if !output.status.success() {
        return Err(GitError::Failed {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Absolute, symlink-resolved path of the repository's git directory.
pub async fn git_dir() -> Result<PathBuf, GitError> {
    resolve_git_dir(None).await
}

pub async fn resolve_git_dir(cwd: Option<&Path>) -> Result<PathBuf, GitError> {
    let raw = git_in(cwd, &["rev-parse", "--git-dir"]).await?;
    let path = PathBuf::from(raw);
    let path = if path.is_absolute() {
        path
    } else {
        let base = match cwd {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };
        base.join(path)
    };
    let resolved = tokio::fs::canonicalize(&path).await?;
    debug!(git_dir = %resolved.display(), "Resolved git dir");
    Ok(resolved)
}

/// `git config --get <key>`, or `None` when unset or git is unavailable.
pub async fn config_value(key: &str) -> Option<String> {
    git(&["config", "--get", key])
        .await
        .ok()
        .filter(|value| !value.is_empty())
}

/// `git config --bool --get <key>`, or `None` when unset or not a boolean.
pub async fn config_bool(key: &str) -> Option<bool> {
    match git(&["config", "--bool", "--get", key]).await.ok()?.as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Settings read from `lfs.folderstore.*` git config keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitSettings {
    pub pull: Option<String>,
    pub push: Option<String>,
    pub pull_main: Option<bool>,
    pub push_main: Option<bool>,
}

impl GitSettings {
    pub async fn load() -> Self {
        Self {
            pull: config_value("lfs.folderstore.pull").await,
            push: config_value("lfs.folderstore.push").await,
            pull_main: config_bool("lfs.folderstore.pullmain").await,
            push_main: config_bool("lfs.folderstore.pushmain").await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_git_dir_is_absolute() {
        let repo = tempfile::tempdir().unwrap();
        let init = Command::new("git")
            .arg("init")
            .arg("-q")
            .current_dir(repo.path())
            .status()
            .await;
        if !matches!(init, Ok(status) if status.success()) {
            // git is not installed here
            return;
        }

        let dir = resolve_git_dir(Some(repo.path())).await.unwrap();
        assert!(dir.is_absolute());
        assert!(dir.ends_with(".git"));
        assert_eq!(dir, std::fs::canonicalize(repo.path().join(".git")).unwrap());
    }

    #[tokio::test]
    async fn test_resolve_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_git_dir(Some(dir.path())).await;
        assert!(result.is_err());
    }
}
