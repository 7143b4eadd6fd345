//! Subprocess helpers for rclone and user scripts.
//!
//! Child output is always captured: stdout belongs to the protocol stream and
//! must never receive anything a child prints.

use std::ffi::OsStr;
use std::process::Stdio;

use anyhow::{bail, Context};
use tokio::process::Command;
use tracing::debug;

/// Build a command that runs `script` through the platform shell.
pub fn shell(script: &str) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(script);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    };
    cmd.stdin(Stdio::null());
    cmd
}

/// Build a command for `program` with the given arguments.
pub fn command<I, S>(program: impl AsRef<OsStr>, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    cmd
}

/// Run to completion and return stdout. A non-zero exit is an error carrying
/// the exit status and the child's stderr.
pub async fn run(mut cmd: Command, what: &str) -> anyhow::Result<Vec<u8>> {
    let output = cmd
        .output()
        .await
        .with_context(|| format!("failed to start {}", what))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            bail!("{} failed: {}", what, output.status);
        }
        bail!("{} failed: {}: {}", what, output.status, stderr);
    }
    if !output.stderr.is_empty() {
        debug!(command = what, stderr = %String::from_utf8_lossy(&output.stderr).trim(), "Child wrote to stderr");
    }
    Ok(output.stdout)
}
