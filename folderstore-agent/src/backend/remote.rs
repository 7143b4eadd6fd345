//! rclone remote backend adapter.
//!
//! The remote uses the same sharded layout as a local directory; every
//! operation shells out to the `rclone` program.

use std::ffi::OsStr;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use folderstore_common::storage::remote_path;

use super::{BackendAdapter, Stored};
use crate::copy::{self, CopyProgress, ProgressFn};
use crate::decode;
use crate::error::StoreError;
use crate::process;

pub struct RemoteAdapter {
    base: String,
    rclone: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    #[serde(rename = "Size")]
    size: i64,
}

impl RemoteAdapter {
    pub fn new(base: impl Into<String>, rclone: PathBuf) -> Self {
        Self { base: base.into(), rclone }
    }

    /// Stream `rclone cat <path>` straight into `dest`.
    async fn cat_to_file(
        &self,
        path: &str,
        size: u64,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<()> {
        let mut cmd = process::command(&self.rclone, ["cat", path]);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
        let mut child = cmd.spawn().context("failed to start rclone cat")?;
        let mut stdout = child.stdout.take().context("rclone stdout not captured")?;
        let mut stderr = child.stderr.take().context("rclone stderr not captured")?;

        let diagnostics = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let streamed = copy::stream_to_file(&mut stdout, size, dest, progress).await;
        if streamed.is_err() {
            // rclone would otherwise block on a full stdout pipe
            drop(stdout);
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "Unable to kill rclone cat");
            }
        }
        let status = child.wait().await.context("failed to wait for rclone cat")?;
        let diagnostics = diagnostics.await.unwrap_or_default();
        streamed?;

        if !status.success() {
            copy::discard(dest).await;
            bail!(
                "rclone cat failed: {}: {}",
                status,
                String::from_utf8_lossy(&diagnostics).trim()
            );
        }
        Ok(())
    }

    /// Fetch a whole remote object into memory.
    async fn cat(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        process::run(process::command(&self.rclone, ["cat", path]), "rclone cat").await
    }

    /// Size of a remote object, or `None` if it cannot be listed.
    async fn stat(&self, path: &str) -> Option<u64> {
        let out = process::run(process::command(&self.rclone, ["lsjson", path]), "rclone lsjson")
            .await
            .ok()?;
        let entries: Vec<ListEntry> = match serde_json::from_slice(&out) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %path, error = %e, "Unparseable rclone lsjson output");
                return None;
            }
        };
        entries.first().and_then(|entry| u64::try_from(entry.size).ok())
    }
}

#[async_trait]
impl BackendAdapter for RemoteAdapter {
    async fn retrieve(
        &self,
        oid: &str,
        size: u64,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<()> {
        let path = remote_path(&self.base, oid)?;

        match self.cat_to_file(&path, size, dest, progress).await {
            Ok(()) => {
                debug!(oid = %oid, remote = %path, "Retrieved via rclone");
                return Ok(());
            }
            Err(e) => debug!(remote = %path, error = %format!("{e:#}"), "Plain object unavailable"),
        }

        let lz4_path = format!("{}.lz4", path);
        if let Ok(data) = self.cat(&lz4_path).await {
            decode::stream_lz4(Cursor::new(data), size, dest, progress)
                .await
                .with_context(|| format!("failed to decompress {}", lz4_path))?;
            debug!(oid = %oid, remote = %lz4_path, "Retrieved lz4 object via rclone");
            return Ok(());
        }

        let zip_path = format!("{}.zip", path);
        if let Ok(data) = self.cat(&zip_path).await {
            decode::stream_zip(Cursor::new(data), size, dest, progress)
                .await
                .with_context(|| format!("failed to extract {}", zip_path))?;
            debug!(oid = %oid, remote = %zip_path, "Retrieved zip object via rclone");
            return Ok(());
        }

        bail!("rclone path not found: {}", path)
    }

    async fn store(
        &self,
        oid: &str,
        source: &Path,
        size: u64,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Stored, StoreError> {
        let dest = remote_path(&self.base, oid)?;

        if self.stat(&dest).await == Some(size) {
            info!(oid = %oid, "Skipping {}, already stored", oid);
            progress(CopyProgress::whole(size));
            return Ok(Stored::AlreadyPresent);
        }

        let mut cmd = process::command(
            &self.rclone,
            [OsStr::new("copyto"), source.as_os_str(), OsStr::new(&dest)],
        );
        cmd.kill_on_drop(true);
        process::run(cmd, "rclone copyto")
            .await
            .map_err(|source| StoreError::Remote { oid: oid.to_string(), source })?;

        progress(CopyProgress::whole(size));
        debug!(oid = %oid, remote = %dest, "rclone store complete");
        Ok(Stored::Written)
    }
}
