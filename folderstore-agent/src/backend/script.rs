//! User-supplied shell command as a storage location.
//!
//! Retrieval runs the command with `OID`, `DEST` and `SIZE` in its
//! environment and expects the object to appear at `DEST`. Storage runs it
//! with `OID`, `FROM` and `SIZE`. Exit status 0 means success.

use std::path::Path;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tracing::debug;

use super::{BackendAdapter, Stored};
use crate::copy::{CopyProgress, ProgressFn};
use crate::error::StoreError;
use crate::process;

pub struct ScriptAdapter {
    command: String,
}

impl ScriptAdapter {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }

    fn checked_command(&self) -> anyhow::Result<&str> {
        if self.command.trim().is_empty() {
            bail!("empty script command");
        }
        Ok(&self.command)
    }
}

#[async_trait]
impl BackendAdapter for ScriptAdapter {
    async fn retrieve(
        &self,
        oid: &str,
        size: u64,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<()> {
        let script = self.checked_command()?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("error creating temp dir {}", parent.display()))?;
        }

        let mut cmd = process::shell(script);
        cmd.env("OID", oid).env("DEST", dest).env("SIZE", size.to_string());
        process::run(cmd, "retrieve script").await?;

        let written = tokio::fs::metadata(dest)
            .await
            .with_context(|| format!("script did not produce {}", dest.display()))?;
        progress(CopyProgress::whole(written.len()));
        debug!(oid = %oid, bytes = written.len(), "Retrieved via script");
        Ok(())
    }

    async fn store(
        &self,
        oid: &str,
        source: &Path,
        size: u64,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Stored, StoreError> {
        let script = self.checked_command().map_err(StoreError::Script)?;

        let mut cmd = process::shell(script);
        cmd.env("OID", oid).env("FROM", source).env("SIZE", size.to_string());
        process::run(cmd, "store script").await.map_err(StoreError::Script)?;

        progress(CopyProgress::whole(size));
        debug!(oid = %oid, "Stored via script");
        Ok(Stored::Written)
    }
}
