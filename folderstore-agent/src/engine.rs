//! Retrieval and store chains.
//!
//! Each request walks the configured locations left to right and stops at
//! the first that succeeds. Per-location failures are only logged; the caller
//! sees exactly one terminal message per object.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::{debug, warn};

use folderstore_common::api::{codes, Action};
use folderstore_common::storage::{download_temp_path, validate_oid};

use crate::action::ActionClient;
use crate::backend::{self, Stored};
use crate::config::TransferConfig;
use crate::copy::{CopyProgress, ProgressFn};
use crate::respond::Responder;

pub struct TransferEngine {
    config: TransferConfig,
    git_dir: PathBuf,
    actions: ActionClient,
}

impl TransferEngine {
    pub fn new(config: TransferConfig, git_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            git_dir: git_dir.into(),
            actions: ActionClient::new(),
        }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Fetch an object into the repository's LFS temp dir and report its
    /// path, or fail with code 3 once every location and the action are
    /// exhausted.
    pub async fn retrieve<W: Write + Send>(
        &self,
        oid: &str,
        size: u64,
        action: Option<&Action>,
        out: &mut Responder<W>,
    ) {
        let dest = match download_temp_path(&self.git_dir, oid) {
            Ok(dest) => dest,
            Err(e) => {
                out.transfer_error(oid, codes::RETRIEVE_FAILED, format!("Unable to retrieve {:?}: {}", oid, e));
                return;
            }
        };
        let result = {
            let mut report = |p: CopyProgress| out.progress(oid, p.copied, p.chunk);
            self.try_retrieve(oid, size, action, &dest, &mut report).await
        };
        match result {
            Ok(()) => out.complete(oid, Some(dest)),
            Err(e) => out.transfer_error(
                oid,
                codes::RETRIEVE_FAILED,
                format!("Unable to retrieve {:?}: {:#}", oid, e),
            ),
        }
    }

    async fn try_retrieve(
        &self,
        oid: &str,
        size: u64,
        action: Option<&Action>,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<()> {
        let mut last_err = None;
        for location in self.config.pull_locations() {
            let adapter = backend::from_location(&location, &self.config.rclone);
            match adapter.retrieve(oid, size, dest, progress).await {
                Ok(()) => {
                    debug!(oid = %oid, location = %location, "Retrieved");
                    return Ok(());
                }
                Err(e) => {
                    debug!(oid = %oid, location = %location, error = %format!("{e:#}"), "Location could not supply object");
                    last_err = Some(e);
                }
            }
        }

        if self.config.pull_action {
            if let Some(action) = action {
                match self.actions.download(action, size, dest, progress).await {
                    Ok(()) => {
                        debug!(oid = %oid, "Retrieved via action");
                        return Ok(());
                    }
                    Err(e) => last_err = Some(e),
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("object not found")))
    }

    /// Store the file at `from` under `oid`. The action mirror, when enabled,
    /// runs first and aborts the request if it fails.
    pub async fn store<W: Write + Send>(
        &self,
        oid: &str,
        declared_size: u64,
        from: &Path,
        action: Option<&Action>,
        out: &mut Responder<W>,
    ) {
        if let Err(e) = validate_oid(oid) {
            out.transfer_error(oid, codes::STORE_FAILED, format!("Unable to store {:?}: {}", oid, e));
            return;
        }
        let size = match tokio::fs::metadata(from).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                out.transfer_error(oid, codes::STAT_SOURCE, format!("Cannot stat {:?}: {}", from, e));
                return;
            }
        };
        if size != declared_size {
            debug!(oid = %oid, declared_size, size, "Source size differs from request");
        }

        if self.config.push_action {
            if let Some(action) = action {
                if let Err(e) = self.actions.upload(action, from, size).await {
                    out.transfer_error(
                        oid,
                        codes::ACTION_UPLOAD,
                        format!("Error uploading {:?} via action: {}", oid, e),
                    );
                    return;
                }
            }
        }

        let result = {
            let mut report = |p: CopyProgress| out.progress(oid, p.copied, p.chunk);
            self.try_store(oid, from, size, &mut report).await
        };
        match result {
            Ok(_) => out.complete(oid, None),
            Err(e) => out.transfer_error(
                oid,
                codes::STORE_FAILED,
                format!("Unable to store {:?}: {}", oid, e),
            ),
        }
    }

    async fn try_store(
        &self,
        oid: &str,
        from: &Path,
        size: u64,
        progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<Stored> {
        let mut last_err = None;
        for location in self.config.push_locations() {
            let adapter = backend::from_location(&location, &self.config.rclone);
            match adapter.store(oid, from, size, progress).await {
                Ok(stored) => {
                    debug!(oid = %oid, location = %location, ?stored, "Stored");
                    return Ok(stored);
                }
                Err(e) => {
                    warn!(oid = %oid, location = %location, code = e.code(), error = %e, "Store to location failed");
                    last_err = Some(anyhow::Error::new(e));
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("no storage location configured")))
    }
}
