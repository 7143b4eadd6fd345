//! Local directory backend adapter.
//!
//! Objects live at `<base>/ab/cd/<oid>`, optionally compressed as
//! `<oid>.zip` or `<oid>.lz4`. Stores are written uncompressed through a
//! `<oid>.tmp` sibling (temp file → fsync → rename) so readers of the final
//! path never see a partial object.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use folderstore_common::storage::{storage_path, with_suffix};

use super::{BackendAdapter, Stored};
use crate::copy::{self, CopyProgress, ProgressFn};
use crate::decode;
use crate::error::StoreError;

pub struct DirectoryAdapter {
    base_path: PathBuf,
}

impl DirectoryAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }
}

#[async_trait]
impl BackendAdapter for DirectoryAdapter {
    async fn retrieve(
        &self,
        oid: &str,
        size: u64,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<()> {
        let path = storage_path(&self.base_path, oid)?;

        if let Ok(meta) = tokio::fs::metadata(&path).await {
            if meta.is_file() {
                let mut file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?;
                copy::stream_to_file(&mut file, meta.len(), dest, progress).await?;
                debug!(oid = %oid, path = %path.display(), "Retrieved from directory");
                return Ok(());
            }
        }

        let zip_path = with_suffix(&path, "zip");
        if tokio::fs::metadata(&zip_path).await.is_ok() {
            let file = std::fs::File::open(&zip_path)
                .with_context(|| format!("failed to open {}", zip_path.display()))?;
            decode::stream_zip(file, size, dest, progress)
                .await
                .with_context(|| format!("failed to extract {}", zip_path.display()))?;
            debug!(oid = %oid, path = %zip_path.display(), "Retrieved from zip archive");
            return Ok(());
        }

        let lz4_path = with_suffix(&path, "lz4");
        if tokio::fs::metadata(&lz4_path).await.is_ok() {
            let file = std::fs::File::open(&lz4_path)
                .with_context(|| format!("failed to open {}", lz4_path.display()))?;
            decode::stream_lz4(file, size, dest, progress)
                .await
                .with_context(|| format!("failed to decompress {}", lz4_path.display()))?;
            debug!(oid = %oid, path = %lz4_path.display(), "Retrieved from lz4 file");
            return Ok(());
        }

        bail!("{} not found", path.display())
    }

    async fn store(
        &self,
        oid: &str,
        source: &Path,
        size: u64,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Stored, StoreError> {
        let dest = storage_path(&self.base_path, oid)?;

        if let Ok(existing) = tokio::fs::metadata(&dest).await {
            if existing.len() == size {
                info!(oid = %oid, "Skipping {}, already stored", oid);
                progress(CopyProgress::whole(size));
                return Ok(Stored::AlreadyPresent);
            }
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::CreateDir { path: parent.to_path_buf(), source })?;
        }

        let tmp_path = with_suffix(&dest, "tmp");
        match tokio::fs::remove_file(&tmp_path).await {
            Ok(()) => debug!(path = %tmp_path.display(), "Removed stale temp file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(StoreError::RemoveTemp { path: tmp_path, source }),
        }

        let src = tokio::fs::File::open(source)
            .await
            .map_err(|e| StoreError::OpenSource { path: source.to_path_buf(), source: e })?;

        let mut tmp = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .await
            .map_err(|source| StoreError::OpenTemp { path: tmp_path.clone(), source })?;

        let written = async {
            let copied = copy::copy_with_progress(size, &mut src.take(size), &mut tmp, progress).await?;
            if copied != size {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended after {} of {} bytes", copied, size),
                ));
            }
            tmp.sync_all().await
        }
        .await;
        drop(tmp);

        if let Err(source) = written {
            copy::discard(&tmp_path).await;
            return Err(StoreError::WriteTemp { path: tmp_path, source });
        }

        if let Err(source) = tokio::fs::rename(&tmp_path, &dest).await {
            copy::discard(&tmp_path).await;
            return Err(StoreError::Rename { path: dest, source });
        }

        debug!(oid = %oid, path = %dest.display(), "Directory store complete");
        Ok(Stored::Written)
    }
}
