//! Chunked stream copy with progress reporting.
//!
//! Every transfer path funnels its bytes through [`copy_with_progress`]; the
//! callback is how raw I/O turns into `progress` protocol messages.

use std::io;
use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

pub const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyProgress {
    /// Expected size of the whole transfer, 0 if unknown.
    pub total: u64,
    /// Bytes written so far, including this chunk.
    pub copied: u64,
    /// Bytes written by this chunk.
    pub chunk: u64,
}

impl CopyProgress {
    /// A single report covering a transfer that happened out of band.
    pub fn whole(size: u64) -> Self {
        Self {
            total: size,
            copied: size,
            chunk: size,
        }
    }
}

/// Progress callback. Runs inline on the transfer path, so it must not block.
pub type ProgressFn<'a> = dyn FnMut(CopyProgress) + Send + 'a;

/// Copy `src` to `dst` in [`CHUNK_SIZE`] chunks, invoking `progress` after each
/// one. Returns the number of bytes copied.
pub async fn copy_with_progress<R, W>(
    total: u64,
    src: &mut R,
    dst: &mut W,
    progress: &mut ProgressFn<'_>,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut copied = 0u64;
    loop {
        let n = fill_chunk(src, &mut buf).await?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n]).await?;
        copied += n as u64;
        progress(CopyProgress {
            total,
            copied,
            chunk: n as u64,
        });
        if n < buf.len() {
            break;
        }
    }
    dst.flush().await?;
    Ok(copied)
}

/// Read until `buf` is full or the stream ends.
async fn fill_chunk<R>(src: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Stream `src` into a freshly truncated file at `dest`. A partially written
/// file is removed on failure.
pub async fn stream_to_file<R>(
    src: &mut R,
    total: u64,
    dest: &Path,
    progress: &mut ProgressFn<'_>,
) -> anyhow::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("error creating temp dir {}", parent.display()))?;
    }
    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("error creating temp file {}", dest.display()))?;

    let copied = match copy_with_progress(total, src, &mut file, progress).await {
        Ok(n) => n,
        Err(e) => {
            drop(file);
            discard(dest).await;
            return Err(e).with_context(|| format!("error writing {}", dest.display()));
        }
    };
    if let Err(e) = file.sync_all().await {
        drop(file);
        discard(dest).await;
        return Err(e).context("fsync failed");
    }
    debug!(path = %dest.display(), bytes = copied, "Stream written");
    Ok(copied)
}

/// Best-effort removal of a partial file.
pub async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "Failed to remove partial file");
        }
    }
}
