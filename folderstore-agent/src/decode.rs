//! Transparent decompression of archived objects.
//!
//! Objects may be stored as `<oid>.zip` (a single-entry archive) or
//! `<oid>.lz4` (an LZ4 frame). Both decoders are synchronous, so they run on
//! the blocking pool and feed the async copy through an in-memory pipe.

use std::io::{self, Read, Seek, Write};
use std::path::Path;

use anyhow::{bail, Context};
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tokio_util::io::SyncIoBridge;
use tracing::debug;
use zip::ZipArchive;

use crate::copy::{self, ProgressFn, CHUNK_SIZE};

/// Decompressed bytes produced by a background decoder.
pub struct Decoded {
    reader: DuplexStream,
    task: JoinHandle<io::Result<u64>>,
}

impl Decoded {
    /// Run `decode` on the blocking pool, handing it a writer whose bytes
    /// come out of the returned stream.
    pub fn spawn<F>(decode: F) -> Self
    where
        F: FnOnce(&mut dyn Write) -> io::Result<u64> + Send + 'static,
    {
        let (reader, writer) = tokio::io::duplex(CHUNK_SIZE);
        let mut bridge = SyncIoBridge::new(writer);
        let task = tokio::task::spawn_blocking(move || {
            let n = decode(&mut bridge)?;
            bridge.flush()?;
            bridge.shutdown()?;
            Ok(n)
        });
        Self { reader, task }
    }

    /// Stream the decoded bytes into `dest`. A decoder failure is reported
    /// even when it surfaced as an early end of stream.
    pub async fn stream_to_file(
        mut self,
        total: u64,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<u64> {
        let copied = copy::stream_to_file(&mut self.reader, total, dest, progress).await?;
        drop(self.reader);
        match self.task.await {
            Ok(Ok(_)) => Ok(copied),
            Ok(Err(e)) => {
                copy::discard(dest).await;
                Err(e).context("decompression failed")
            }
            Err(e) => {
                copy::discard(dest).await;
                Err(e).context("decoder task failed")
            }
        }
    }
}

/// Decode an LZ4 frame stream.
pub fn lz4<R>(source: R) -> Decoded
where
    R: Read + Send + 'static,
{
    Decoded::spawn(move |out| {
        let mut decoder = lz4_flex::frame::FrameDecoder::new(source);
        io::copy(&mut decoder, out)
    })
}

/// Open a zip archive that must hold exactly one entry. Returns the archive
/// and the entry's uncompressed size.
pub fn open_single_entry<R>(source: R) -> anyhow::Result<(ZipArchive<R>, u64)>
where
    R: Read + Seek,
{
    let mut archive = ZipArchive::new(source).context("failed to decode zip archive")?;
    match archive.len() {
        0 => bail!("zip file empty"),
        1 => {}
        n => bail!("zip file holds {} entries, expected exactly one", n),
    }
    let size = archive
        .by_index(0)
        .context("failed to read zip entry")?
        .size();
    Ok((archive, size))
}

/// Decode the single entry of an archive opened with [`open_single_entry`].
pub fn zip_entry<R>(mut archive: ZipArchive<R>) -> Decoded
where
    R: Read + Seek + Send + 'static,
{
    Decoded::spawn(move |out| {
        let mut entry = archive.by_index(0).map_err(io::Error::other)?;
        io::copy(&mut entry, out)
    })
}

/// Stream the single entry of a zip archive into `dest`. A zero `size` is
/// replaced with the entry's uncompressed size.
pub async fn stream_zip<R>(
    source: R,
    size: u64,
    dest: &Path,
    progress: &mut ProgressFn<'_>,
) -> anyhow::Result<u64>
where
    R: Read + Seek + Send + 'static,
{
    let (archive, entry_size) = tokio::task::spawn_blocking(move || open_single_entry(source))
        .await
        .context("zip reader task failed")??;
    let total = if size == 0 { entry_size } else { size };
    debug!(entry_size, "Streaming zip entry");
    zip_entry(archive).stream_to_file(total, dest, progress).await
}

/// Stream an LZ4 frame into `dest`.
pub async fn stream_lz4<R>(
    source: R,
    size: u64,
    dest: &Path,
    progress: &mut ProgressFn<'_>,
) -> anyhow::Result<u64>
where
    R: Read + Send + 'static,
{
    lz4(source).stream_to_file(size, dest, progress).await
}
