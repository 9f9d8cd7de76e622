//! Source image acquisition.
//!
//! Turns a location string into a locally seekable byte source: local paths
//! and `file://` URIs are opened in place, anything else is fetched over HTTP
//! into a spool file under the system temp directory. The spool file is kept
//! after the run by default so a later invocation can reuse it.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::errors::{UploadError, UploadResult};
use crate::qcow;

/// A disk image resolved to a local, seekable file.
///
/// `virtual_size` drives disk provisioning; `byte_size` is what actually goes
/// over the wire. The handle stays open for the whole orchestration and is
/// released on drop, on every exit path.
#[derive(Debug)]
pub struct SourceImage {
    /// The location the caller asked for.
    pub location: String,
    /// Physical size of the local file in bytes.
    pub byte_size: u64,
    /// Virtual disk size from the qcow header.
    pub virtual_size: u64,
    file: File,
    path: PathBuf,
    downloaded: bool,
}

impl SourceImage {
    /// Resolve `location` into a readable source and parse its header.
    ///
    /// Fails before any engine resource exists: a malformed header aborts the
    /// orchestration right here.
    pub async fn acquire(location: &str) -> UploadResult<Self> {
        let (file, path, downloaded) = match local_path(location) {
            Some(local) => {
                let file = File::open(&local).await.map_err(|e| {
                    UploadError::SourceUnreachable(format!("{}: {}", local.display(), e))
                })?;
                (file, local, false)
            }
            None => {
                let (file, path) = download(location).await?;
                (file, path, true)
            }
        };

        let byte_size = file
            .metadata()
            .await
            .map_err(|e| UploadError::SourceUnreachable(format!("{}: stat: {}", location, e)))?
            .len();

        let mut file = file;
        let mut header = [0u8; qcow::HEADER_LEN];
        file.read_exact(&mut header)
            .await
            .map_err(|e| UploadError::NotQcowFormat(format!("truncated header: {}", e)))?;
        let parsed = qcow::parse(&header)?;

        // Streaming starts from the beginning, not after the header.
        file.seek(SeekFrom::Start(0)).await?;

        tracing::debug!(
            location,
            byte_size,
            virtual_size = parsed.virtual_size,
            "source acquired"
        );

        Ok(Self {
            location: location.to_string(),
            byte_size,
            virtual_size: parsed.virtual_size,
            file,
            path,
            downloaded,
        })
    }

    /// Local path of the backing file (the original file or the spool file).
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_downloaded(&self) -> bool {
        self.downloaded
    }

    /// Duplicate the handle for the upload body, positioned at offset 0.
    ///
    /// The original handle stays held by `self` until the orchestration ends.
    pub async fn stream_handle(&self) -> UploadResult<File> {
        let mut dup = self.file.try_clone().await?;
        dup.seek(SeekFrom::Start(0)).await?;
        Ok(dup)
    }

    /// Release the handle. A downloaded spool file is removed unless
    /// `retain_download` asks to keep it for reuse; a caller-supplied local
    /// file is never touched.
    pub async fn finish(self, retain_download: bool) {
        let Self {
            file,
            path,
            downloaded,
            ..
        } = self;
        drop(file);
        if downloaded && !retain_download {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!("failed to remove spool file {}: {}", path.display(), e);
            }
        }
    }
}

/// Interpret the location as a local path if it has a file scheme or is
/// filesystem-rooted; anything else is treated as a remote URL.
fn local_path(location: &str) -> Option<PathBuf> {
    if let Some(stripped) = location.strip_prefix("file://") {
        Some(PathBuf::from(stripped))
    } else if location.starts_with('/') {
        Some(PathBuf::from(location))
    } else {
        None
    }
}

/// Stream a remote image into a spool file and reopen it for random access.
async fn download(url: &str) -> UploadResult<(File, PathBuf)> {
    tracing::info!("downloading image from {}", url);

    let resp = reqwest::get(url)
        .await
        .map_err(|e| UploadError::DownloadFailed(format!("{}: {}", url, e)))?;
    if !resp.status().is_success() {
        return Err(UploadError::DownloadFailed(format!(
            "{}: HTTP {}",
            url,
            resp.status()
        )));
    }

    let spool = tempfile::Builder::new()
        .prefix("imglift-")
        .suffix(".download")
        .tempfile()
        .map_err(|e| UploadError::DownloadFailed(format!("failed to create spool file: {}", e)))?;
    let (std_file, path) = spool
        .keep()
        .map_err(|e| UploadError::DownloadFailed(format!("failed to keep spool file: {}", e)))?;
    let mut file = File::from_std(std_file);

    let mut written: u64 = 0;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| UploadError::DownloadFailed(format!("{}: {}", url, e)))?;
        file.write_all(&chunk).await.map_err(|e| {
            UploadError::DownloadFailed(format!("writing {}: {}", path.display(), e))
        })?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| UploadError::DownloadFailed(format!("flushing {}: {}", path.display(), e)))?;
    file.seek(SeekFrom::Start(0))
        .await
        .map_err(|e| UploadError::DownloadFailed(format!("{}: {}", path.display(), e)))?;

    tracing::info!(bytes = written, spool = %path.display(), "download complete");
    Ok((file, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_qcow(path: &Path, virtual_size: u64, total_len: usize) {
        let mut data = vec![0u8; total_len];
        data[0..4].copy_from_slice(&qcow::QCOW_MAGIC.to_be_bytes());
        data[24..32].copy_from_slice(&virtual_size.to_be_bytes());
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(&data).unwrap();
    }

    #[test]
    fn test_local_path_detection() {
        assert_eq!(
            local_path("file:///var/images/a.qcow2"),
            Some(PathBuf::from("/var/images/a.qcow2"))
        );
        assert_eq!(
            local_path("/var/images/a.qcow2"),
            Some(PathBuf::from("/var/images/a.qcow2"))
        );
        assert_eq!(local_path("https://host/a.qcow2"), None);
        assert_eq!(local_path("http://host/a.qcow2"), None);
    }

    #[tokio::test]
    async fn test_acquire_local_file() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("disk.qcow2");
        write_qcow(&image, 1 << 30, 4096);

        let source = SourceImage::acquire(image.to_str().unwrap()).await.unwrap();
        assert_eq!(source.byte_size, 4096);
        assert_eq!(source.virtual_size, 1 << 30);
        assert!(!source.is_downloaded());
        assert_eq!(source.path(), image);
    }

    #[tokio::test]
    async fn test_acquire_file_uri() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("disk.qcow2");
        write_qcow(&image, 2048, 512);

        let uri = format!("file://{}", image.display());
        let source = SourceImage::acquire(&uri).await.unwrap();
        assert_eq!(source.byte_size, 512);
        assert_eq!(source.virtual_size, 2048);
    }

    #[tokio::test]
    async fn test_stream_handle_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("disk.qcow2");
        write_qcow(&image, 2048, 512);

        let source = SourceImage::acquire(image.to_str().unwrap()).await.unwrap();
        let mut handle = source.stream_handle().await.unwrap();
        let mut magic = [0u8; 4];
        handle.read_exact(&mut magic).await.unwrap();
        assert_eq!(u32::from_be_bytes(magic), qcow::QCOW_MAGIC);
    }

    #[tokio::test]
    async fn test_missing_local_file_is_unreachable() {
        let err = SourceImage::acquire("/nonexistent/disk.qcow2")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::SourceUnreachable(_)));
    }

    #[tokio::test]
    async fn test_bad_magic_is_not_qcow() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("disk.raw");
        std::fs::write(&image, vec![0u8; 4096]).unwrap();

        let err = SourceImage::acquire(image.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NotQcowFormat(_)));
    }

    #[tokio::test]
    async fn test_short_file_is_not_qcow() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("stub.qcow2");
        std::fs::write(&image, b"QFI").unwrap();

        let err = SourceImage::acquire(image.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NotQcowFormat(_)));
    }

    #[tokio::test]
    async fn test_finish_never_deletes_local_sources() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("disk.qcow2");
        write_qcow(&image, 2048, 512);

        let source = SourceImage::acquire(image.to_str().unwrap()).await.unwrap();
        source.finish(false).await;
        assert!(image.exists(), "local source must survive finish");
    }
}
