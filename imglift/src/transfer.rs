//! Image transfer orchestration.
//!
//! The full sequence: acquire the source, provision a disk, open an image
//! transfer, negotiate a data-plane endpoint, stream the bytes, finalize, and
//! wait for the engine's verdict. Strictly sequential; the first failure
//! aborts the run.

use rand::Rng;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use tokio_util::io::ReaderStream;
use url::Url;

use crate::engine::EngineClient;
use crate::engine::types::{
    Disk, DiskCreateRequest, DiskFormat, ImageRef, ImageTransfer, StorageDomainRef,
    TransferCreateRequest,
};
use crate::errors::{UploadError, UploadResult};
use crate::options::UploadOptions;
use crate::source::SourceImage;
use crate::wait::{Wait, WaitOptions, wait_for};

/// Read window for the upload body. Sized to amortize syscalls on fast links
/// without holding the image in memory.
pub const UPLOAD_BUFFER_SIZE: usize = 32 * 1024 * 1024;

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Engine-assigned disk id.
    pub disk_id: String,
    /// Image transfer that carried the bytes.
    pub transfer_id: String,
    /// Physical bytes sent over the data plane.
    pub bytes_sent: u64,
}

/// Upload one disk image into a storage domain.
///
/// The source handle is held for the whole run and released on every exit
/// path; engine-side objects are never cleaned up here — after creation their
/// lifecycle belongs to the engine.
pub async fn upload_image(
    engine: &EngineClient,
    options: &UploadOptions,
) -> UploadResult<UploadOutcome> {
    let source = SourceImage::acquire(&options.source).await?;
    tracing::info!(
        location = %source.location,
        byte_size = source.byte_size,
        virtual_size = source.virtual_size,
        "source image ready"
    );

    let result = run(engine, options, &source).await;
    source.finish(options.cache_download).await;
    result
}

async fn run(
    engine: &EngineClient,
    options: &UploadOptions,
    source: &SourceImage,
) -> UploadResult<UploadOutcome> {
    let wait = options.wait_options();

    let disk = provision_disk(engine, options, source, &wait).await?;
    let transfer = start_transfer(engine, &disk, &wait).await?;

    let dataplane = dataplane_client()?;
    let endpoint = negotiate_endpoint(&dataplane, &transfer).await?;
    let bytes_sent = put_image(&dataplane, &endpoint, source).await?;

    finalize(engine, &transfer, &disk, &wait).await?;

    tracing::info!(disk_id = %disk.id, bytes_sent, "upload finished");
    Ok(UploadOutcome {
        disk_id: disk.id,
        transfer_id: transfer.id,
        bytes_sent,
    })
}

/// Create the disk and wait for the engine to unlock it.
///
/// Provisioned and initial size are the image's virtual size; the alias is a
/// convenience label only, the engine-assigned id is authoritative.
async fn provision_disk(
    engine: &EngineClient,
    options: &UploadOptions,
    source: &SourceImage,
    wait: &WaitOptions,
) -> UploadResult<Disk> {
    let alias = options.alias.clone().unwrap_or_else(random_alias);
    let req = DiskCreateRequest {
        alias: alias.clone(),
        format: DiskFormat::Cow,
        sparse: true,
        provisioned_size: source.virtual_size,
        initial_size: source.virtual_size,
        storage_domains: vec![StorageDomainRef {
            id: options.storage_domain_id.clone(),
        }],
    };

    let disk = engine
        .create_disk(&req)
        .await
        .map_err(|e| UploadError::DiskCreationFailed(e.to_string()))?;
    tracing::info!(disk_id = %disk.id, alias = %alias, "disk created, waiting for it to unlock");

    let disk_id = disk.id.clone();
    wait_for("disk status ok", wait, async || {
        match engine.get_disk(&disk_id).await {
            Ok(Some(d)) if d.status.is_ready() => Ok(Wait::Done(d)),
            Ok(Some(d)) => {
                tracing::debug!(disk_id = %disk_id, status = %d.status, "disk not ready");
                Ok(Wait::Pending)
            }
            Ok(None) => {
                tracing::debug!(disk_id = %disk_id, "disk not visible yet");
                Ok(Wait::Pending)
            }
            Err(e) => {
                tracing::warn!(disk_id = %disk_id, "disk fetch failed: {}", e);
                Ok(Wait::Pending)
            }
        }
    })
    .await
}

/// Open an image transfer for the disk and wait for the transferring phase.
async fn start_transfer(
    engine: &EngineClient,
    disk: &Disk,
    wait: &WaitOptions,
) -> UploadResult<ImageTransfer> {
    let req = TransferCreateRequest {
        image: ImageRef {
            id: disk.id.clone(),
        },
    };
    let transfer = engine
        .create_transfer(&req)
        .await
        .map_err(|e| UploadError::TransferInitFailed(e.to_string()))?;
    tracing::info!(transfer_id = %transfer.id, disk_id = %disk.id, "image transfer opened");

    let transfer_id = transfer.id.clone();
    wait_for("transfer phase transferring", wait, async || {
        match engine.get_transfer(&transfer_id).await {
            Ok(t) if t.phase.is_transferring() => Ok(Wait::Done(t)),
            Ok(t) => {
                tracing::debug!(transfer_id = %transfer_id, phase = %t.phase, "transfer not active");
                Ok(Wait::Pending)
            }
            Err(e) => {
                tracing::warn!(transfer_id = %transfer_id, "transfer fetch failed: {}", e);
                Ok(Wait::Pending)
            }
        }
    })
    .await
}

/// Client for the data plane. Nodes and proxies commonly present self-signed
/// certificates, so verification is disabled on this leg.
fn dataplane_client() -> UploadResult<Client> {
    Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|e| UploadError::Config(format!("failed to create data-plane client: {}", e)))
}

/// Pick a reachable data-plane endpoint, preferring the direct host URL.
///
/// The direct endpoint skips a network hop when the orchestrator can reach
/// the node; the proxy is the universally reachable fallback. Each candidate
/// is probed once with OPTIONS and only a clean 200 counts.
async fn negotiate_endpoint(client: &Client, transfer: &ImageTransfer) -> UploadResult<Url> {
    if let Some(raw) = transfer.transfer_url.as_deref() {
        match Url::parse(raw) {
            Ok(direct) => {
                if probe(client, &direct).await {
                    tracing::info!(endpoint = %direct, "using direct transfer endpoint");
                    return Ok(direct);
                }
            }
            Err(e) => tracing::debug!("unparseable transfer url {}: {}", raw, e),
        }
    }

    let raw = transfer
        .proxy_url
        .as_deref()
        .ok_or_else(|| UploadError::ProxyUrlInvalid("engine returned no proxy url".to_string()))?;
    let proxy =
        Url::parse(raw).map_err(|e| UploadError::ProxyUrlInvalid(format!("{}: {}", raw, e)))?;
    if probe(client, &proxy).await {
        tracing::info!(endpoint = %proxy, "using proxy transfer endpoint");
        return Ok(proxy);
    }

    Err(UploadError::NoReachableEndpoint)
}

async fn probe(client: &Client, url: &Url) -> bool {
    match client.request(Method::OPTIONS, url.clone()).send().await {
        Ok(resp) => {
            tracing::debug!(endpoint = %url, status = %resp.status(), "OPTIONS probe");
            resp.status() == StatusCode::OK
        }
        Err(e) => {
            tracing::debug!(endpoint = %url, "OPTIONS probe failed: {}", e);
            false
        }
    }
}

/// Stream the source to the endpoint in a single PUT.
///
/// Content length is the physical file size, not the virtual size: sparse
/// images travel at their on-disk weight. No retry, no resume; a mid-stream
/// failure fails the whole run.
async fn put_image(client: &Client, endpoint: &Url, source: &SourceImage) -> UploadResult<u64> {
    let file = source.stream_handle().await?;
    let stream = ReaderStream::with_capacity(file, UPLOAD_BUFFER_SIZE);

    tracing::info!(endpoint = %endpoint, bytes = source.byte_size, "uploading image");
    let resp = client
        .put(endpoint.clone())
        .header(CONTENT_TYPE, "application/octet-stream")
        .header(CONTENT_LENGTH, source.byte_size)
        .body(reqwest::Body::wrap_stream(stream))
        .send()
        .await
        .map_err(|e| UploadError::UploadFailed(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(UploadError::UploadFailed(format!(
            "endpoint returned HTTP {}",
            resp.status()
        )));
    }
    Ok(source.byte_size)
}

/// Finalize the transfer and wait for the engine's verdict on the disk.
///
/// A disk that disappears here was rejected by the engine (content or format
/// mismatch) — a distinct outcome from transient fetch errors, which are
/// tolerated and re-polled.
async fn finalize(
    engine: &EngineClient,
    transfer: &ImageTransfer,
    disk: &Disk,
    wait: &WaitOptions,
) -> UploadResult<()> {
    tracing::info!(transfer_id = %transfer.id, "finalizing transfer");
    engine
        .finalize_transfer(&transfer.id)
        .await
        .map_err(|e| UploadError::FinalizeFailed(e.to_string()))?;

    let disk_id = disk.id.clone();
    wait_for("disk status ok after finalize", wait, async || {
        match engine.get_disk(&disk_id).await {
            Ok(None) => Err(UploadError::DiskRejected),
            Ok(Some(d)) if d.status.is_ready() => Ok(Wait::Done(())),
            Ok(Some(d)) => {
                tracing::debug!(disk_id = %disk_id, status = %d.status, "disk not ready");
                Ok(Wait::Pending)
            }
            Err(e) => {
                tracing::warn!(disk_id = %disk_id, "disk fetch failed: {}", e);
                Ok(Wait::Pending)
            }
        }
    })
    .await
}

/// Collision-tolerant convenience label; the engine id is authoritative.
fn random_alias() -> String {
    format!("upload-{:08x}", rand::rng().random::<u32>())
}
