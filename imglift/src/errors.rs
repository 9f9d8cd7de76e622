//! Error types for the upload orchestration.
//!
//! Every stage fails fast: the first error aborts the whole orchestration and
//! surfaces to the caller with its stage context. There is no partial-failure
//! recovery; the only retry-like behavior is the convergence polling in
//! [`crate::wait`], which is waiting, not error recovery.

/// Result alias used across the crate.
pub type UploadResult<T> = Result<T, UploadError>;

/// Terminal errors of the upload orchestration, one per stage outcome.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The source does not start with a qcow header.
    #[error("not a qcow image: {0}")]
    NotQcowFormat(String),

    /// A local source path could not be opened or inspected.
    #[error("source unreachable: {0}")]
    SourceUnreachable(String),

    /// Fetching a remote source into the local spool file failed.
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// The engine refused the disk creation request.
    #[error("disk creation failed: {0}")]
    DiskCreationFailed(String),

    /// The engine refused to open an image transfer.
    #[error("transfer init failed: {0}")]
    TransferInitFailed(String),

    /// The transfer carried no usable proxy endpoint.
    #[error("invalid proxy url: {0}")]
    ProxyUrlInvalid(String),

    /// Neither the direct nor the proxy endpoint answered the OPTIONS probe.
    #[error("no reachable data-plane endpoint")]
    NoReachableEndpoint,

    /// The data-plane PUT failed mid-stream or was rejected.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// The finalize request was rejected by the engine.
    #[error("finalize failed: {0}")]
    FinalizeFailed(String),

    /// The engine removed the disk after finalize, rejecting the content.
    #[error("disk was removed by the engine, the uploaded content was rejected")]
    DiskRejected,

    /// Invalid connection options or client construction failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// The caller cancelled the orchestration while waiting.
    #[error("cancelled while waiting for {0}")]
    Cancelled(String),

    /// A wait budget was exhausted before the engine converged.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// Local I/O failure on the source handle.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
