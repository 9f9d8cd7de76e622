//! HTTP client for the management API.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::errors::{UploadError, UploadResult};

use super::options::EngineOptions;
use super::types::{Disk, DiskCreateRequest, FaultResponse, ImageTransfer, TransferCreateRequest};

/// Error from a single management-API round trip.
///
/// Stage code wraps these into the matching orchestration error, so this type
/// only distinguishes transport failures from engine-reported faults.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("engine returned HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },
}

/// Client for the engine's disk and image-transfer services.
///
/// Handles base URL construction, per-request basic auth, and fault-body
/// parsing. TLS trust follows [`EngineOptions`]: an extra CA bundle, or no
/// verification at all when `insecure` is set.
#[derive(Debug)]
pub struct EngineClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl EngineClient {
    pub fn new(options: &EngineOptions) -> UploadResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(300))
            .default_headers(headers);

        if let Some(path) = &options.ca_file {
            let pem = std::fs::read(path).map_err(|e| {
                UploadError::Config(format!("failed to read CA file {}: {}", path.display(), e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                UploadError::Config(format!("invalid CA certificate {}: {}", path.display(), e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if options.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| UploadError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: options.url.trim_end_matches('/').to_string(),
            username: options.username.clone(),
            password: options.password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.username.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.username, Some(&self.password))
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let resp = self.authorize(builder).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json::<T>().await?)
        } else {
            Err(Self::status_error(status, resp).await)
        }
    }

    async fn send_no_content(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let resp = self.authorize(builder).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::status_error(status, resp).await)
        }
    }

    /// Parse an engine fault body, falling back to the raw text.
    async fn status_error(status: StatusCode, resp: reqwest::Response) -> ApiError {
        let text = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<FaultResponse>(&text) {
            Ok(f) => match f.fault.detail {
                Some(detail) => format!("{}: {}", f.fault.reason, detail),
                None => f.fault.reason,
            },
            Err(_) => text,
        };
        ApiError::Status { status, message }
    }

    // ========================================================================
    // Disks
    // ========================================================================

    pub async fn create_disk(&self, req: &DiskCreateRequest) -> Result<Disk, ApiError> {
        self.send_json(self.http.post(self.url("/disks")).json(req))
            .await
    }

    /// Fetch a disk; `Ok(None)` means the engine no longer has it.
    pub async fn get_disk(&self, id: &str) -> Result<Option<Disk>, ApiError> {
        let builder = self.http.get(self.url(&format!("/disks/{}", id)));
        let resp = self.authorize(builder).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_success() {
            Ok(Some(resp.json().await?))
        } else {
            Err(Self::status_error(status, resp).await)
        }
    }

    // ========================================================================
    // Image transfers
    // ========================================================================

    pub async fn create_transfer(
        &self,
        req: &TransferCreateRequest,
    ) -> Result<ImageTransfer, ApiError> {
        self.send_json(self.http.post(self.url("/imagetransfers")).json(req))
            .await
    }

    pub async fn get_transfer(&self, id: &str) -> Result<ImageTransfer, ApiError> {
        self.send_json(self.http.get(self.url(&format!("/imagetransfers/{}", id))))
            .await
    }

    /// Ask the engine to finalize the transfer. There is no matching destroy
    /// call: finalize retires the session on the engine side.
    pub async fn finalize_transfer(&self, id: &str) -> Result<(), ApiError> {
        self.send_no_content(
            self.http
                .post(self.url(&format!("/imagetransfers/{}/finalize", id))),
        )
        .await
    }
}
