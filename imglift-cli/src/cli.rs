//! CLI definition and argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};
use tokio_util::sync::CancellationToken;

use imglift::{EngineOptions, UploadOptions};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "imglift",
    author,
    version,
    about = "Stream a disk image from a URL or file into a storage domain"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(flatten)]
    pub engine: EngineFlags,

    #[command(flatten)]
    pub upload: UploadFlags,
}

// ============================================================================
// GLOBAL FLAGS
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,
}

// ============================================================================
// ENGINE CONNECTION FLAGS
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct EngineFlags {
    /// Engine API base URL, e.g. https://engine.example.com/api
    #[arg(long = "engine-url", env = "IMGLIFT_ENGINE_URL")]
    pub engine_url: String,

    /// Engine API user
    #[arg(long, env = "IMGLIFT_USERNAME", default_value = "")]
    pub username: String,

    /// Engine API password
    #[arg(long, env = "IMGLIFT_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// CA bundle used to verify the engine endpoint
    #[arg(long, env = "IMGLIFT_CA_FILE")]
    pub ca_file: Option<PathBuf>,

    /// Skip TLS verification for the engine endpoint
    #[arg(long)]
    pub insecure: bool,
}

impl EngineFlags {
    pub fn to_options(&self) -> EngineOptions {
        let mut options = EngineOptions::new(&self.engine_url)
            .with_credentials(&self.username, &self.password)
            .insecure(self.insecure);
        if let Some(ca_file) = &self.ca_file {
            options = options.with_ca_file(ca_file);
        }
        options
    }
}

// ============================================================================
// UPLOAD FLAGS
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct UploadFlags {
    /// Image to upload: /a/b/c, file:///a/b/c or http(s)://host/image
    #[arg(short = 's', long)]
    pub src: String,

    /// Storage domain to create the disk in
    #[arg(short = 'd', long = "storage-domain-id")]
    pub storage_domain_id: String,

    /// Disk alias (randomized when omitted)
    #[arg(long)]
    pub alias: Option<String>,

    /// Remove a downloaded image after the run instead of keeping it for reuse
    #[arg(long)]
    pub no_cache: bool,

    /// Seconds between engine status polls
    #[arg(long, default_value_t = 5)]
    pub poll_interval: u64,

    /// Give up after this many seconds of waiting on the engine
    #[arg(long)]
    pub max_wait: Option<u64>,
}

impl UploadFlags {
    pub fn to_options(&self, cancel: CancellationToken) -> UploadOptions {
        let mut options = UploadOptions::new(&self.src, &self.storage_domain_id)
            .with_poll_interval(Duration::from_secs(self.poll_interval))
            .with_cancel(cancel)
            .keep_download(!self.no_cache);
        if let Some(alias) = &self.alias {
            options = options.with_alias(alias);
        }
        if let Some(max_wait) = self.max_wait {
            options = options.with_max_wait(Duration::from_secs(max_wait));
        }
        options
    }
}

// ============================================================================
// Tests
// ============================================================================
