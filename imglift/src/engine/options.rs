//! Engine connection options.

use std::path::PathBuf;

/// Resolved connection parameters for the management API.
///
/// Credential resolution (config files, prompts, keyrings) happens in the
/// caller; by the time this struct exists everything is plain values.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Base URL of the API, e.g. `https://engine.example.com/api`.
    pub url: String,
    /// Basic-auth user. Empty disables authentication (test servers).
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// Extra CA bundle trusted for the engine endpoint.
    pub ca_file: Option<PathBuf>,
    /// Skip TLS verification for the engine endpoint.
    pub insecure: bool,
}

impl EngineOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_ca_file(mut self, ca_file: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(ca_file.into());
        self
    }

    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}
