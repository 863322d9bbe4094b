//! Configuration structures for HDAP directory clients.
//!
//! This module provides the configuration type controlling how a client
//! connects to an HDAP endpoint, with validation applied at construction.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Configuration for a directory client instance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DirectoryConfig {
    /// Base URL of the HDAP endpoint (e.g., `https://directory.example.com/hdap`)
    #[validate(url)]
    pub api_base: String,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to a custom CA certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<std::path::PathBuf>,
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_tls_verify() -> bool {
    true
}

impl DirectoryConfig {
    /// Create a new configuration for the given HDAP endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is invalid or validation
    /// fails.
    pub fn new(api_base: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            api_base: api_base.into(),
            request_timeout_secs: default_request_timeout_secs(),
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
        };

        config
            .validate()
            .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Set the request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set a custom CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: std::path::PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Get the request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse and validate the API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL cannot be parsed.
    pub fn parse_api_base(&self) -> Result<Url, Error> {
        Url::parse(&self.api_base)
            .map_err(|e| Error::Config(format!("Invalid API base URL: {e}")))
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080/hdap".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
        }
    }
}
