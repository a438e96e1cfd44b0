// ── Runtime client configuration ──
//
// Describes how to reach the backend and how long cached reads stay fresh.
// Never touches disk: the CLI builds a `ClientConfig` from its profile and
// hands it in.

use std::path::PathBuf;
use std::time::Duration;

use botdesk_api::{TlsMode, TransportConfig};
use url::Url;

use crate::retry::RetryPolicy;

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development backends).
    DangerAcceptInvalid,
}

/// Configuration for one backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL (e.g., `https://bots.example.com`).
    pub base_url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long a cached read is served without refetching.
    pub stale_time: Duration,
    /// Backoff for failed reads.
    pub retry: RetryPolicy,
    /// `version.json` poll interval. Zero disables the watcher.
    pub version_poll_interval: Duration,
}

impl ClientConfig {
    /// Defaults for everything but the URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            stale_time: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            version_poll_interval: Duration::from_secs(300),
        }
    }

    /// Config for [`DEFAULT_API_URL`].
    pub fn local() -> Result<Self, url::ParseError> {
        Url::parse(DEFAULT_API_URL).map(Self::new)
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            cookie_jar: None,
        }
    }
}
