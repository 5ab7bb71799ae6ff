// ── Runtime connection configuration ──
//
// Describes how to reach a DeviceHub inventory. Carries the session token
// and transport tuning but never touches disk: the CLI (or any other
// front end) builds a `ClientConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use dhub_api::TransportConfig;

/// Default page size requested by list views.
pub const DEFAULT_PER_PAGE: u32 = 30;

/// Configuration for talking to a single DeviceHub server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., `https://api.devicetag.io`).
    pub url: Url,
    /// Inventory database; `None` uses the server default.
    pub database: Option<String>,
    /// Session token obtained at login.
    pub token: Option<SecretString>,
    /// Request timeout.
    pub timeout: Duration,
    /// Page size hint for list views.
    pub per_page: u32,
    /// Accept self-signed certificates.
    pub accept_invalid_certs: bool,
}

impl ClientConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            database: None,
            token: None,
            timeout: Duration::from_secs(30),
            per_page: DEFAULT_PER_PAGE,
            accept_invalid_certs: false,
        }
    }

    /// Transport settings derived from this config.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            token: self.token.clone(),
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}
