// ── Runtime connection configuration ──
//
// Describes *how* to reach a controller: base URL, TLS, timeout, cache
// and credentials. Never touches disk; `cml-config` builds one from a
// profile and hands it in.

use std::time::Duration;

use url::Url;

use crate::auth::AuthCredentials;
use crate::transport::{DEFAULT_TIMEOUT, TlsMode, TransportConfig};

/// Configuration for connecting to a single controller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Controller base URL including scheme (e.g. `https://cml.example.com`).
    pub host: Url,
    /// TLS verification strategy.
    pub tls: TlsMode,
    /// Total timeout per request.
    pub timeout: Duration,
    /// Keep an in-memory lab cache.
    pub use_cache: bool,
    /// Token and/or username+password.
    pub auth: Option<AuthCredentials>,
}

impl ClientConfig {
    pub fn new(host: Url) -> Self {
        Self {
            host,
            tls: TlsMode::System,
            timeout: DEFAULT_TIMEOUT,
            use_cache: false,
            auth: None,
        }
    }

    /// Disable TLS peer verification.
    pub fn insecure(mut self, insecure: bool) -> Self {
        if insecure {
            self.tls = TlsMode::DangerAcceptInvalid;
        }
        self
    }

    /// Trust only the certificates in this PEM bundle.
    pub fn ca_cert(mut self, pem: Vec<u8>) -> Self {
        self.tls = TlsMode::CustomCa(pem);
        self
    }

    pub fn use_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    pub fn auth(mut self, auth: AuthCredentials) -> Self {
        self.auth = Some(auth);
        self
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }
}
