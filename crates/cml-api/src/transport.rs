// Transport layer
//
// A single HTTP exchange: request in, status + raw body out. The real
// implementation wraps `reqwest::Client` with TLS and timeout settings;
// tests may substitute any other `Transport` (a recorded responder).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use rustls_pki_types::CertificateDer;
use rustls_pki_types::pem::PemObject;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::Error;

/// Default total timeout for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the built-in certificate store.
    #[default]
    System,
    /// Trust only the certificates in this PEM bundle.
    CustomCa(Vec<u8>),
    /// Accept any certificate (`insecure`).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("cml-api/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(pem) => {
                builder = builder.tls_built_in_root_certs(false);
                for cert in parse_ca_pool(pem)? {
                    builder = builder.add_root_certificate(cert);
                }
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder.build().map_err(Error::Transport)
    }
}

/// Parse a PEM bundle into root certificates.
///
/// Fails with [`Error::InvalidCertificate`] when the bundle is malformed
/// or holds no certificate at all.
pub fn parse_ca_pool(pem: &[u8]) -> Result<Vec<reqwest::Certificate>, Error> {
    let ders = CertificateDer::pem_slice_iter(pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::InvalidCertificate(format!("failed to parse PEM: {e}")))?;

    if ders.is_empty() {
        return Err(Error::InvalidCertificate(
            "no certificate found in PEM data".into(),
        ));
    }

    ders.iter()
        .map(|der| {
            reqwest::Certificate::from_der(der.as_ref())
                .map_err(|e| Error::InvalidCertificate(e.to_string()))
        })
        .collect()
}

// ── Request / response ───────────────────────────────────────────────

/// One outgoing API call, fully resolved.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    /// Bearer token, present iff the session is authenticated.
    pub token: Option<SecretString>,
    /// Already-encoded JSON body.
    pub body: Option<Bytes>,
}

impl ApiRequest {
    /// The path relative to `/api/v0/`, without the query string.
    pub fn api_path(&self) -> &str {
        let path = self.url.path();
        path.find("/api/v0/")
            .map_or(path, |idx| &path[idx + "/api/v0/".len()..])
    }
}

/// Raw status and body returned by a [`Transport`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

/// The seam between the orchestrator and the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single HTTP exchange.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error>;

    /// Whether this is the real HTTP transport. CA installation is only
    /// possible when it is.
    fn is_http(&self) -> bool {
        false
    }
}

/// The `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
        })
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .header(ACCEPT, "application/json");

        if let Some(token) = request.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|_| Error::InvalidToken)?;
            value.set_sensitive(true);
            builder = builder.header(AUTHORIZATION, value);
        }

        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok(ApiResponse { status, body })
    }

    fn is_http(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pem_is_rejected() {
        let err = parse_ca_pool(b"").expect_err("empty bundle");
        assert!(matches!(err, Error::InvalidCertificate(_)), "{err:?}");
    }

    #[test]
    fn garbage_pem_is_rejected() {
        let err = parse_ca_pool(b"this is not a certificate").expect_err("garbage bundle");
        assert!(matches!(err, Error::InvalidCertificate(_)), "{err:?}");
    }

    #[tokio::test]
    async fn token_with_control_characters_is_rejected_before_sending() {
        let transport = HttpTransport::new(&TransportConfig::default()).expect("transport");
        let request = ApiRequest {
            method: Method::GET,
            url: Url::parse("http://127.0.0.1:9/api/v0/labs").expect("url"),
            token: Some(SecretString::from("abc\ndef")),
            body: None,
        };
        let err = transport.send(request).await.expect_err("bad token");
        assert!(matches!(err, Error::InvalidToken), "{err:?}");
    }

    #[test]
    fn api_path_strips_prefix_and_query() {
        let req = ApiRequest {
            method: Method::GET,
            url: Url::parse("https://cml.example/api/v0/labs/abc/nodes?data=true").expect("url"),
            token: None,
            body: None,
        };
        assert_eq!(req.api_path(), "labs/abc/nodes");
    }
}
