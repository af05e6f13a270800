use thiserror::Error;

/// Top-level error type for the `cml-api` crate.
///
/// Covers every failure mode of the client: version negotiation,
/// authentication, transport, server responses, and decoding.
/// Lower layers bubble their errors up unchanged; the orchestrator only
/// turns a 401 into a retry and other unexpected statuses into
/// [`Error::ServerError`].
#[derive(Debug, Error)]
pub enum Error {
    // ── Version gate ────────────────────────────────────────────────
    /// The controller reported `ready=false` from `system_information`.
    #[error("Controller is not ready")]
    SystemNotReady,

    /// The controller version failed the pattern or semver constraint.
    /// Sticky for the lifetime of a [`Client`](crate::Client).
    #[error("Incompatible controller version {version:?}: {reason}")]
    IncompatibleVersion { version: String, reason: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The request needs auth and neither a token nor credentials are set.
    #[error("No credentials configured -- set a token or username/password")]
    NoCredentials,

    /// A 401 arrived while a token was in use and there are no
    /// credentials to log in again with.
    #[error("API token expired -- re-authentication required")]
    TokenExpired,

    /// A 401 persisted after the single retry (or the login itself was rejected).
    #[error("Unauthorized")]
    Unauthorized,

    // ── Lookups ─────────────────────────────────────────────────────
    /// A by-name / by-label lookup found no match.
    #[error("{kind} not found: {key}")]
    ElementNotFound { kind: &'static str, key: String },

    // ── Server ──────────────────────────────────────────────────────
    /// Any HTTP status other than 200/201/204 (and the handled 401).
    #[error("Server error (HTTP {status}): {body}")]
    ServerError { status: u16, body: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, TLS, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The supplied CA bundle held no usable certificate.
    #[error("Invalid CA certificate: {0}")]
    InvalidCertificate(String),

    /// The bearer token holds bytes that cannot go into an HTTP header.
    #[error("Invalid API token: not a valid header value")]
    InvalidToken,

    /// CA installation is impossible on a substituted transport.
    #[error("Transport is mocked -- cannot install a CA pool")]
    MockedTransport,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Control flow ────────────────────────────────────────────────
    /// The caller's cancellation token fired, or a sibling task in a
    /// deep fetch failed first.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns `true` for lookup misses and HTTP 404 responses.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::ServerError { status: 404, .. }
        )
    }

    /// Returns `true` if this error came out of the authentication flow.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::NoCredentials | Self::TokenExpired | Self::Unauthorized
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::SystemNotReady => true,
            Self::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::ElementNotFound {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn decode(err: &serde_json::Error, body: &[u8]) -> Self {
        let body = String::from_utf8_lossy(body).into_owned();
        let preview: String = body.chars().take(200).collect();
        Self::Deserialization {
            message: format!("{err} (body preview: {preview:?})"),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_covers_lookup_and_http_404() {
        assert!(Error::not_found("node", "R1").is_not_found());
        assert!(
            Error::ServerError {
                status: 404,
                body: String::new()
            }
            .is_not_found()
        );
        assert!(
            !Error::ServerError {
                status: 500,
                body: String::new()
            }
            .is_not_found()
        );
    }

    #[test]
    fn decode_error_keeps_full_body() {
        let body = br#"{"id": 12"#;
        let err = serde_json::from_slice::<serde_json::Value>(body).expect_err("truncated json");
        match Error::decode(&err, body) {
            Error::Deserialization { body, .. } => assert_eq!(body, r#"{"id": 12"#),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
