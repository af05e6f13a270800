// Request orchestrator
//
// Wraps a `Transport` with URL construction, the version gate, session
// authentication, a single 401 retry, and status mapping. Endpoint
// families (labs, nodes, links, ...) are implemented as inherent methods
// in `api/` to keep this module focused on request mechanics.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::MutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::{
    AUTH_EXTENDED, AUTH_OK, AuthCredentials, SYSTEM_INFORMATION, SessionState, needs_auth,
};
use crate::cache::LabCache;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::session::Session;
use crate::transport::{
    ApiRequest, ApiResponse, HttpTransport, TlsMode, Transport, TransportConfig,
};
use crate::version::SystemInformation;

/// Async client for one CML controller.
///
/// Cheap to clone; clones share the session, transport and lab cache.
/// Every operation takes a [`CancellationToken`] and fails with
/// [`Error::Cancelled`] once it fires.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: Url,
    transport: RwLock<Arc<dyn Transport>>,
    /// `None` when the transport was substituted at construction.
    transport_config: Option<TransportConfig>,
    session: RwLock<Session>,
    /// Serializes top-level calls while the session is not authenticated.
    gate: tokio::sync::Mutex<()>,
    cache: Option<LabCache>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("state", &self.state())
            .field("use_cache", &self.use_cache())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client with the real HTTP transport.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport_config = config.transport();
        let transport = HttpTransport::new(&transport_config)?;
        Ok(Self::build(
            config.host,
            Arc::new(transport),
            Some(transport_config),
            config.use_cache,
            Session::new(config.auth),
        ))
    }

    /// Build a client on top of a substituted transport (e.g. a recorded
    /// responder). CA installation is unavailable on such a client.
    pub fn with_transport(
        host: Url,
        transport: Arc<dyn Transport>,
        use_cache: bool,
        auth: Option<AuthCredentials>,
    ) -> Self {
        Self::build(host, transport, None, use_cache, Session::new(auth))
    }

    fn build(
        base_url: Url,
        transport: Arc<dyn Transport>,
        transport_config: Option<TransportConfig>,
        use_cache: bool,
        session: Session,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_url,
                transport: RwLock::new(transport),
                transport_config,
                session: RwLock::new(session),
                gate: tokio::sync::Mutex::new(()),
                cache: use_cache.then(LabCache::default),
            }),
        }
    }

    // ── Session accessors ────────────────────────────────────────────

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session_read().state
    }

    /// Controller version, once the version gate has run.
    pub fn version(&self) -> Option<String> {
        self.session_read()
            .verdict
            .as_ref()
            .map(|v| v.version.clone())
    }

    pub fn use_cache(&self) -> bool {
        self.inner.cache.is_some()
    }

    /// Replace the bearer token. Takes effect on the next request; the
    /// token is not probed here.
    pub fn set_token(&self, token: SecretString) {
        let mut session = self.session_write();
        if token.expose_secret().is_empty() {
            session.token = None;
            if session.state == SessionState::Authenticated {
                session.set_state(SessionState::AuthRequired);
            }
        } else {
            session.token = Some(token);
        }
        session.generation += 1;
    }

    /// Set credentials used to log in, and to log in again on token expiry.
    pub fn set_username_password(&self, username: impl Into<String>, password: SecretString) {
        self.session_write().credentials = Some((username.into(), password));
    }

    /// Trust only the certificates in `pem` from now on.
    ///
    /// Rebuilds the HTTP transport from the construction-time
    /// [`TransportConfig`] with its TLS mode replaced, so an earlier
    /// `insecure` setting no longer applies. Anything set on the old
    /// `reqwest` client outside that config is not carried over. Fails
    /// with [`Error::MockedTransport`] when the transport was substituted.
    pub fn set_ca_pool(&self, pem: &[u8]) -> Result<(), Error> {
        let Some(base) = &self.inner.transport_config else {
            return Err(Error::MockedTransport);
        };
        if !self.transport().is_http() {
            return Err(Error::MockedTransport);
        }
        let transport = HttpTransport::new(&with_ca_pool(base, pem))?;
        *self
            .inner
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(transport);
        debug!("installed custom CA pool");
        Ok(())
    }

    /// Whether the current token is still accepted.
    ///
    /// Probes `authok`. A 401 yields `false` without re-authenticating.
    pub async fn token_valid(&self, cancel: &CancellationToken) -> Result<bool, Error> {
        if self.session_read().token.is_none() {
            return Ok(false);
        }
        match self.request(cancel, Method::GET, AUTH_OK, None, 0).await {
            Ok(_) => Ok(true),
            Err(Error::Unauthorized) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `GET system_information`
    pub async fn system_information(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SystemInformation, Error> {
        self.get(cancel, SYSTEM_INFORMATION).await
    }

    // ── Typed helpers ────────────────────────────────────────────────

    /// `GET {path}` and decode the body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<T, Error> {
        self.get_at(cancel, path, 0).await
    }

    /// `POST {path}` with an optional JSON body and decode the response.
    pub async fn post<T, B>(
        &self,
        cancel: &CancellationToken,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.post_at(cancel, path, body, 0).await
    }

    /// `PATCH {path}` with a JSON body and decode the response.
    pub async fn patch<T, B>(
        &self,
        cancel: &CancellationToken,
        path: &str,
        body: &B,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let body = encode(body)?;
        let bytes = self
            .request(cancel, Method::PATCH, path, Some(body), 0)
            .await?;
        decode(&bytes)
    }

    /// `PUT {path}` without a body, discarding the response.
    pub async fn put(&self, cancel: &CancellationToken, path: &str) -> Result<(), Error> {
        self.request(cancel, Method::PUT, path, None, 0).await?;
        Ok(())
    }

    /// `DELETE {path}`, discarding the response.
    pub async fn delete(&self, cancel: &CancellationToken, path: &str) -> Result<(), Error> {
        self.request(cancel, Method::DELETE, path, None, 0).await?;
        Ok(())
    }

    /// Send a pre-encoded body and return the raw response body.
    pub async fn send_raw(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<Bytes, Error> {
        self.request(cancel, method, path, body, 0).await
    }

    pub(crate) async fn get_at<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
        depth: u8,
    ) -> Result<T, Error> {
        let bytes = self.request(cancel, Method::GET, path, None, depth).await?;
        decode(&bytes)
    }

    pub(crate) async fn post_at<T, B>(
        &self,
        cancel: &CancellationToken,
        path: &str,
        body: Option<&B>,
        depth: u8,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let body = body.map(encode).transpose()?;
        let bytes = self.request(cancel, Method::POST, path, body, depth).await?;
        decode(&bytes)
    }

    // ── Core request path ────────────────────────────────────────────

    /// Send one API call through the session.
    ///
    /// `depth` is 0 for caller-initiated requests and grows for requests
    /// the session issues on its own behalf (version probe, login). Only
    /// depth-0 calls made while unauthenticated take the gate, so the
    /// nested calls never wait on a lock their parent holds.
    ///
    /// Boxed because the version gate and login call back into here.
    pub(crate) fn request<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        method: Method,
        path: &'a str,
        body: Option<Bytes>,
        depth: u8,
    ) -> BoxFuture<'a, Result<Bytes, Error>> {
        async move {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Some(err) = self.session_read().incompatibility() {
                return Err(err);
            }

            let mut gate = None;
            if depth == 0 && self.state() != SessionState::Authenticated {
                gate = Some(self.lock_gate(cancel).await?);
            }

            let api_path = strip_query(path);
            let url = self.api_url(path)?;

            if api_path != SYSTEM_INFORMATION {
                self.ensure_version(cancel, depth + 1).await?;
            }
            let probing_token = api_path == AUTH_OK && self.session_read().token.is_some();
            if needs_auth(api_path) || probing_token {
                if gate.is_none() && depth == 0 && self.state() != SessionState::Authenticated {
                    gate = Some(self.lock_gate(cancel).await?);
                }
                self.ensure_authenticated(cancel, depth + 1).await?;
            }

            let (response, generation) = self
                .send_once(cancel, method.clone(), url.clone(), api_path, body.clone())
                .await?;
            if response.status != 401 {
                return check_status(response);
            }
            if !needs_auth(api_path) {
                return Err(Error::Unauthorized);
            }

            // One re-authentication, then one retry.
            if gate.is_none() && depth == 0 {
                gate = Some(self.lock_gate(cancel).await?);
            }
            debug!(%url, "received 401, re-authenticating");
            self.session_write().demote(generation)?;
            self.ensure_authenticated(cancel, depth + 1).await?;

            let (response, _) = self
                .send_once(cancel, method, url, api_path, body)
                .await?;
            drop(gate);
            if response.status == 401 {
                warn!(path = api_path, "still unauthorized after re-authentication");
                return Err(Error::Unauthorized);
            }
            check_status(response)
        }
        .boxed()
    }

    async fn send_once(
        &self,
        cancel: &CancellationToken,
        method: Method,
        url: Url,
        api_path: &str,
        body: Option<Bytes>,
    ) -> Result<(ApiResponse, u64), Error> {
        let (token, generation) = {
            let session = self.session_read();
            let authenticated = session.state == SessionState::Authenticated;
            let token = if authenticated && api_path != AUTH_EXTENDED {
                session.token.clone()
            } else {
                None
            };
            (token, session.generation)
        };

        debug!("{method} {url}");
        let transport = self.transport();
        let request = ApiRequest {
            method,
            url,
            token,
            body,
        };
        let response = cancellable(cancel, transport.send(request)).await??;
        trace!(status = response.status, bytes = response.body.len(), "response");
        Ok((response, generation))
    }

    async fn lock_gate(&self, cancel: &CancellationToken) -> Result<MutexGuard<'_, ()>, Error> {
        cancellable(cancel, self.inner.gate.lock()).await
    }

    /// `<host>/api/v0/<path>`
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/api/v0/{path}"))?)
    }

    fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(
            &self
                .inner
                .transport
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    pub(crate) fn session_read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn session_write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The lab cache, when enabled.
    pub(crate) fn cache(&self) -> Option<&LabCache> {
        self.inner.cache.as_ref()
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Race `fut` against cancellation.
pub(crate) async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, Error> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        out = fut => Ok(out),
    }
}

fn with_ca_pool(base: &TransportConfig, pem: &[u8]) -> TransportConfig {
    TransportConfig {
        tls: TlsMode::CustomCa(pem.to_vec()),
        ..base.clone()
    }
}

fn strip_query(path: &str) -> &str {
    let path = path.trim_start_matches('/');
    path.split_once('?').map_or(path, |(p, _)| p)
}

fn check_status(response: ApiResponse) -> Result<Bytes, Error> {
    match response.status {
        200 | 201 | 204 => Ok(response.body),
        status => Err(Error::ServerError {
            status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|e| Error::decode(&e, body))
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Bytes, Error> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| Error::decode(&e, b""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_not_part_of_the_api_path() {
        assert_eq!(strip_query("labs/L/nodes?data=true"), "labs/L/nodes");
        assert_eq!(strip_query("/authok"), "authok");
        assert_eq!(strip_query("system_information"), "system_information");
    }

    #[test]
    fn only_2xx_success_codes_pass() {
        for status in [200, 201, 204] {
            let ok = check_status(ApiResponse {
                status,
                body: Bytes::from_static(b"{}"),
            });
            assert!(ok.is_ok(), "{status}");
        }
        let err = check_status(ApiResponse {
            status: 202,
            body: Bytes::from_static(b"queued"),
        })
        .expect_err("202 is not accepted");
        assert!(
            matches!(err, Error::ServerError { status: 202, ref body } if body == "queued"),
            "{err:?}"
        );
    }

    #[test]
    fn ca_pool_replaces_insecure_mode_and_keeps_timeout() {
        let base = TransportConfig {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: std::time::Duration::from_secs(42),
        };
        let config = with_ca_pool(&base, b"pem");
        assert!(matches!(config.tls, TlsMode::CustomCa(ref pem) if pem == b"pem"));
        assert_eq!(config.timeout, base.timeout);
    }

    #[test]
    fn api_url_joins_host_and_prefix() {
        let client = Client::new(ClientConfig::new(
            Url::parse("https://cml.example/").expect("url"),
        ))
        .expect("client");
        let url = client.api_url("labs/L?data=true").expect("api url");
        assert_eq!(url.as_str(), "https://cml.example/api/v0/labs/L?data=true");
    }
}
