// Session state machine
//
// Owns the connection state, token, credentials and the version verdict.
// Drives `Initial → CheckVersion → AuthRequired → Authenticating →
// Authenticated`, and back to `AuthRequired` on a 401. Sub-requests made
// from here run at `depth >= 1` so they never touch the session gate.

use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::auth::{
    AUTH_EXTENDED, AuthCredentials, AuthResponse, LoginRequest, SYSTEM_INFORMATION, SessionState,
};
use crate::client::Client;
use crate::error::Error;
use crate::version::{self, SystemInformation, VersionVerdict};

/// Mutable per-client session fields. Guarded by a `std::sync::RwLock`
/// that is never held across an `.await`.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) state: SessionState,
    pub(crate) token: Option<SecretString>,
    pub(crate) credentials: Option<(String, SecretString)>,
    pub(crate) verdict: Option<VersionVerdict>,
    /// Sticky `(version, reason)` once the gate rejected the controller.
    pub(crate) incompatible: Option<(String, String)>,
    /// Bumped whenever a new token is installed, so concurrent 401s can
    /// tell whether someone else already re-authenticated.
    pub(crate) generation: u64,
}

impl Session {
    pub(crate) fn new(auth: Option<AuthCredentials>) -> Self {
        let (token, credentials) = match auth {
            None => (None, None),
            Some(AuthCredentials::Token(token)) => (Some(token), None),
            Some(AuthCredentials::Credentials { username, password }) => {
                (None, Some((username, password)))
            }
            Some(AuthCredentials::Both {
                token,
                username,
                password,
            }) => (Some(token), Some((username, password))),
        };
        Self {
            state: SessionState::Initial,
            token: token.filter(|t| !t.expose_secret().is_empty()),
            credentials,
            verdict: None,
            incompatible: None,
            generation: 0,
        }
    }

    pub(crate) fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            trace!(from = %self.state, to = %next, "session state");
            self.state = next;
        }
    }

    pub(crate) fn incompatibility(&self) -> Option<Error> {
        self.incompatible
            .as_ref()
            .map(|(version, reason)| Error::IncompatibleVersion {
                version: version.clone(),
                reason: reason.clone(),
            })
    }

    /// Handle a 401 seen by a request sent under token `generation`.
    ///
    /// Clears the token and demotes to `AuthRequired` unless another
    /// caller already installed a newer token. Fails when there is
    /// nothing to log in with.
    pub(crate) fn demote(&mut self, generation: u64) -> Result<(), Error> {
        if self.generation != generation && self.state == SessionState::Authenticated {
            return Ok(());
        }
        let had_token = self.token.take().is_some();
        self.set_state(SessionState::AuthRequired);
        if self.credentials.is_none() {
            return Err(if had_token {
                Error::TokenExpired
            } else {
                Error::NoCredentials
            });
        }
        Ok(())
    }
}

impl Client {
    /// Run the version gate once per client.
    ///
    /// A sticky incompatibility is returned without any network traffic.
    /// `SystemNotReady` and transport errors reset the state to `Initial`
    /// so the next call probes again.
    pub(crate) async fn ensure_version(
        &self,
        cancel: &CancellationToken,
        depth: u8,
    ) -> Result<(), Error> {
        {
            let mut session = self.session_write();
            if let Some(err) = session.incompatibility() {
                return Err(err);
            }
            if session.verdict.is_some() {
                return Ok(());
            }
            session.set_state(SessionState::CheckVersion);
        }

        let checked = self
            .get_at::<SystemInformation>(cancel, SYSTEM_INFORMATION, depth)
            .await
            .and_then(|info| version::check(&info));

        let mut session = self.session_write();
        match checked {
            Ok(verdict) => {
                if verdict.dev_build {
                    warn!(version = %verdict.version, "controller runs a development build");
                }
                debug!(version = %verdict.version, "controller version accepted");
                session.verdict = Some(verdict);
                if session.state == SessionState::CheckVersion {
                    session.set_state(SessionState::AuthRequired);
                }
                Ok(())
            }
            Err(Error::IncompatibleVersion { version, reason }) => {
                warn!(%version, %reason, "incompatible controller version");
                session.incompatible = Some((version.clone(), reason.clone()));
                Err(Error::IncompatibleVersion { version, reason })
            }
            Err(err) => {
                session.set_state(SessionState::Initial);
                Err(err)
            }
        }
    }

    /// Make sure the session holds a usable token.
    ///
    /// A configured token is trusted as-is; it is not probed against
    /// `authok`, the first real request surfaces an expired token as a
    /// 401. Otherwise logs in with username/password.
    pub(crate) async fn ensure_authenticated(
        &self,
        cancel: &CancellationToken,
        depth: u8,
    ) -> Result<(), Error> {
        let (username, password) = {
            let mut session = self.session_write();
            if session.state == SessionState::Authenticated {
                return Ok(());
            }
            if session.token.is_some() {
                session.set_state(SessionState::Authenticated);
                return Ok(());
            }
            let Some((username, password)) = session.credentials.clone() else {
                return Err(Error::NoCredentials);
            };
            session.set_state(SessionState::Authenticating);
            (username, password)
        };

        debug!(%username, "logging in");
        let login = LoginRequest {
            username: &username,
            password: password.expose_secret(),
        };
        let result = self
            .post_at::<AuthResponse, _>(cancel, AUTH_EXTENDED, Some(&login), depth)
            .await
            .and_then(|auth| {
                if auth.token.is_empty() {
                    Err(Error::Unauthorized)
                } else {
                    Ok(auth)
                }
            });

        let mut session = self.session_write();
        match result {
            Ok(auth) => {
                session.token = Some(SecretString::from(auth.token));
                session.generation += 1;
                session.set_state(SessionState::Authenticated);
                info!(username = %auth.username, admin = auth.admin, "authenticated");
                Ok(())
            }
            Err(err) => {
                session.set_state(SessionState::AuthRequired);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Option<AuthCredentials> {
        Some(AuthCredentials::Credentials {
            username: "admin".into(),
            password: SecretString::from("pw"),
        })
    }

    #[test]
    fn empty_token_counts_as_none() {
        let session = Session::new(Some(AuthCredentials::Token(SecretString::from(""))));
        assert!(session.token.is_none());
    }

    #[test]
    fn demote_without_credentials_reports_token_expiry() {
        let mut session = Session::new(Some(AuthCredentials::Token(SecretString::from("T1"))));
        session.state = SessionState::Authenticated;
        let err = session.demote(0).expect_err("no creds");
        assert!(matches!(err, Error::TokenExpired));
        assert!(session.token.is_none());
        assert_eq!(session.state, SessionState::AuthRequired);
    }

    #[test]
    fn demote_without_anything_reports_no_credentials() {
        let mut session = Session::new(None);
        assert!(matches!(session.demote(0), Err(Error::NoCredentials)));
    }

    #[test]
    fn demote_with_credentials_clears_token() {
        let mut session = Session::new(creds());
        session.token = Some(SecretString::from("T1"));
        session.state = SessionState::Authenticated;
        session.demote(0).expect("credentials available");
        assert!(session.token.is_none());
        assert_eq!(session.state, SessionState::AuthRequired);
    }

    #[test]
    fn stale_401_does_not_clobber_fresh_token() {
        let mut session = Session::new(creds());
        session.token = Some(SecretString::from("T2"));
        session.generation = 2;
        session.state = SessionState::Authenticated;
        session.demote(1).expect("already refreshed");
        assert!(session.token.is_some());
        assert_eq!(session.state, SessionState::Authenticated);
    }
}
