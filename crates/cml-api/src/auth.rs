use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// Endpoints reachable without a bearer token.
pub(crate) const AUTH_EXTENDED: &str = "auth_extended";
pub(crate) const AUTH_OK: &str = "authok";
pub(crate) const SYSTEM_INFORMATION: &str = "system_information";

/// Whether a request to `path` (relative to `/api/v0/`, no query) needs auth.
///
/// Exactly `auth_extended`, `authok` and `system_information` do not.
pub fn needs_auth(path: &str) -> bool {
    !matches!(path, AUTH_EXTENDED | AUTH_OK | SYSTEM_INFORMATION)
}

/// Credentials for authenticating with a CML controller.
///
/// A token takes precedence; username/password are used to log in again
/// once the token expires.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    /// Pre-issued bearer token.
    Token(SecretString),
    /// Username/password login via `auth_extended`.
    Credentials {
        username: String,
        password: SecretString,
    },
    /// Token first, credentials as fallback on expiry.
    Both {
        token: SecretString,
        username: String,
        password: SecretString,
    },
}

/// Connection state of a [`Client`](crate::Client).
///
/// ```text
/// Initial → CheckVersion → AuthRequired → Authenticating → Authenticated
///                               ▲                                │
///                               └────────────── 401 ─────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Initial,
    CheckVersion,
    AuthRequired,
    Authenticating,
    Authenticated,
}

/// `POST auth_extended` request body.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST auth_extended` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub id: String,
    #[serde(default)]
    pub username: String,
    pub token: String,
    #[serde(default)]
    pub admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_three_paths_skip_auth() {
        assert!(!needs_auth("auth_extended"));
        assert!(!needs_auth("authok"));
        assert!(!needs_auth("system_information"));
        assert!(needs_auth("labs"));
        assert!(needs_auth("groups"));
        assert!(needs_auth("authok/extra"));
    }

    #[test]
    fn state_displays_snake_case() {
        assert_eq!(SessionState::AuthRequired.to_string(), "auth_required");
    }
}
