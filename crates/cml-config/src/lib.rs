//! Shared configuration for CML tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `cml_api::ClientConfig`. The CLI layers its
//! flag overrides on top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cml_api::{AuthCredentials, ClientConfig};

/// Keyring service name under which secrets are stored.
pub const KEYRING_SERVICE: &str = "cmlctl";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found in config")]
    UnknownProfile { profile: String },

    #[error("cannot read CA certificate {path}: {source}")]
    CaCert {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick a profile by name, falling back to `default_profile`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub use_cache: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            use_cache: false,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    15
}

/// A named controller profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Controller base URL (e.g., "https://cml.example.com").
    pub host: String,

    /// Username for `auth_extended` login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or `CML_PASSWORD`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Pre-issued API token (plaintext).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable name containing the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Path to a PEM CA bundle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_cache: Option<bool>,

    /// Request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "cml", "cmlctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("cmlctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Nested keys use a double underscore: `CML_DEFAULTS__TIMEOUT=30`,
/// `CML_PROFILES__LAB__HOST=https://...`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CML_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_secret(profile_name: &str, kind: &str) -> Option<SecretString> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{kind}")).ok()?;
    entry.get_password().ok().map(SecretString::from)
}

/// Resolve a bearer token: `token_env` variable, plaintext `token`, then
/// the system keyring.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    if let Some(val) = profile
        .token_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Some(SecretString::from(val));
    }
    if let Some(ref token) = profile.token {
        return Some(SecretString::from(token.clone()));
    }
    keyring_secret(profile_name, "token")
}

/// Resolve username + password. The username comes from the profile or
/// `CML_USERNAME`; the password from `CML_PASSWORD`, the keyring, then
/// plaintext.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Option<(String, SecretString)> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var("CML_USERNAME").ok())?;

    // 1. Env var
    if let Ok(pw) = std::env::var("CML_PASSWORD") {
        return Some((username, SecretString::from(pw)));
    }

    // 2. Keyring
    if let Some(pw) = keyring_secret(profile_name, "password") {
        return Some((username, pw));
    }

    // 3. Plaintext in config
    profile
        .password
        .as_ref()
        .map(|pw| (username, SecretString::from(pw.clone())))
}

/// Combine whatever the profile yields. A token with credentials lets
/// the client log in again once the token expires.
pub fn resolve_auth(profile: &Profile, profile_name: &str) -> Result<AuthCredentials, ConfigError> {
    let token = resolve_token(profile, profile_name);
    let credentials = resolve_credentials(profile, profile_name);
    match (token, credentials) {
        (Some(token), Some((username, password))) => Ok(AuthCredentials::Both {
            token,
            username,
            password,
        }),
        (Some(token), None) => Ok(AuthCredentials::Token(token)),
        (None, Some((username, password))) => {
            Ok(AuthCredentials::Credentials { username, password })
        }
        (None, None) => Err(ConfigError::NoCredentials {
            profile: profile_name.into(),
        }),
    }
}

/// Build a `ClientConfig` from a profile, filling gaps from `defaults`.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let host: url::Url = profile.host.parse().map_err(|_| ConfigError::Validation {
        field: "host".into(),
        reason: format!("invalid URL: {}", profile.host),
    })?;

    let auth = resolve_auth(profile, profile_name)?;

    let mut config = ClientConfig::new(host)
        .auth(auth)
        .use_cache(profile.use_cache.unwrap_or(defaults.use_cache));

    if profile.insecure.unwrap_or(defaults.insecure) {
        config = config.insecure(true);
    } else if let Some(ref ca_path) = profile.ca_cert {
        let pem = std::fs::read(ca_path).map_err(|source| ConfigError::CaCert {
            path: ca_path.clone(),
            source,
        })?;
        config = config.ca_cert(pem);
    }

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(config)
}

#[cfg(test)]
mod tests {
    use cml_api::TlsMode;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn token_profile(host: &str) -> Profile {
        Profile {
            host: host.into(),
            token: Some("T".into()),
            ..Profile::default()
        }
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "lab"

[defaults]
output = "json"

[profiles.lab]
host = "https://cml.example.com"
username = "admin"
use_cache = true
"#,
        )
        .expect("write config");

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.timeout, 15);
        let (name, profile) = config.profile(None).expect("default profile");
        assert_eq!(name, "lab");
        assert_eq!(profile.host, "https://cml.example.com");
        assert_eq!(profile.username.as_deref(), Some("admin"));
        assert_eq!(profile.use_cache, Some(true));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn unknown_profile_is_reported_by_name() {
        let config = Config::default();
        let err = config.profile(Some("prod")).expect_err("no such profile");
        assert!(matches!(err, ConfigError::UnknownProfile { ref profile } if profile == "prod"));
    }

    #[test]
    fn saved_config_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config
            .profiles
            .insert("default".into(), token_profile("https://cml.local"));

        save_config_to(&config, &path).expect("save");
        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.contains("[profiles.default]"), "{text}");
        assert!(!text.contains("ca_cert"), "{text}");

        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded.profiles["default"].token.as_deref(), Some("T"));
    }

    #[test]
    fn profile_translation_applies_overrides() {
        let mut profile = token_profile("https://cml.local");
        profile.insecure = Some(true);
        profile.timeout = Some(42);

        let config =
            profile_to_client_config(&profile, "default", &Defaults::default()).expect("config");
        assert_eq!(config.host.as_str(), "https://cml.local/");
        assert!(matches!(config.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(config.timeout, Duration::from_secs(42));
        assert!(!config.use_cache);
        match config.auth {
            Some(AuthCredentials::Token(token)) => assert_eq!(token.expose_secret(), "T"),
            other => panic!("expected token auth, got {other:?}"),
        }
    }

    #[test]
    fn ca_cert_is_read_into_tls_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ca = dir.path().join("ca.pem");
        std::fs::write(&ca, b"PEM").expect("write ca");

        let mut profile = token_profile("https://cml.local");
        profile.ca_cert = Some(ca);
        let config =
            profile_to_client_config(&profile, "default", &Defaults::default()).expect("config");
        assert!(matches!(config.tls, TlsMode::CustomCa(ref pem) if pem == b"PEM"));
    }

    #[test]
    fn missing_ca_cert_is_an_error() {
        let mut profile = token_profile("https://cml.local");
        profile.ca_cert = Some(PathBuf::from("/nonexistent/ca.pem"));
        let err = profile_to_client_config(&profile, "default", &Defaults::default())
            .expect_err("unreadable ca");
        assert!(matches!(err, ConfigError::CaCert { .. }), "{err}");
    }

    #[test]
    fn invalid_host_is_a_validation_error() {
        let profile = token_profile("not a url");
        let err = profile_to_client_config(&profile, "default", &Defaults::default())
            .expect_err("bad host");
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "host"));
    }
}
