//! CLI error types with miette diagnostics.
//!
//! Maps `cml_api::Error` and `cml_config::ConfigError` into user-facing
//! errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use cml_api::Error as ApiError;
use cml_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const INCOMPATIBLE: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to controller at {url}")]
    #[diagnostic(
        code(cmlctl::connection_failed),
        help(
            "Check that the controller is running and reachable.\n\
             For a self-signed certificate try: cmlctl system info --insecure"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: ApiError,
    },

    #[error("Request timed out")]
    #[diagnostic(
        code(cmlctl::timeout),
        help("Increase the timeout with --timeout or check controller responsiveness.")
    )]
    Timeout,

    #[error("Controller is not ready yet")]
    #[diagnostic(code(cmlctl::not_ready), help("Wait for the controller to finish booting."))]
    NotReady,

    #[error("Controller version {version} is not supported: {reason}")]
    #[diagnostic(
        code(cmlctl::incompatible),
        help("Supported controller versions: {supported}")
    )]
    Incompatible {
        version: String,
        reason: String,
        supported: &'static str,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(cmlctl::auth_failed),
        help(
            "Verify the username and password or token of profile '{profile}'.\n\
             An expired token needs a username and password to renew it."
        )
    )]
    AuthFailed { profile: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(cmlctl::no_credentials),
        help(
            "Set --token or --username with CML_PASSWORD,\n\
             or add them to the profile in {path}."
        )
    )]
    NoCredentials { profile: String, path: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(cmlctl::not_found),
        help("Run: cmlctl {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {0}")]
    #[diagnostic(code(cmlctl::api_error))]
    Api(ApiError),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(cmlctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(cmlctl::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No controller configured")]
    #[diagnostic(
        code(cmlctl::no_config),
        help(
            "Pass --host (or set CML_HOST), or create a profile.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(cmlctl::config))]
    Config(ConfigError),

    // ── Interrupted ──────────────────────────────────────────────────
    #[error("Interrupted")]
    #[diagnostic(code(cmlctl::interrupted))]
    Interrupted,

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotReady => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Incompatible { .. } => exit_code::INCOMPATIBLE,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }

    /// Wrap a lookup miss with the command that lists the resource.
    pub fn not_found(resource_type: &str, identifier: &str, list_command: &str) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: list_command.into(),
        }
    }
}

// ── Library error mapping ────────────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        if let ApiError::Transport(ref e) = err {
            if e.is_timeout() {
                return Self::Timeout;
            }
            if e.is_connect() {
                let url = e.url().map(ToString::to_string).unwrap_or_default();
                return Self::ConnectionFailed { url, source: err };
            }
        }
        match err {
            ApiError::SystemNotReady => Self::NotReady,
            ApiError::IncompatibleVersion { version, reason } => Self::Incompatible {
                version,
                reason,
                supported: cml_api::VERSION_CONSTRAINT,
            },
            ApiError::NoCredentials | ApiError::TokenExpired | ApiError::Unauthorized => {
                Self::AuthFailed {
                    profile: "current".into(),
                }
            }
            ApiError::ElementNotFound { kind, key } => Self::NotFound {
                list_command: format!("{kind}s list"),
                resource_type: kind.into(),
                identifier: key,
            },
            ApiError::Cancelled => Self::Interrupted,
            other => Self::Api(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials {
                profile,
                path: cml_config::config_path().display().to_string(),
            },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_exit_with_auth_code() {
        let err = CliError::from(ApiError::TokenExpired);
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn lookup_miss_names_list_command() {
        let err = CliError::from(ApiError::ElementNotFound {
            kind: "node",
            key: "R9".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(matches!(err, CliError::NotFound { ref list_command, .. } if list_command == "nodes list"));
    }

    #[test]
    fn server_errors_stay_general() {
        let err = CliError::from(ApiError::ServerError {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
