// cml-api: Async Rust client for the Cisco Modeling Labs controller API

mod api;
pub mod auth;
mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
mod session;
pub mod transport;
pub mod version;

pub use auth::{AuthCredentials, SessionState};
pub use client::Client;
pub use config::ClientConfig;
pub use error::Error;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, TlsMode, Transport, TransportConfig};
pub use version::{SystemInformation, VERSION_CONSTRAINT};

pub use tokio_util::sync::CancellationToken;
