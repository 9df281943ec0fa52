//! TPP Token Integration
//!
//! Access/refresh token lifecycle for a Trust Protection Platform (TPP)
//! instance: verify the current token, rotate it through an ordered cascade
//! of authentication methods, and revoke it on teardown.
//!
//! # Example
//!
//! ```rust,ignore
//! use tpp_token_integration::{authenticator_config, in_memory_controller};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = in_memory_controller(authenticator_config().build()?);
//!
//!     controller
//!         .import("prod", "url=https://tpp.example/vedsdk,refresh_token=abc")
//!         .await?;
//!
//!     // Rotates because no access token is stored yet
//!     let state = controller.read("prod").await?;
//!     println!("token expires at {:?}", state.expiration_date);
//!
//!     controller.delete("prod").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: credential state, token pair and TPP wire types
//! - `error`: error hierarchy and server response mapping
//! - `core`: HTTP transport, per-call TLS material, import string codec
//! - `auth`: authentication methods, TPP client, cascade authenticator
//! - `controller`: rotation decision, credential store, lifecycle operations
//! - `builders`: fluent configuration builder
//! - `telemetry`: logging setup
//! - `client`: ready-made controller wiring

pub mod auth;
pub mod builders;
pub mod client;
pub mod controller;
pub mod core;
pub mod error;
pub mod telemetry;
pub mod types;

pub use client::{in_memory_controller, tpp_controller, TppAuthenticator, TppCredentialController};

pub use builders::{authenticator_config, AuthenticatorConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, parse_error_response, ConfigurationError, NetworkError,
    ProtocolError, ServerError, StorageError, TppError, TppErrorResponse, TppResult,
};

// Re-export types
pub use types::{
    AuthenticatorConfig, CredentialState, TokenPair, TokenResponse, VerifyResponse,
    DEFAULT_CLIENT_ID, DEFAULT_REFRESH_WINDOW_DAYS, DEFAULT_SCOPE,
};

// Re-export core components
pub use core::{
    apply_defaults, import_state, parse_import_key, to_import_map, to_import_string,
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    MockTransportFactory, ReqwestHttpTransport, ReqwestTransportFactory, TlsSettings,
    TransportFactory,
};

// Re-export authentication
pub use auth::{
    AuthMethod, DefaultTokenAuthenticator, MockTokenAuthenticator, MockTppApi,
    TokenAuthenticator, TppApi, TppClient,
};

// Re-export controller
pub use controller::{
    decide_rotation, CredentialController, CredentialStore, InMemoryCredentialStore,
    Observation, RotationPlan, RotationReason,
};

pub use telemetry::{LogFormat, LogLevel, LoggingConfig};
