//! TPP Error Types
//!
//! Error hierarchy for credential import, token rotation and revocation.

use std::time::Duration;
use thiserror::Error;

use crate::auth::AuthMethod;

/// Root error type for TPP credential operations.
#[derive(Error, Debug)]
pub enum TppError {
    #[error("Malformed import string: no separator found on value: {entry}")]
    MalformedImportString { entry: String },

    #[error("Invalid refresh window: {value}")]
    InvalidRefreshWindow { value: String },

    #[error("No authorization methods specified")]
    NoAuthMethodConfigured,

    #[error("Failed to retrieve new token pair with {method}")]
    AuthenticationFailed {
        method: AuthMethod,
        #[source]
        source: Box<TppError>,
    },

    #[error("Unable to read trust bundle at [{location}]: {message}")]
    TrustBundleReadFailed { location: String, message: String },

    #[error("Unable to read PKCS#12 keystore at [{location}]: {message}")]
    Pkcs12ReadFailed { location: String, message: String },

    #[error("Failed converting PKCS#12 keystore to PEM blocks: {message}")]
    Pkcs12DecodeFailed { message: String },

    #[error("Unable to revoke access token")]
    RevocationFailed {
        #[source]
        source: Box<TppError>,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TppError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedImportString { .. } => "TPP_IMPORT_MALFORMED",
            Self::InvalidRefreshWindow { .. } => "TPP_IMPORT_REFRESH_WINDOW",
            Self::NoAuthMethodConfigured => "TPP_NO_AUTH_METHOD",
            Self::AuthenticationFailed { .. } => "TPP_AUTH_FAILED",
            Self::TrustBundleReadFailed { .. } => "TPP_TRUST_BUNDLE",
            Self::Pkcs12ReadFailed { .. } | Self::Pkcs12DecodeFailed { .. } => "TPP_PKCS12",
            Self::RevocationFailed { .. } => "TPP_REVOCATION",
            Self::Configuration(_) => "TPP_CONFIG",
            Self::Network(_) => "TPP_NETWORK",
            Self::Protocol(_) => "TPP_PROTOCOL",
            Self::Server(_) => "TPP_SERVER",
            Self::Storage(_) => "TPP_STORAGE",
        }
    }

    /// Check if the error came from the transport layer, looking through wrappers.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::AuthenticationFailed { source, .. } | Self::RevocationFailed { source } => {
                source.is_transport()
            }
            _ => false,
        }
    }

    /// Check if the error is a terminal configuration problem on the caller side.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MalformedImportString { .. }
                | Self::InvalidRefreshWindow { .. }
                | Self::NoAuthMethodConfigured
                | Self::Configuration(_)
        )
    }

    /// Wrap an error as the terminal failure of a cascade method.
    pub fn authentication_failed(method: AuthMethod, source: TppError) -> Self {
        Self::AuthenticationFailed {
            method,
            source: Box::new(source),
        }
    }

    /// Wrap an error as a revocation failure.
    pub fn revocation_failed(source: TppError) -> Self {
        Self::RevocationFailed {
            source: Box::new(source),
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Credential resource cannot be created, only imported")]
    CreateRejected,

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("TLS error: {message}")]
    TlsError { message: String },
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Error reported by the TPP server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid grant: {message}")]
    InvalidGrant { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

/// Credential store error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Credential not found: {id}")]
    NotFound { id: String },

    #[error("Credential already exists: {id}")]
    AlreadyExists { id: String },
}

/// Result type for TPP operations.
pub type TppResult<T> = Result<T, TppError>;

/// Error body returned by the TPP authentication endpoints.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TppErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<TppErrorResponse> {
    serde_json::from_str(body).ok()
}

/// Create error from a non-success HTTP response.
pub fn create_error_from_response(status: u16, body: &str) -> TppError {
    let parsed = parse_error_response(body);
    let message = parsed
        .as_ref()
        .map(|r| {
            r.error_description
                .clone()
                .unwrap_or_else(|| r.error.clone())
        })
        .unwrap_or_else(|| format!("HTTP {}", status));

    let error = match (status, parsed.as_ref().map(|r| r.error.as_str())) {
        (_, Some("invalid_grant")) => ServerError::InvalidGrant { message },
        (401, _) => ServerError::Unauthorized { message },
        (403, _) => ServerError::Forbidden { message },
        _ => ServerError::Status { status, message },
    };

    TppError::Server(error)
}
