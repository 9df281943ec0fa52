//! Configuration Types
//!
//! Authenticator configuration.

use std::time::Duration;

/// Scope requested when minting tokens with a client certificate or password.
pub const DEFAULT_SCOPE: &str = "certificate:manage,revoke";

/// Default timeout applied to every outbound TPP call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound on response body size.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1048576; // 1MB

/// Settings shared by all calls made by a TPP client.
#[derive(Clone, Debug)]
pub struct AuthenticatorConfig {
    /// HTTP timeout.
    pub timeout: Duration,
    /// Maximum accepted response body size in bytes.
    pub max_response_size: usize,
    /// Scope requested on certificate and password authorization.
    pub scope: String,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            scope: DEFAULT_SCOPE.to_string(),
            user_agent: concat!("tpp-token-integration/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
