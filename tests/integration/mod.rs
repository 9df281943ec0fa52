//! Integration tests using WireMock
//!
//! Drive the reqwest-backed TPP client and the credential controller against
//! a mock TPP server over plain HTTP.

pub mod controller;
pub mod tpp_client;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tpp_token_integration::{
    authenticator_config, AuthenticatorConfig, DefaultTokenAuthenticator, TppClient,
};
use tpp_token_integration::core::ReqwestTransportFactory;
use wiremock::{MockServer, ResponseTemplate};

pub const PATH_REFRESH: &str = "/vedauth/authorize/token";
pub const PATH_CERTIFICATE: &str = "/vedauth/authorize/certificate";
pub const PATH_OAUTH: &str = "/vedauth/authorize/oauth";
pub const PATH_VERIFY: &str = "/vedauth/authorize/verify";
pub const PATH_REVOKE: &str = "/vedauth/revoke/token";

pub type TestAuthenticator = DefaultTokenAuthenticator<TppClient<ReqwestTransportFactory>>;

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Base URL as users paste it, with the `vedsdk` suffix.
pub fn tpp_url(server: &MockServer) -> String {
    format!("{}/vedsdk", server.uri())
}

pub fn test_config() -> AuthenticatorConfig {
    authenticator_config()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap()
}

pub fn authenticator() -> TestAuthenticator {
    DefaultTokenAuthenticator::new(Arc::new(TppClient::new(test_config())))
}

pub fn future_expiry() -> i64 {
    chrono::Utc::now().timestamp() + 90 * 86_400
}

pub fn token_response(access: &str, refresh: &str, expires: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires": expires,
        "expires_in": 7_776_000,
        "token_type": "Bearer",
        "scope": "certificate:manage,revoke",
        "identity": "local:{00000000-0000-0000-0000-000000000000}",
        "refresh_until": expires + 86_400
    }))
}

pub fn error_response(status: u16, error: &str, description: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": error,
        "error_description": description
    }))
}
