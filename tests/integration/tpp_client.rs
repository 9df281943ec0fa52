//! TPP client and authenticator against a mock server

use super::*;
use secrecy::ExposeSecret;
use serde_json::json;
use tpp_token_integration::{
    AuthMethod, CredentialState, ServerError, TokenAuthenticator, TppApi, TppError,
    DEFAULT_CLIENT_ID,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_refresh_token_exchange() {
    let server = setup_mock_server().await;
    let expires = future_expiry();

    Mock::given(method("POST"))
        .and(path(PATH_REFRESH))
        .and(body_json(json!({
            "client_id": DEFAULT_CLIENT_ID,
            "refresh_token": "old-refresh"
        })))
        .respond_with(token_response("new-access", "new-refresh", expires))
        .expect(1)
        .mount(&server)
        .await;

    let state = CredentialState::new(tpp_url(&server)).with_refresh_token("old-refresh");
    let pair = authenticator().rotate(&state).await.unwrap();

    assert_eq!(pair.access_token.expose_secret(), "new-access");
    assert_eq!(pair.refresh_token.expose_secret(), "new-refresh");
    assert_eq!(pair.expires, expires);
}

#[tokio::test]
async fn test_expires_in_fallback() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(PATH_REFRESH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let before = chrono::Utc::now().timestamp();
    let state = CredentialState::new(tpp_url(&server)).with_refresh_token("old-refresh");
    let pair = authenticator().rotate(&state).await.unwrap();

    assert!(pair.expires >= before + 3600);
    assert!(pair.expires <= chrono::Utc::now().timestamp() + 3600);
    // No new refresh token issued, the previous one is kept
    assert_eq!(pair.refresh_token.expose_secret(), "old-refresh");
}

#[tokio::test]
async fn test_garbage_keystore_falls_through_to_password() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(PATH_CERTIFICATE))
        .respond_with(token_response("cert-access", "cert-refresh", future_expiry()))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(PATH_OAUTH))
        .and(body_json(json!({
            "client_id": DEFAULT_CLIENT_ID,
            "username": "admin",
            "password": "p@ss",
            "scope": "certificate:manage,revoke"
        })))
        .respond_with(token_response("pw-access", "pw-refresh", future_expiry()))
        .expect(1)
        .mount(&server)
        .await;

    let state = CredentialState::new(tpp_url(&server))
        .with_p12("bm90IGEga2V5c3RvcmU=", "secret")
        .with_username_password("admin", "p@ss");
    let pair = authenticator().rotate(&state).await.unwrap();

    assert_eq!(pair.access_token.expose_secret(), "pw-access");
}

#[tokio::test]
async fn test_cascade_exhausted() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(PATH_REFRESH))
        .respond_with(error_response(400, "invalid_grant", "Grant has been revoked"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(PATH_OAUTH))
        .respond_with(error_response(401, "invalid_user", "Bad credentials"))
        .expect(1)
        .mount(&server)
        .await;

    let state = CredentialState::new(tpp_url(&server))
        .with_refresh_token("old-refresh")
        .with_username_password("admin", "wrong");

    match authenticator().rotate(&state).await {
        Err(TppError::AuthenticationFailed { method, source }) => {
            assert_eq!(method, AuthMethod::UsernamePassword);
            assert!(matches!(
                *source,
                TppError::Server(ServerError::Unauthorized { .. })
            ));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreadable_trust_bundle_fails_before_request() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(PATH_REFRESH))
        .respond_with(token_response("new-access", "new-refresh", future_expiry()))
        .expect(0)
        .mount(&server)
        .await;

    let state = CredentialState::new(tpp_url(&server))
        .with_refresh_token("old-refresh")
        .with_trust_bundle("/nonexistent/tpp-ca.pem");

    match authenticator().rotate(&state).await {
        Err(TppError::AuthenticationFailed { source, .. }) => {
            assert!(matches!(*source, TppError::TrustBundleReadFailed { .. }));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_verify_accepts_valid_token() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path(PATH_VERIFY))
        .and(header("authorization", "Bearer current-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "application": DEFAULT_CLIENT_ID,
            "expires_ISO8601": "2030-01-01T00:00:00Z",
            "valid_for": 86400
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state =
        CredentialState::new(tpp_url(&server)).with_access_token("current-access", future_expiry());

    assert!(!authenticator().verify_expired(&state).await);
}

#[tokio::test]
async fn test_verify_rejection_counts_as_expired() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path(PATH_VERIFY))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let state =
        CredentialState::new(tpp_url(&server)).with_access_token("current-access", future_expiry());

    assert!(authenticator().verify_expired(&state).await);
}

#[tokio::test]
async fn test_verify_timeout_counts_as_expired() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path(PATH_VERIFY))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)))
        .mount(&server)
        .await;

    let state =
        CredentialState::new(tpp_url(&server)).with_access_token("current-access", future_expiry());
    let api = TppClient::new(test_config());

    assert!(api.verify_access_token(&state).await.unwrap_err().is_transport());
    assert!(authenticator().verify_expired(&state).await);
}

#[tokio::test]
async fn test_revoke() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path(PATH_REVOKE))
        .and(header("authorization", "Bearer current-access"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let state =
        CredentialState::new(tpp_url(&server)).with_access_token("current-access", future_expiry());

    authenticator().revoke(&state).await.unwrap();
}

#[tokio::test]
async fn test_revoke_failure() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path(PATH_REVOKE))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let state =
        CredentialState::new(tpp_url(&server)).with_access_token("current-access", future_expiry());

    match authenticator().revoke(&state).await {
        Err(TppError::RevocationFailed { source }) => {
            assert!(matches!(
                *source,
                TppError::Server(ServerError::Status { status: 500, .. })
            ));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_client_certificate_exchange() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(PATH_CERTIFICATE))
        .and(body_json(json!({
            "client_id": DEFAULT_CLIENT_ID,
            "scope": "certificate:manage,revoke"
        })))
        .respond_with(token_response("cert-access", "cert-refresh", future_expiry()))
        .expect(1)
        .mount(&server)
        .await;

    let keystore = format!("{}/tests/fixtures/client.p12", env!("CARGO_MANIFEST_DIR"));
    let state = CredentialState::new(tpp_url(&server)).with_p12(keystore, "changeit");
    let pair = authenticator().rotate(&state).await.unwrap();

    assert_eq!(pair.access_token.expose_secret(), "cert-access");
}
