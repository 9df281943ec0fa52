//! Credential lifecycle against a mock server

use super::*;
use std::sync::Arc;
use tpp_token_integration::{
    in_memory_controller, tpp_controller, CredentialStore, InMemoryCredentialStore,
    RotationReason, StorageError, TppError,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_full_lifecycle() {
    let server = setup_mock_server().await;
    let expires = future_expiry();

    Mock::given(method("POST"))
        .and(path(PATH_REFRESH))
        .respond_with(token_response("minted-access", "minted-refresh", expires))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PATH_VERIFY))
        .and(header("authorization", "Bearer minted-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid_for": 86400})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PATH_REVOKE))
        .and(header("authorization", "Bearer minted-access"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::new());
    let controller = tpp_controller(test_config(), store.clone());
    let raw = format!("url={},refresh_token=imported-refresh", tpp_url(&server));

    let imported = controller.import("prod", &raw).await.unwrap();
    assert!(!imported.has_access_token());

    // First read mints a token pair since none is stored
    let rotated = controller.read("prod").await.unwrap();
    assert_eq!(rotated.access_token_secret(), Some("minted-access"));
    assert_eq!(rotated.expiration_date, Some(expires));

    // Second read verifies and keeps the token
    let kept = controller.read("prod").await.unwrap();
    assert_eq!(kept.access_token_secret(), Some("minted-access"));

    controller.delete("prod").await.unwrap();
    assert!(store.load("prod").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_rotation_keeps_stored_state() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path(PATH_VERIFY))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(PATH_REFRESH))
        .respond_with(error_response(400, "invalid_grant", "Grant has expired"))
        .expect(1)
        .mount(&server)
        .await;

    let controller = in_memory_controller(test_config());
    let raw = format!(
        "url={},access_token=stale-access,refresh_token=stale-refresh,expiration=1",
        tpp_url(&server)
    );
    controller.import("prod", &raw).await.unwrap();

    assert!(matches!(
        controller.read("prod").await,
        Err(TppError::AuthenticationFailed { .. })
    ));

    let stored = controller.update("prod").await.unwrap();
    assert_eq!(stored.access_token_secret(), Some("stale-access"));
    assert_eq!(stored.expiration_date, Some(1));
}

#[tokio::test]
async fn test_plan_makes_no_token_requests() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path(PATH_VERIFY))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(token_response("unused", "unused", future_expiry()))
        .expect(0)
        .mount(&server)
        .await;

    let controller = in_memory_controller(test_config());
    let raw = format!(
        "url={},access_token=stale-access,refresh_token=stale-refresh",
        tpp_url(&server)
    );
    controller.import("prod", &raw).await.unwrap();

    let plan = controller.plan("prod").await.unwrap();

    assert!(plan.needs_rotation);
    assert_eq!(plan.reason, RotationReason::Expired);
    assert!(!plan.summary().contains("stale-access"));
}

#[tokio::test]
async fn test_delete_keeps_state_when_revoke_fails() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path(PATH_REVOKE))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let controller = in_memory_controller(test_config());
    let raw = format!("url={},access_token=current-access", tpp_url(&server));
    controller.import("prod", &raw).await.unwrap();

    assert!(matches!(
        controller.delete("prod").await,
        Err(TppError::RevocationFailed { .. })
    ));
    assert!(controller.export("prod").await.unwrap().contains("access_token=current-access"));
}

#[tokio::test]
async fn test_operations_on_unknown_id() {
    let controller = in_memory_controller(test_config());

    for result in [
        controller.read("missing").await.map(|_| ()),
        controller.delete("missing").await,
        controller.export("missing").await.map(|_| ()),
    ] {
        assert!(matches!(
            result,
            Err(TppError::Storage(StorageError::NotFound { .. }))
        ));
    }
}

#[tokio::test]
async fn test_create_is_rejected() {
    let controller = in_memory_controller(test_config());
    assert!(controller.create().unwrap_err().is_configuration());
}
