//! TPP Client
//!
//! Calls against the TPP `vedauth` endpoints: token verification, the three
//! token-obtaining exchanges, and revocation. Every call asks the transport
//! factory for a transport built from that call's own TLS settings.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::auth::AuthMethod;
use crate::core::{
    tls_settings_for, HttpMethod, HttpRequest, ReqwestTransportFactory, TlsSettings,
    TransportFactory,
};
use crate::error::{
    create_error_from_response, ConfigurationError, ProtocolError, TppError, TppResult,
};
use crate::types::{
    AuthenticatorConfig, AuthorizeRequest, CredentialState, RefreshTokenRequest, TokenPair,
    TokenResponse, VerifyResponse,
};

const PATH_REFRESH: &str = "vedauth/authorize/token";
const PATH_CERTIFICATE: &str = "vedauth/authorize/certificate";
const PATH_OAUTH: &str = "vedauth/authorize/oauth";
const PATH_VERIFY: &str = "vedauth/authorize/verify";
const PATH_REVOKE: &str = "vedauth/revoke/token";

/// Remote TPP operations used by the authenticator.
#[async_trait]
pub trait TppApi: Send + Sync {
    /// Verify the current access token with the server.
    async fn verify_access_token(&self, state: &CredentialState) -> TppResult<VerifyResponse>;

    /// Obtain a new token pair with one authentication method.
    async fn attempt(&self, method: AuthMethod, state: &CredentialState) -> TppResult<TokenPair>;

    /// Revoke the current access token.
    async fn revoke_access_token(&self, state: &CredentialState) -> TppResult<()>;
}

/// Normalize a TPP base URL.
///
/// A missing scheme defaults to `https://`; trailing slashes and a trailing
/// `vedsdk` segment are removed.
pub fn normalize_base_url(raw: &str) -> TppResult<String> {
    let invalid = || {
        TppError::Configuration(ConfigurationError::InvalidEndpoint {
            url: raw.to_string(),
        })
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = url::Url::parse(&with_scheme).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }

    let mut base = parsed.as_str().trim_end_matches('/').to_string();
    if base.to_ascii_lowercase().ends_with("/vedsdk") {
        base.truncate(base.len() - "/vedsdk".len());
    }

    Ok(base.trim_end_matches('/').to_string())
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// TPP client over a pluggable transport factory.
pub struct TppClient<F: TransportFactory = ReqwestTransportFactory> {
    config: AuthenticatorConfig,
    factory: Arc<F>,
}

impl TppClient<ReqwestTransportFactory> {
    /// Create a client backed by reqwest.
    pub fn new(config: AuthenticatorConfig) -> Self {
        let factory = Arc::new(ReqwestTransportFactory::new(config.clone()));
        Self { config, factory }
    }
}

impl<F: TransportFactory> TppClient<F> {
    /// Create a client with a custom transport factory.
    pub fn with_factory(config: AuthenticatorConfig, factory: Arc<F>) -> Self {
        Self { config, factory }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    fn endpoint(&self, state: &CredentialState, path: &str) -> TppResult<String> {
        Ok(format!("{}/{}", normalize_base_url(&state.url)?, path))
    }

    fn json_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers.insert("accept".to_string(), "application/json".to_string());
        headers
    }

    fn bearer_headers(&self, state: &CredentialState) -> TppResult<HashMap<String, String>> {
        let token = state.access_token_secret().ok_or_else(|| {
            TppError::Configuration(ConfigurationError::MissingRequired {
                field: "access_token".to_string(),
            })
        })?;

        let mut headers = HashMap::new();
        headers.insert("accept".to_string(), "application/json".to_string());
        headers.insert("authorization".to_string(), format!("Bearer {}", token));
        Ok(headers)
    }

    async fn get(
        &self,
        state: &CredentialState,
        path: &str,
    ) -> TppResult<crate::core::HttpResponse> {
        let tls = tls_settings_for(state, false)?;
        let transport = self.factory.transport(&tls)?;

        let response = transport
            .send(HttpRequest {
                method: HttpMethod::Get,
                url: self.endpoint(state, path)?,
                headers: self.bearer_headers(state)?,
                body: None,
                timeout: Some(self.config.timeout),
            })
            .await?;

        if !response.is_success() {
            return Err(create_error_from_response(response.status, &response.body));
        }

        Ok(response)
    }

    async fn post_token<B: Serialize + Sync>(
        &self,
        state: &CredentialState,
        tls: TlsSettings,
        path: &str,
        body: &B,
    ) -> TppResult<TokenPair> {
        let transport = self.factory.transport(&tls)?;
        let body = serde_json::to_string(body).map_err(|e| {
            TppError::Protocol(ProtocolError::InvalidJson {
                message: e.to_string(),
            })
        })?;

        let response = transport
            .send(HttpRequest {
                method: HttpMethod::Post,
                url: self.endpoint(state, path)?,
                headers: self.json_headers(),
                body: Some(body),
                timeout: Some(self.config.timeout),
            })
            .await?;

        if !response.is_success() {
            return Err(create_error_from_response(response.status, &response.body));
        }

        let token_response: TokenResponse =
            serde_json::from_str(&response.body).map_err(|e| {
                TppError::Protocol(ProtocolError::InvalidJson {
                    message: e.to_string(),
                })
            })?;

        tracing::debug!(
            identity = token_response.identity.as_deref().unwrap_or_default(),
            scope = token_response.scope.as_deref().unwrap_or_default(),
            "token pair issued"
        );

        token_response.into_token_pair(state.refresh_token.as_ref(), now_secs())
    }

    async fn refresh_access_token(&self, state: &CredentialState) -> TppResult<TokenPair> {
        let refresh_token = state
            .refresh_token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .unwrap_or_default();

        let tls = tls_settings_for(state, false)?;
        let body = RefreshTokenRequest {
            client_id: &state.client_id,
            refresh_token,
        };
        self.post_token(state, tls, PATH_REFRESH, &body).await
    }

    async fn access_token_by_certificate(&self, state: &CredentialState) -> TppResult<TokenPair> {
        tracing::info!("configuring TLS client");
        let tls = tls_settings_for(state, true)?;
        tracing::info!("TLS client configured");

        let body = AuthorizeRequest {
            client_id: &state.client_id,
            username: None,
            password: None,
            scope: &self.config.scope,
        };
        self.post_token(state, tls, PATH_CERTIFICATE, &body).await
    }

    async fn access_token_by_password(&self, state: &CredentialState) -> TppResult<TokenPair> {
        let tls = tls_settings_for(state, false)?;
        let body = AuthorizeRequest {
            client_id: &state.client_id,
            username: state.username.as_deref(),
            password: state.password.as_ref().map(|p| p.expose_secret().as_str()),
            scope: &self.config.scope,
        };
        self.post_token(state, tls, PATH_OAUTH, &body).await
    }
}

#[async_trait]
impl<F: TransportFactory> TppApi for TppClient<F> {
    async fn verify_access_token(&self, state: &CredentialState) -> TppResult<VerifyResponse> {
        let response = self.get(state, PATH_VERIFY).await?;
        // The verify body is informational only; a 2xx is what counts
        Ok(serde_json::from_str(&response.body).unwrap_or_default())
    }

    async fn attempt(&self, method: AuthMethod, state: &CredentialState) -> TppResult<TokenPair> {
        tracing::info!(method = %method, "using authentication method");
        match method {
            AuthMethod::RefreshToken => self.refresh_access_token(state).await,
            AuthMethod::ClientCertificate => self.access_token_by_certificate(state).await,
            AuthMethod::UsernamePassword => self.access_token_by_password(state).await,
        }
    }

    async fn revoke_access_token(&self, state: &CredentialState) -> TppResult<()> {
        self.get(state, PATH_REVOKE).await.map(|_| ())
    }
}

/// Mock TPP API for testing.
#[derive(Default)]
pub struct MockTppApi {
    attempt_results: Mutex<HashMap<AuthMethod, VecDeque<TppResult<TokenPair>>>>,
    attempt_history: Mutex<Vec<AuthMethod>>,
    verify_results: Mutex<VecDeque<TppResult<VerifyResponse>>>,
    verify_count: Mutex<usize>,
    revoke_results: Mutex<VecDeque<TppResult<()>>>,
    revoke_count: Mutex<usize>,
}

impl MockTppApi {
    /// Create new mock API. Unscripted calls succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next result of an attempt with `method`.
    pub fn queue_attempt(&self, method: AuthMethod, result: TppResult<TokenPair>) -> &Self {
        self.attempt_results
            .lock()
            .unwrap()
            .entry(method)
            .or_default()
            .push_back(result);
        self
    }

    /// Queue the next verify result.
    pub fn queue_verify(&self, result: TppResult<VerifyResponse>) -> &Self {
        self.verify_results.lock().unwrap().push_back(result);
        self
    }

    /// Queue the next revoke result.
    pub fn queue_revoke(&self, result: TppResult<()>) -> &Self {
        self.revoke_results.lock().unwrap().push_back(result);
        self
    }

    /// Methods attempted so far, in order.
    pub fn get_attempt_history(&self) -> Vec<AuthMethod> {
        self.attempt_history.lock().unwrap().clone()
    }

    /// Number of attempts made with `method`.
    pub fn attempt_count(&self, method: AuthMethod) -> usize {
        self.attempt_history
            .lock()
            .unwrap()
            .iter()
            .filter(|m| **m == method)
            .count()
    }

    /// Number of verify calls.
    pub fn verify_count(&self) -> usize {
        *self.verify_count.lock().unwrap()
    }

    /// Number of revoke calls.
    pub fn revoke_count(&self) -> usize {
        *self.revoke_count.lock().unwrap()
    }

    /// Number of calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.get_attempt_history().len() + self.verify_count() + self.revoke_count()
    }
}

#[async_trait]
impl TppApi for MockTppApi {
    async fn verify_access_token(&self, _state: &CredentialState) -> TppResult<VerifyResponse> {
        *self.verify_count.lock().unwrap() += 1;
        self.verify_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(VerifyResponse::default()))
    }

    async fn attempt(&self, method: AuthMethod, _state: &CredentialState) -> TppResult<TokenPair> {
        self.attempt_history.lock().unwrap().push(method);
        self.attempt_results
            .lock()
            .unwrap()
            .get_mut(&method)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                Ok(TokenPair::new(
                    format!("mock-access-{:?}", method),
                    format!("mock-refresh-{:?}", method),
                    now_secs() + 3600,
                ))
            })
    }

    async fn revoke_access_token(&self, _state: &CredentialState) -> TppResult<()> {
        *self.revoke_count.lock().unwrap() += 1;
        self.revoke_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

/// Create mock TPP API for testing.
pub fn create_mock_tpp_api() -> MockTppApi {
    MockTppApi::new()
}
