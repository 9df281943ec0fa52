//! Token Authenticator
//!
//! Verification, rotation through the authentication cascade, and revocation.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::auth::{AuthMethod, TppApi};
use crate::error::{TppError, TppResult};
use crate::types::{CredentialState, TokenPair};

/// Token authenticator interface.
#[async_trait]
pub trait TokenAuthenticator: Send + Sync {
    /// Check whether the current access token should be treated as expired.
    ///
    /// Any failure to verify counts as expired.
    async fn verify_expired(&self, state: &CredentialState) -> bool;

    /// Obtain a new token pair, trying each configured method in order.
    async fn rotate(&self, state: &CredentialState) -> TppResult<TokenPair>;

    /// Revoke the current access token.
    async fn revoke(&self, state: &CredentialState) -> TppResult<()>;
}

/// Default token authenticator implementation.
pub struct DefaultTokenAuthenticator<A: TppApi> {
    api: Arc<A>,
}

impl<A: TppApi> DefaultTokenAuthenticator<A> {
    /// Create new token authenticator.
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Get the underlying TPP API.
    pub fn api(&self) -> &Arc<A> {
        &self.api
    }
}

#[async_trait]
impl<A: TppApi> TokenAuthenticator for DefaultTokenAuthenticator<A> {
    async fn verify_expired(&self, state: &CredentialState) -> bool {
        match self.api.verify_access_token(state).await {
            Ok(response) => {
                tracing::debug!(
                    application = response.application.as_deref().unwrap_or_default(),
                    valid_for = response.valid_for.unwrap_or_default(),
                    "access token verified"
                );
                false
            }
            Err(e) => {
                tracing::info!(
                    error = %e,
                    error_code = e.error_code(),
                    "access token verification failed, treating as expired"
                );
                true
            }
        }
    }

    async fn rotate(&self, state: &CredentialState) -> TppResult<TokenPair> {
        let methods = AuthMethod::configured(state);
        if methods.is_empty() {
            return Err(TppError::NoAuthMethodConfigured);
        }

        let last = methods.len() - 1;
        for (index, method) in methods.into_iter().enumerate() {
            match self.api.attempt(method, state).await {
                Ok(pair) => {
                    tracing::info!(method = %method, "new token pair retrieved");
                    return Ok(pair);
                }
                Err(e) if index == last => {
                    return Err(TppError::authentication_failed(method, e));
                }
                Err(e) => {
                    tracing::warn!(
                        method = %method,
                        error = %e,
                        "failed to retrieve new token pair, trying next method"
                    );
                }
            }
        }

        // Every path through a non-empty method list returns above
        Err(TppError::NoAuthMethodConfigured)
    }

    async fn revoke(&self, state: &CredentialState) -> TppResult<()> {
        if !state.has_access_token() {
            tracing::debug!("no access token to revoke");
            return Ok(());
        }

        self.api
            .revoke_access_token(state)
            .await
            .map_err(TppError::revocation_failed)?;

        tracing::info!("access token revoked");
        Ok(())
    }
}

/// Mock token authenticator for testing.
#[derive(Default)]
pub struct MockTokenAuthenticator {
    expired: Mutex<bool>,
    rotate_results: Mutex<VecDeque<TppResult<TokenPair>>>,
    revoke_results: Mutex<VecDeque<TppResult<()>>>,
    verify_calls: Mutex<usize>,
    rotate_calls: Mutex<usize>,
    revoke_calls: Mutex<usize>,
}

impl MockTokenAuthenticator {
    /// Create new mock authenticator. Tokens verify as valid by default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the verification outcome.
    pub fn set_expired(&self, expired: bool) -> &Self {
        *self.expired.lock().unwrap() = expired;
        self
    }

    /// Queue the next rotate result.
    pub fn queue_rotate(&self, result: TppResult<TokenPair>) -> &Self {
        self.rotate_results.lock().unwrap().push_back(result);
        self
    }

    /// Queue the next revoke result.
    pub fn queue_revoke(&self, result: TppResult<()>) -> &Self {
        self.revoke_results.lock().unwrap().push_back(result);
        self
    }

    pub fn verify_calls(&self) -> usize {
        *self.verify_calls.lock().unwrap()
    }

    pub fn rotate_calls(&self) -> usize {
        *self.rotate_calls.lock().unwrap()
    }

    pub fn revoke_calls(&self) -> usize {
        *self.revoke_calls.lock().unwrap()
    }
}

#[async_trait]
impl TokenAuthenticator for MockTokenAuthenticator {
    async fn verify_expired(&self, _state: &CredentialState) -> bool {
        *self.verify_calls.lock().unwrap() += 1;
        *self.expired.lock().unwrap()
    }

    async fn rotate(&self, _state: &CredentialState) -> TppResult<TokenPair> {
        *self.rotate_calls.lock().unwrap() += 1;
        self.rotate_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(TokenPair::new(
                    "mock-access-token",
                    "mock-refresh-token",
                    chrono::Utc::now().timestamp() + 3600,
                ))
            })
    }

    async fn revoke(&self, _state: &CredentialState) -> TppResult<()> {
        *self.revoke_calls.lock().unwrap() += 1;
        self.revoke_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

/// Create mock token authenticator for testing.
pub fn create_mock_authenticator() -> MockTokenAuthenticator {
    MockTokenAuthenticator::new()
}
