//! Credential State
//!
//! The persisted credential entity and its rotation transform.

use secrecy::{ExposeSecret, SecretString};

use crate::types::TokenPair;

/// Client id used when the import string does not name one.
pub const DEFAULT_CLIENT_ID: &str = "hashicorp-terraform-by-venafi";

/// Days before expiry at which a token is rotated when no window is given.
pub const DEFAULT_REFRESH_WINDOW_DAYS: i64 = 30;

/// Persisted credential state for one TPP credential resource.
#[derive(Clone)]
pub struct CredentialState {
    /// TPP base endpoint.
    pub url: String,
    /// Username for the username/password method.
    pub username: Option<String>,
    /// Password for the username/password method.
    pub password: Option<SecretString>,
    /// PKCS#12 keystore, as a file path or base64 content.
    pub p12_certificate: Option<String>,
    /// PKCS#12 keystore password.
    pub p12_password: Option<SecretString>,
    /// Current bearer token.
    pub access_token: Option<SecretString>,
    /// Token used to mint a new token pair.
    pub refresh_token: Option<SecretString>,
    /// Application identifier registered in TPP.
    pub client_id: String,
    /// Access token expiry as Unix seconds.
    pub expiration_date: Option<i64>,
    /// PEM CA bundle, as a file path, PEM text or base64 content.
    pub trust_bundle: Option<String>,
    /// Days before expiry at which rotation is triggered.
    pub refresh_window: i64,
}

impl CredentialState {
    /// Fields whose values are never logged or shown in plan summaries.
    pub const SENSITIVE_FIELDS: [&'static str; 4] = [
        crate::core::import::FIELD_PASSWORD,
        crate::core::import::FIELD_P12_PASSWORD,
        crate::core::import::FIELD_ACCESS_TOKEN,
        crate::core::import::FIELD_REFRESH_TOKEN,
    ];

    /// Create a state for `url` with every optional field unset.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            p12_certificate: None,
            p12_password: None,
            access_token: None,
            refresh_token: None,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            expiration_date: None,
            trust_bundle: None,
            refresh_window: DEFAULT_REFRESH_WINDOW_DAYS,
        }
    }

    /// Set the username/password pair.
    pub fn with_username_password(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Set the PKCS#12 keystore and its password.
    pub fn with_p12(mut self, certificate: impl Into<String>, password: impl Into<String>) -> Self {
        self.p12_certificate = Some(certificate.into());
        self.p12_password = Some(SecretString::new(password.into()));
        self
    }

    /// Set the refresh token.
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::new(token.into()));
        self
    }

    /// Set the access token and its expiry.
    pub fn with_access_token(mut self, token: impl Into<String>, expiration_date: i64) -> Self {
        self.access_token = Some(SecretString::new(token.into()));
        self.expiration_date = Some(expiration_date);
        self
    }

    /// Set the trust bundle.
    pub fn with_trust_bundle(mut self, bundle: impl Into<String>) -> Self {
        self.trust_bundle = Some(bundle.into());
        self
    }

    /// Check if an access token is present.
    pub fn has_access_token(&self) -> bool {
        secret_present(&self.access_token)
    }

    /// Check if a refresh token is present.
    pub fn has_refresh_token(&self) -> bool {
        secret_present(&self.refresh_token)
    }

    /// Check if both keystore and keystore password are present.
    pub fn has_p12(&self) -> bool {
        text_present(&self.p12_certificate) && secret_present(&self.p12_password)
    }

    /// Check if both username and password are present.
    pub fn has_username_password(&self) -> bool {
        text_present(&self.username) && secret_present(&self.password)
    }

    /// Access token value, if present.
    pub fn access_token_secret(&self) -> Option<&str> {
        self.access_token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.is_empty())
    }

    /// Produce the state that results from a successful rotation.
    ///
    /// Access token, refresh token and expiration are always replaced together.
    pub fn with_rotation(&self, pair: TokenPair) -> Self {
        let TokenPair {
            access_token,
            refresh_token,
            expires,
        } = pair;

        Self {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            expiration_date: Some(expires),
            ..self.clone()
        }
    }
}

fn secret_present(value: &Option<SecretString>) -> bool {
    value
        .as_ref()
        .map(|v| !v.expose_secret().is_empty())
        .unwrap_or(false)
}

fn text_present(value: &Option<String>) -> bool {
    value.as_ref().map(|v| !v.is_empty()).unwrap_or(false)
}

fn redact(value: &Option<SecretString>) -> Option<&'static str> {
    value.as_ref().map(|_| "[REDACTED]")
}

impl std::fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialState")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("p12_certificate", &self.p12_certificate)
            .field("p12_password", &redact(&self.p12_password))
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("client_id", &self.client_id)
            .field("expiration_date", &self.expiration_date)
            .field("trust_bundle", &self.trust_bundle)
            .field("refresh_window", &self.refresh_window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_defaults() {
        let state = CredentialState::new("https://tpp.example");
        assert_eq!(state.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(state.refresh_window, 30);
        assert!(!state.has_access_token());
        assert!(!state.has_refresh_token());
    }

    #[test]
    fn test_empty_values_are_not_present() {
        let state = CredentialState::new("https://tpp.example")
            .with_refresh_token("")
            .with_username_password("admin", "")
            .with_p12("", "secret");

        assert!(!state.has_refresh_token());
        assert!(!state.has_username_password());
        assert!(!state.has_p12());
    }

    #[test]
    fn test_with_rotation_replaces_token_triple() {
        let state = CredentialState::new("https://tpp.example")
            .with_username_password("admin", "pass")
            .with_access_token("old-access", 100)
            .with_refresh_token("old-refresh");

        let rotated = state.with_rotation(TokenPair::new("new-access", "new-refresh", 200));

        assert_eq!(rotated.access_token_secret(), Some("new-access"));
        assert_eq!(
            rotated.refresh_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("new-refresh")
        );
        assert_eq!(rotated.expiration_date, Some(200));
        assert_eq!(rotated.username.as_deref(), Some("admin"));

        // Original is untouched
        assert_eq!(state.access_token_secret(), Some("old-access"));
        assert_eq!(state.expiration_date, Some(100));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let state = CredentialState::new("https://tpp.example")
            .with_username_password("admin", "hunter2")
            .with_access_token("access-secret", 100)
            .with_refresh_token("refresh-secret");

        let debug = format!("{:?}", state);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("access-secret"));
        assert!(!debug.contains("refresh-secret"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("admin"));
    }
}
