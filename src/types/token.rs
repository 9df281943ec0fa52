//! Token Types
//!
//! Token pair produced by a rotation and the TPP authentication wire types.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, TppError, TppResult};

/// Access/refresh token pair with the access token expiry.
#[derive(Clone)]
pub struct TokenPair {
    /// New access token.
    pub access_token: SecretString,
    /// New refresh token.
    pub refresh_token: SecretString,
    /// Access token expiry as Unix seconds.
    pub expires: i64,
}

impl TokenPair {
    /// Create a new token pair.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires: i64,
    ) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: SecretString::new(refresh_token.into()),
            expires,
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires", &self.expires)
            .finish()
    }
}

/// Token response from the TPP authorize endpoints.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token expiry as Unix seconds.
    #[serde(default)]
    pub expires: Option<i64>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,
    /// Granted scope.
    #[serde(default)]
    pub scope: Option<String>,
    /// Identity the token was issued to.
    #[serde(default)]
    pub identity: Option<String>,
    /// Refresh token expiry as Unix seconds.
    #[serde(default)]
    pub refresh_until: Option<i64>,
}

impl TokenResponse {
    /// Convert into a token pair.
    ///
    /// `previous_refresh` is kept when the server does not return a new
    /// refresh token. `now` is used when only `expires_in` is present.
    pub fn into_token_pair(
        self,
        previous_refresh: Option<&SecretString>,
        now: i64,
    ) -> TppResult<TokenPair> {
        if self.access_token.is_empty() {
            return Err(TppError::Protocol(ProtocolError::MissingField {
                field: "access_token".to_string(),
            }));
        }

        let expires = match (self.expires, self.expires_in) {
            (Some(expires), _) => expires,
            (None, Some(expires_in)) => now + expires_in,
            (None, None) => {
                return Err(TppError::Protocol(ProtocolError::MissingField {
                    field: "expires".to_string(),
                }))
            }
        };

        let refresh_token = match self.refresh_token.filter(|t| !t.is_empty()) {
            Some(token) => SecretString::new(token),
            None => previous_refresh
                .map(|t| SecretString::new(t.expose_secret().clone()))
                .ok_or_else(|| {
                    TppError::Protocol(ProtocolError::MissingField {
                        field: "refresh_token".to_string(),
                    })
                })?,
        };

        Ok(TokenPair {
            access_token: SecretString::new(self.access_token),
            refresh_token,
            expires,
        })
    }
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires", &self.expires)
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("identity", &self.identity)
            .field("refresh_until", &self.refresh_until)
            .finish()
    }
}

/// Response from the token verify endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub expires: Option<i64>,
    #[serde(default, rename = "expires_ISO8601")]
    pub expires_iso8601: Option<String>,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub valid_for: Option<i64>,
}

/// Body of a refresh token exchange.
#[derive(Serialize)]
pub struct RefreshTokenRequest<'a> {
    pub client_id: &'a str,
    pub refresh_token: &'a str,
}

/// Body of a username/password or client certificate authorization.
#[derive(Serialize)]
pub struct AuthorizeRequest<'a> {
    pub client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
    pub scope: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> TokenResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_into_token_pair_uses_expires() {
        let pair = response(
            r#"{"access_token":"a","refresh_token":"r","expires":1700000000,"expires_in":3600}"#,
        )
        .into_token_pair(None, 1)
        .unwrap();

        assert_eq!(pair.access_token.expose_secret(), "a");
        assert_eq!(pair.refresh_token.expose_secret(), "r");
        assert_eq!(pair.expires, 1700000000);
    }

    #[test]
    fn test_into_token_pair_falls_back_to_expires_in() {
        let pair = response(r#"{"access_token":"a","refresh_token":"r","expires_in":3600}"#)
            .into_token_pair(None, 1000)
            .unwrap();
        assert_eq!(pair.expires, 4600);
    }

    #[test]
    fn test_into_token_pair_keeps_previous_refresh_token() {
        let previous = SecretString::new("old-refresh".to_string());
        let pair = response(r#"{"access_token":"a","expires":5}"#)
            .into_token_pair(Some(&previous), 0)
            .unwrap();
        assert_eq!(pair.refresh_token.expose_secret(), "old-refresh");
    }

    #[test]
    fn test_into_token_pair_requires_expiry() {
        let result = response(r#"{"access_token":"a","refresh_token":"r"}"#).into_token_pair(None, 0);
        assert!(matches!(
            result,
            Err(TppError::Protocol(ProtocolError::MissingField { .. }))
        ));
    }

    #[test]
    fn test_authorize_request_omits_missing_credentials() {
        let body = serde_json::to_value(AuthorizeRequest {
            client_id: "app",
            username: None,
            password: None,
            scope: "certificate:manage",
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({"client_id": "app", "scope": "certificate:manage"})
        );
    }

    #[test]
    fn test_token_response_debug_redacts() {
        let debug = format!(
            "{:?}",
            response(r#"{"access_token":"top-secret","refresh_token":"also-secret","expires":1}"#)
        );
        assert!(!debug.contains("top-secret"));
        assert!(!debug.contains("also-secret"));
    }
}
