//! Configuration Builder
//!
//! Fluent builder for authenticator configuration.

use std::time::Duration;

use crate::error::{ConfigurationError, TppError};
use crate::types::{
    AuthenticatorConfig, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_SCOPE, DEFAULT_TIMEOUT,
};

/// Authenticator configuration builder.
#[derive(Default)]
pub struct AuthenticatorConfigBuilder {
    timeout: Option<Duration>,
    max_response_size: Option<usize>,
    scope: Option<String>,
    user_agent: Option<String>,
}

impl AuthenticatorConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set maximum response size in bytes.
    pub fn max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = Some(size);
        self
    }

    /// Set the scope requested on certificate and password authorization.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the authenticator configuration.
    pub fn build(self) -> Result<AuthenticatorConfig, TppError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(TppError::Configuration(ConfigurationError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            }));
        }

        let max_response_size = self.max_response_size.unwrap_or(DEFAULT_MAX_RESPONSE_SIZE);
        if max_response_size == 0 {
            return Err(TppError::Configuration(ConfigurationError::InvalidConfig {
                message: "max_response_size must be greater than zero".to_string(),
            }));
        }

        let scope = self.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string());
        if scope.trim().is_empty() {
            return Err(TppError::Configuration(ConfigurationError::MissingRequired {
                field: "scope".to_string(),
            }));
        }

        let defaults = AuthenticatorConfig::default();

        Ok(AuthenticatorConfig {
            timeout,
            max_response_size,
            scope,
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        })
    }
}

/// Create a new authenticator configuration builder.
pub fn authenticator_config() -> AuthenticatorConfigBuilder {
    AuthenticatorConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = authenticator_config().build().unwrap();

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_response_size, 1048576);
        assert_eq!(config.scope, "certificate:manage,revoke");
        assert!(config.user_agent.starts_with("tpp-token-integration/"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = authenticator_config()
            .timeout(Duration::from_secs(5))
            .scope("certificate:manage")
            .user_agent("custom/1.0")
            .build()
            .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.scope, "certificate:manage");
        assert_eq!(config.user_agent, "custom/1.0");
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = authenticator_config().timeout(Duration::ZERO).build();
        assert!(matches!(
            result,
            Err(TppError::Configuration(ConfigurationError::InvalidConfig { .. }))
        ));
    }

    #[test]
    fn test_builder_rejects_blank_scope() {
        let result = authenticator_config().scope("  ").build();
        assert!(result.is_err());
    }
}
