//! Authentication Methods
//!
//! The three ways a new token pair can be obtained, in cascade order.

use crate::types::CredentialState;

/// Credential method used to obtain a new token pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    /// Exchange the stored refresh token.
    RefreshToken,
    /// Authenticate with a PKCS#12 client certificate over mutual TLS.
    ClientCertificate,
    /// Authenticate with username and password.
    UsernamePassword,
}

impl AuthMethod {
    /// Cascade order. Earlier methods win.
    pub const ORDER: [AuthMethod; 3] = [
        AuthMethod::RefreshToken,
        AuthMethod::ClientCertificate,
        AuthMethod::UsernamePassword,
    ];

    /// Check if the state carries every field this method needs.
    pub fn is_configured(&self, state: &CredentialState) -> bool {
        match self {
            Self::RefreshToken => state.has_refresh_token(),
            Self::ClientCertificate => state.has_p12(),
            Self::UsernamePassword => state.has_username_password(),
        }
    }

    /// Configured methods for a state, in cascade order.
    pub fn configured(state: &CredentialState) -> Vec<AuthMethod> {
        Self::ORDER
            .into_iter()
            .filter(|method| method.is_configured(state))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefreshToken => "refresh token",
            Self::ClientCertificate => "client certificate",
            Self::UsernamePassword => "username-password",
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
