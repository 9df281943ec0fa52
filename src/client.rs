//! TPP Credential Client
//!
//! Wires the reqwest-backed TPP client, the token authenticator and a
//! credential store into one controller.

use std::sync::Arc;

use crate::auth::{DefaultTokenAuthenticator, TppClient};
use crate::controller::{CredentialController, CredentialStore, InMemoryCredentialStore};
use crate::core::ReqwestTransportFactory;
use crate::types::AuthenticatorConfig;

/// Authenticator talking to a real TPP server.
pub type TppAuthenticator = DefaultTokenAuthenticator<TppClient<ReqwestTransportFactory>>;

/// Controller talking to a real TPP server.
pub type TppCredentialController<S = InMemoryCredentialStore> =
    CredentialController<TppAuthenticator, S>;

/// Create a controller over `store` using the reqwest transport.
pub fn tpp_controller<S: CredentialStore>(
    config: AuthenticatorConfig,
    store: Arc<S>,
) -> TppCredentialController<S> {
    let api = Arc::new(TppClient::new(config));
    CredentialController::new(Arc::new(DefaultTokenAuthenticator::new(api)), store)
}

/// Create a controller with an in-memory store.
pub fn in_memory_controller(config: AuthenticatorConfig) -> TppCredentialController {
    tpp_controller(config, Arc::new(InMemoryCredentialStore::new()))
}
