//! Authentication
//!
//! Authentication methods, the TPP client and the token authenticator that
//! drives the method cascade.

pub mod authenticator;
pub mod method;
pub mod tpp;

pub use authenticator::{
    create_mock_authenticator, DefaultTokenAuthenticator, MockTokenAuthenticator,
    TokenAuthenticator,
};
pub use method::AuthMethod;
pub use tpp::{create_mock_tpp_api, normalize_base_url, MockTppApi, TppApi, TppClient};
