//! Builders
//!
//! Fluent builder patterns for authenticator configuration.

pub mod config;

pub use config::{authenticator_config, AuthenticatorConfigBuilder};
