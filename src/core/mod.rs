//! Core Components
//!
//! HTTP transport, TLS material and the import string codec.

pub mod import;
pub mod tls;
pub mod transport;

pub use import::*;
pub use tls::*;
pub use transport::*;
