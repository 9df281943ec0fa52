//! Integration tests against a mock TPP server.

mod integration;
