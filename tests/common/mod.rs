//! Common test infrastructure
//!
//! This module provides the infrastructure for end-to-end tests: an isolated
//! server per test, a stub media gateway, and a thin HTTP client. Tests
//! should only import from this module, not from internal submodules.

mod client;
mod gateway;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use gateway::TestGateway;
pub use server::TestServer;
