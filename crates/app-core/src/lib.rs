//! Shared infrastructure for the service: configuration, error handling,
//! principal model, provider verification, session tokens, and the
//! authentication gatekeeper.

pub mod config;
pub mod error;
pub mod middleware;
pub mod oauth;
pub mod principal;
pub mod session;
