//! # Vault Token Provider
//!
//! Fetches short-lived GCP access tokens from a Vault secrets backend,
//! caches the latest token in memory, and replaces it on explicit
//! refresh.
//!
//! Modules:
//! - `config` — generic key/value configuration and the resolved vault settings
//! - `resilience` — exponential backoff policy for transient failures
//! - `sources` — the HTTP exchange with the secrets backend
//! - `cache` — access token value and the caching provider

pub mod config;
pub mod cache;
pub mod sources;
pub mod resilience;
pub mod error;
pub mod observability;
pub mod helpers;

#[cfg(test)]
pub mod tests;

pub use crate::cache::provider::{AccessTokenSource, VaultTokenProvider};
pub use crate::cache::token::AccessToken;
pub use crate::config::configuration::Configuration;
pub use crate::config::vault::VaultConfig;
pub use crate::error::{ConfigurationError, TokenRetrievalError, TransientRequestError};
