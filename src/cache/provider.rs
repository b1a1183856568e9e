use reqwest::Client;
use tokio::sync::Mutex;
use tracing::info;

use crate::cache::token::AccessToken;
use crate::config::configuration::Configuration;
use crate::config::vault::VaultConfig;
use crate::error::{ConfigurationError, TokenRetrievalError};
use crate::observability::metrics::get_metrics;
use crate::sources::vault::TokenFetcher;

/// Seam between the host and a token supplier: return the current
/// token, fetching lazily when none is cached, or force a refresh.
pub trait AccessTokenSource {
    fn access_token(
        &self,
    ) -> impl std::future::Future<Output = Result<AccessToken, TokenRetrievalError>> + Send;

    fn refresh(&self) -> impl std::future::Future<Output = Result<(), TokenRetrievalError>> + Send;
}

/// Caching provider over the Vault token endpoint.
///
/// One token slot guarded by an async lock that is held across the
/// fetch: concurrent calls on an empty cache perform exactly one
/// network fetch and every caller observes its result. `access_token`
/// never refetches on its own; replacing a stale token is the host's
/// explicit `refresh`.
#[derive(Debug)]
pub struct VaultTokenProvider {
    conf: Configuration,
    fetcher: TokenFetcher,
    current: Mutex<Option<AccessToken>>,
}

impl VaultTokenProvider {
    /// Resolves the configuration eagerly and builds the HTTP client
    /// shared by all fetches of this provider.
    pub fn new(conf: Configuration) -> Result<Self, ConfigurationError> {
        let client = Client::builder().build().expect("Failed to build HTTP client");
        Self::with_http_client(conf, client)
    }

    /// Same as [`VaultTokenProvider::new`] with a caller-supplied
    /// client.
    pub fn with_http_client(conf: Configuration, client: Client) -> Result<Self, ConfigurationError> {
        let vault = VaultConfig::resolve(&conf)?;
        Ok(Self {
            conf,
            fetcher: TokenFetcher::new(vault, client),
            current: Mutex::new(None),
        })
    }

    /// Re-resolves settings from a new configuration. The HTTP client
    /// and any cached token are kept; only subsequent fetches see the
    /// new settings.
    pub fn reconfigure(&mut self, conf: Configuration) -> Result<(), ConfigurationError> {
        let vault = VaultConfig::resolve(&conf)?;
        self.fetcher = TokenFetcher::new(vault, self.fetcher.client.clone());
        self.conf = conf;
        Ok(())
    }

    /// The configuration last attached to this provider.
    pub fn configuration(&self) -> &Configuration {
        &self.conf
    }
}

impl AccessTokenSource for VaultTokenProvider {
    async fn access_token(&self) -> Result<AccessToken, TokenRetrievalError> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref() {
            return Ok(token.clone());
        }

        // Failure leaves the slot empty, so a later call can try again.
        let token = self.fetcher.retrieve_token().await?;
        *current = Some(token.clone());
        Ok(token)
    }

    async fn refresh(&self) -> Result<(), TokenRetrievalError> {
        let mut current = self.current.lock().await;
        let token = self.fetcher.retrieve_token().await?;

        let metrics = get_metrics().await;
        metrics.token_refreshes.inc();
        info!("token refreshed, new expiration {}", token.expiration_time_millis);
        *current = Some(token);
        Ok(())
    }
}
