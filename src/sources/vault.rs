use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::cache::token::AccessToken;
use crate::config::vault::VaultConfig;
use crate::error::{TokenRetrievalError, TransientRequestError};
use crate::helpers::time::{get_instant, now_millis};
use crate::observability::metrics::get_metrics;
use crate::resilience::backoff::ExponentialBackoff;

/// Expiration window applied when the backend response carries no
/// expiration of its own: one hour from issuance.
pub const DEFAULT_TOKEN_EXPIRATION_MS: i64 = 3_600_000;

const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

/// Response envelope of the token endpoint. Everything outside `data`
/// (request id, lease fields) is ignored.
#[derive(Debug, Deserialize)]
struct VaultTokenResponse {
    data: VaultTokenData,
}

#[derive(Debug, Deserialize)]
struct VaultTokenData {
    token: String,
    /// Absolute expiry, epoch seconds.
    expires_at_seconds: Option<i64>,
    /// Relative lifetime, seconds.
    token_ttl: Option<i64>,
}

/// Executes the token exchange with the secrets backend. Owns the
/// HTTP client shared by all fetches of one provider; every
/// `retrieve_token` call runs under a freshly constructed backoff
/// policy.
#[derive(Debug, Clone)]
pub struct TokenFetcher {
    pub config: VaultConfig,
    pub client: Client,
}

enum AttemptError {
    Transient(TransientRequestError),
    Fatal(TokenRetrievalError),
}

impl From<TransientRequestError> for AttemptError {
    fn from(e: TransientRequestError) -> Self {
        AttemptError::Transient(e)
    }
}

impl TokenFetcher {
    pub fn new(config: VaultConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// GET the token endpoint, retrying transient failures (transport
    /// errors and non-2xx statuses) until the backoff policy stops.
    /// A success response whose body is not a usable token fails
    /// immediately: the backend answered authoritatively and retrying
    /// cannot change the outcome.
    pub async fn retrieve_token(&self) -> Result<AccessToken, TokenRetrievalError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        let url = self.config.token_url();
        let mut backoff = ExponentialBackoff::new(&self.config.backoff);
        let mut attempts: u32 = 0;

        metrics.fetch_requests.inc();
        loop {
            attempts += 1;
            debug!("requesting token from '{}', attempt {}", url, attempts);

            match self.attempt(&url).await {
                Ok(token) => {
                    metrics.fetch_duration.observe(start.elapsed().as_secs_f64());
                    metrics.token_expiry_unix.set(token.expiration_time_millis / 1000);
                    info!(
                        "fetched token for service account '{}', expires at {}",
                        self.config.service_account, token.expiration_time_millis
                    );
                    return Ok(token);
                }
                Err(AttemptError::Fatal(e)) => {
                    metrics.fetch_duration.observe(start.elapsed().as_secs_f64());
                    metrics.fetch_failures.with_label_values(&["response"]).inc();
                    error!("token response not usable: {e}");
                    return Err(e);
                }
                Err(AttemptError::Transient(e)) => match backoff.next_backoff() {
                    Some(delay) => {
                        metrics.fetch_retries.inc();
                        warn!("attempt {attempts} failed: {e}; retrying in {delay:?}");
                        sleep(delay).await;
                    }
                    None => {
                        metrics.fetch_duration.observe(start.elapsed().as_secs_f64());
                        metrics.fetch_failures.with_label_values(&[e.reason()]).inc();
                        error!("all {attempts} attempts failed, backoff budget exhausted: {e}");
                        return Err(TokenRetrievalError::BudgetExhausted { attempts, last: e });
                    }
                },
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<AccessToken, AttemptError> {
        let response = self
            .client
            .get(url)
            .header(VAULT_TOKEN_HEADER, &self.config.vault_token)
            .send()
            .await
            .map_err(TransientRequestError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Transient(TransientRequestError::Status(status)));
        }

        let body = response
            .text()
            .await
            .map_err(TransientRequestError::Transport)?;
        parse_token_body(&body).map_err(AttemptError::Fatal)
    }
}

/// Derives the expiration in precedence order: absolute expiry from
/// the backend, then relative lifetime, then the fixed one-hour window.
fn parse_token_body(body: &str) -> Result<AccessToken, TokenRetrievalError> {
    let parsed: VaultTokenResponse = serde_json::from_str(body)
        .map_err(|e| TokenRetrievalError::UnexpectedResponse(e.to_string()))?;

    if parsed.data.token.is_empty() {
        return Err(TokenRetrievalError::UnexpectedResponse(
            "empty token in response".to_owned(),
        ));
    }

    let expiration_time_millis = match (parsed.data.expires_at_seconds, parsed.data.token_ttl) {
        (Some(expires_at), _) => expires_at.saturating_mul(1000),
        (None, Some(ttl)) => now_millis().saturating_add(ttl.saturating_mul(1000)),
        (None, None) => now_millis() + DEFAULT_TOKEN_EXPIRATION_MS,
    };

    Ok(AccessToken::new(parsed.data.token, expiration_time_millis))
}
