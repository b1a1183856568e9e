use std::time::Duration;

use tracing::debug;

use crate::config::configuration::Configuration;
use crate::error::ConfigurationError;
use crate::resilience::backoff::BackoffSettings;

/// ================================
/// Configuration keys
/// ================================
pub const VAULT_ADDRESS_URI: &str = "vault.address.uri";
pub const VAULT_ADDRESS_PATH: &str = "vault.address.path";
pub const VAULT_TOKEN: &str = "vault.token";
pub const VAULT_SERVICE_ACCOUNT: &str = "vault.service-account";
pub const VAULT_BACKOFF_INITIAL: &str = "vault.backoff.initial";
pub const VAULT_BACKOFF_MAX: &str = "vault.backoff.max";
pub const VAULT_BACKOFF_MULTIPLIER: &str = "vault.backoff.multiplier";
pub const VAULT_BACKOFF_RANDOMIZATION_FACTOR: &str = "vault.backoff.randomization-factor";

pub const DEFAULT_ADDRESS_PATH: &str = "v1/gcp/token/";
pub const DEFAULT_BACKOFF_INITIAL_MS: i64 = 100;
pub const DEFAULT_BACKOFF_MAX_ELAPSED_MS: i64 = 10_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_BACKOFF_RANDOMIZATION_FACTOR: f64 = 0.1;

/// ================================
/// Resolved provider settings
/// ================================
/// Extracted from the host configuration once, at attach time, and
/// immutable afterwards. Reattaching a configuration resolves a new
/// value.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Base URI of the secrets backend, ending with exactly one `/`.
    pub address_uri: String,
    /// Path fragment between the base URI and the service account.
    pub secret_path: String,
    pub service_account: String,
    /// Authentication token for the secrets backend itself.
    pub vault_token: String,
    pub backoff: BackoffSettings,
}

impl VaultConfig {
    /// Pure read of the injected configuration. Missing required keys
    /// and unusable numeric values fail here, before any request is
    /// built.
    pub fn resolve(conf: &Configuration) -> Result<Self, ConfigurationError> {
        let mut address_uri = required(conf, VAULT_ADDRESS_URI)?;
        if !address_uri.ends_with('/') {
            address_uri.push('/');
        }
        let vault_token = required(conf, VAULT_TOKEN)?;
        let service_account = required(conf, VAULT_SERVICE_ACCOUNT)?;
        let secret_path = conf.get_or(VAULT_ADDRESS_PATH, DEFAULT_ADDRESS_PATH);

        let initial_ms = positive_millis(conf, VAULT_BACKOFF_INITIAL, DEFAULT_BACKOFF_INITIAL_MS)?;
        let max_elapsed_ms = positive_millis(conf, VAULT_BACKOFF_MAX, DEFAULT_BACKOFF_MAX_ELAPSED_MS)?;
        let multiplier = conf.get_f64(VAULT_BACKOFF_MULTIPLIER, DEFAULT_BACKOFF_MULTIPLIER)?;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(invalid(
                VAULT_BACKOFF_MULTIPLIER,
                multiplier,
                "must be a finite number >= 1.0",
            ));
        }
        let randomization_factor =
            conf.get_f64(VAULT_BACKOFF_RANDOMIZATION_FACTOR, DEFAULT_BACKOFF_RANDOMIZATION_FACTOR)?;
        if !(0.0..1.0).contains(&randomization_factor) {
            return Err(invalid(
                VAULT_BACKOFF_RANDOMIZATION_FACTOR,
                randomization_factor,
                "must be in [0.0, 1.0)",
            ));
        }

        debug!(
            "resolved vault config: base '{}', path '{}', service account '{}'",
            address_uri, secret_path, service_account
        );

        Ok(Self {
            address_uri,
            secret_path,
            service_account,
            vault_token,
            backoff: BackoffSettings {
                initial_interval: Duration::from_millis(initial_ms),
                max_elapsed: Duration::from_millis(max_elapsed_ms),
                multiplier,
                randomization_factor,
            },
        })
    }

    /// Request target: base URI, secret path and service account,
    /// concatenated verbatim.
    pub fn token_url(&self) -> String {
        format!("{}{}{}", self.address_uri, self.secret_path, self.service_account)
    }
}

fn required(conf: &Configuration, key: &str) -> Result<String, ConfigurationError> {
    conf.get(key)
        .map(str::to_owned)
        .ok_or_else(|| ConfigurationError::MissingKey(key.to_owned()))
}

fn positive_millis(conf: &Configuration, key: &str, default: i64) -> Result<u64, ConfigurationError> {
    let millis = conf.get_i64(key, default)?;
    if millis <= 0 {
        return Err(ConfigurationError::InvalidValue {
            key: key.to_owned(),
            value: millis.to_string(),
            reason: "must be a positive number of milliseconds".to_owned(),
        });
    }
    Ok(millis as u64)
}

fn invalid(key: &str, value: f64, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        key: key.to_owned(),
        value: value.to_string(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_conf() -> Configuration {
        Configuration::new()
            .with(VAULT_ADDRESS_URI, "https://vault.example.com")
            .with(VAULT_TOKEN, "s.abc123")
            .with(VAULT_SERVICE_ACCOUNT, "svc1")
    }

    #[test]
    fn url_uses_default_path_and_appends_slash_to_base() {
        let cfg = VaultConfig::resolve(&minimal_conf()).unwrap();
        assert_eq!(cfg.token_url(), "https://vault.example.com/v1/gcp/token/svc1");
    }

    #[test]
    fn base_with_trailing_slash_is_not_doubled() {
        let mut conf = minimal_conf();
        conf.set(VAULT_ADDRESS_URI, "https://vault.example.com/");
        let cfg = VaultConfig::resolve(&conf).unwrap();
        assert_eq!(cfg.token_url(), "https://vault.example.com/v1/gcp/token/svc1");
    }

    #[test]
    fn missing_required_keys_fail_fast() {
        for key in [VAULT_ADDRESS_URI, VAULT_TOKEN, VAULT_SERVICE_ACCOUNT] {
            let mut conf = Configuration::new();
            for other in [VAULT_ADDRESS_URI, VAULT_TOKEN, VAULT_SERVICE_ACCOUNT] {
                if other != key {
                    conf.set(other, "value");
                }
            }
            match VaultConfig::resolve(&conf) {
                Err(ConfigurationError::MissingKey(missing)) => assert_eq!(missing, key),
                other => panic!("expected MissingKey for '{key}', got {other:?}"),
            }
        }
    }

    #[test]
    fn backoff_defaults_match_the_documented_values() {
        let cfg = VaultConfig::resolve(&minimal_conf()).unwrap();
        assert_eq!(cfg.backoff.initial_interval, Duration::from_millis(100));
        assert_eq!(cfg.backoff.max_elapsed, Duration::from_millis(10_000));
        assert_eq!(cfg.backoff.multiplier, 2.0);
        assert_eq!(cfg.backoff.randomization_factor, 0.1);
    }

    #[test]
    fn backoff_overrides_are_honored() {
        let conf = minimal_conf()
            .with(VAULT_ADDRESS_PATH, "v1/custom/")
            .with(VAULT_BACKOFF_INITIAL, "50")
            .with(VAULT_BACKOFF_MAX, "2000")
            .with(VAULT_BACKOFF_MULTIPLIER, "3.0")
            .with(VAULT_BACKOFF_RANDOMIZATION_FACTOR, "0");

        let cfg = VaultConfig::resolve(&conf).unwrap();
        assert_eq!(cfg.token_url(), "https://vault.example.com/v1/custom/svc1");
        assert_eq!(cfg.backoff.initial_interval, Duration::from_millis(50));
        assert_eq!(cfg.backoff.max_elapsed, Duration::from_millis(2000));
        assert_eq!(cfg.backoff.multiplier, 3.0);
        assert_eq!(cfg.backoff.randomization_factor, 0.0);
    }

    #[test]
    fn out_of_range_backoff_values_are_rejected() {
        let cases = [
            (VAULT_BACKOFF_INITIAL, "0"),
            (VAULT_BACKOFF_MAX, "-1"),
            (VAULT_BACKOFF_MULTIPLIER, "0.5"),
            (VAULT_BACKOFF_MULTIPLIER, "NaN"),
            (VAULT_BACKOFF_MULTIPLIER, "inf"),
            (VAULT_BACKOFF_RANDOMIZATION_FACTOR, "1.0"),
            (VAULT_BACKOFF_RANDOMIZATION_FACTOR, "NaN"),
        ];
        for (key, value) in cases {
            let conf = minimal_conf().with(key, value);
            match VaultConfig::resolve(&conf) {
                Err(ConfigurationError::InvalidValue { key: k, .. }) => assert_eq!(k, key),
                other => panic!("expected InvalidValue for '{key}={value}', got {other:?}"),
            }
        }
    }
}
