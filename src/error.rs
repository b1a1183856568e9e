use thiserror::Error;

/// Raised while resolving provider settings. Nothing in this enum
/// involves the network; a configuration problem fails fast.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// A key with no default is absent from the configuration.
    #[error("required configuration key '{0}' is not set")]
    MissingKey(String),

    #[error("configuration key '{key}' has invalid value '{value}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// A YAML configuration source could not be read or parsed.
    #[error("malformed configuration source: {0}")]
    Malformed(String),
}

/// One failed exchange with the secrets backend. These are absorbed by
/// the backoff loop and only escape as the cause inside
/// [`TokenRetrievalError::BudgetExhausted`].
#[derive(Error, Debug)]
pub enum TransientRequestError {
    /// The backend answered with a non-success status.
    #[error("secrets backend answered {0}")]
    Status(http::StatusCode),

    /// The request produced no response at all.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl TransientRequestError {
    /// Stable label for the failure-reason metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            TransientRequestError::Status(_) => "status",
            TransientRequestError::Transport(_) => "transport",
        }
    }
}

/// Terminal outcome of a token fetch, surfaced to the host.
#[derive(Error, Debug)]
pub enum TokenRetrievalError {
    /// Every attempt failed and the backoff budget ran out.
    #[error("token retrieval gave up after {attempts} attempts: {last}")]
    BudgetExhausted {
        attempts: u32,
        #[source]
        last: TransientRequestError,
    },

    /// The backend answered with success but the body is not a usable
    /// token. Retrying cannot help here, so the fetch fails immediately.
    #[error("unexpected response from secrets backend: {0}")]
    UnexpectedResponse(String),
}
