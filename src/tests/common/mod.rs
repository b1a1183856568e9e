// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::routing::get;
use http::StatusCode;

use crate::config::configuration::Configuration;
use crate::config::vault::{
    VAULT_ADDRESS_URI, VAULT_BACKOFF_INITIAL, VAULT_BACKOFF_MAX,
    VAULT_BACKOFF_RANDOMIZATION_FACTOR, VAULT_SERVICE_ACCOUNT, VAULT_TOKEN,
};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Configuration pointing at a local mock backend, with a small
/// deterministic backoff budget so exhaustion scenarios stay fast.
pub fn test_configuration(base_url: &str) -> Configuration {
    Configuration::new()
        .with(VAULT_ADDRESS_URI, base_url)
        .with(VAULT_TOKEN, "s.test-token")
        .with(VAULT_SERVICE_ACCOUNT, "svc1")
        .with(VAULT_BACKOFF_INITIAL, "20")
        .with(VAULT_BACKOFF_MAX, "500")
        .with(VAULT_BACKOFF_RANDOMIZATION_FACTOR, "0")
}

/// Router for the token endpoint that answers 503 for the first
/// `failures` requests and 200 with `body` afterwards. The returned
/// counter records every hit.
pub fn flaky_token_router(
    path: &str,
    failures: usize,
    body: serde_json::Value,
) -> (Router, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();
    let router = Router::new().route(
        path,
        get(move || {
            let c = counter_clone.clone();
            let body = body.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    (StatusCode::SERVICE_UNAVAILABLE, "transient".to_owned())
                } else {
                    (StatusCode::OK, body.to_string())
                }
            }
        }),
    );
    (router, counter)
}

/// Install a compact subscriber once so failing tests print the
/// provider's own logs.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
