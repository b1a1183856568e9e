use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

/// Registered under the `vault_token` namespace. The registry is
/// public so a host can mount it on its own metrics endpoint.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Fetch metrics
    pub fetch_requests: IntCounter,
    pub fetch_retries: IntCounter,
    pub fetch_failures: IntCounterVec,
    pub fetch_duration: Histogram,

    // Cache metrics
    pub token_refreshes: IntCounter,
    pub token_expiry_unix: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("vault_token".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            fetch_requests: IntCounter::new("fetch_requests_total", "Token fetches started").unwrap(),
            fetch_retries: IntCounter::new("fetch_retries_total", "Transient failures retried").unwrap(),
            fetch_failures: IntCounterVec::new(Opts::new("fetch_failures_total", "Terminal fetch failures by reason"), &["reason"]).unwrap(),
            fetch_duration: Histogram::with_opts(HistogramOpts::new("fetch_duration_seconds", "Fetch duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])).unwrap(),

            token_refreshes: IntCounter::new("token_refresh_total", "Explicit token refreshes").unwrap(),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry of the most recently fetched token").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.fetch_requests.clone())).unwrap();
        reg.register(Box::new(metrics.fetch_retries.clone())).unwrap();
        reg.register(Box::new(metrics.fetch_failures.clone())).unwrap();
        reg.register(Box::new(metrics.fetch_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_refreshes.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();

        metrics
    }
}
