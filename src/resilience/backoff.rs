use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::helpers::time::get_instant;

#[derive(Debug, Clone)]
pub struct BackoffSettings {
    /// First wait interval of a sequence.
    pub initial_interval: Duration,
    /// Total wall-clock budget for one retry sequence.
    pub max_elapsed: Duration,
    pub multiplier: f64,
    /// Each emitted interval is perturbed uniformly by this fraction.
    pub randomization_factor: f64,
}

/// Stateful exponential backoff. One instance covers one fetch
/// sequence: the elapsed clock starts at construction and the interval
/// grows on every call, so an independent retrieval needs a fresh
/// instance or a `reset`.
#[derive(Debug)]
pub struct ExponentialBackoff {
    settings: BackoffSettings,
    current_interval: Duration,
    started: Instant,
}

impl ExponentialBackoff {
    pub fn new(settings: &BackoffSettings) -> Self {
        Self {
            current_interval: settings.initial_interval,
            started: get_instant(),
            settings: settings.clone(),
        }
    }

    /// Next wait duration, or `None` once the elapsed budget is spent.
    /// After the first `None` every further call returns `None` until
    /// `reset`.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.started.elapsed() > self.settings.max_elapsed {
            return None;
        }
        let interval = randomize(self.current_interval, self.settings.randomization_factor);
        self.current_interval = Duration::min(
            self.current_interval.mul_f64(self.settings.multiplier),
            self.settings.max_elapsed,
        );
        Some(interval)
    }

    /// Restores the initial interval and restarts the elapsed clock.
    pub fn reset(&mut self) {
        self.current_interval = self.settings.initial_interval;
        self.started = get_instant();
    }
}

fn randomize(interval: Duration, factor: f64) -> Duration {
    if factor == 0.0 {
        return interval;
    }
    let delta = interval.mul_f64(factor);
    let low = interval.saturating_sub(delta);
    let high = interval + delta;
    rand::thread_rng().gen_range(low..=high)
}
