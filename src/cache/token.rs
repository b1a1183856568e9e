use std::time::Duration;

/// Access token with its computed expiration.
///
/// Immutable once created: a newer token replaces the value, it is
/// never edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    /// Absolute expiration instant, epoch milliseconds.
    pub expiration_time_millis: i64,
}

impl AccessToken {
    pub fn new(value: String, expiration_time_millis: i64) -> Self {
        Self {
            value,
            expiration_time_millis,
        }
    }

    /// True once `now_millis` has reached the expiration instant.
    /// The provider never checks this itself; staleness handling is
    /// the caller's, via an explicit refresh.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis >= self.expiration_time_millis
    }

    /// True when the token expires within `margin` of `now_millis`.
    pub fn expires_within(&self, now_millis: i64, margin: Duration) -> bool {
        now_millis + margin.as_millis() as i64 >= self.expiration_time_millis
    }
}
