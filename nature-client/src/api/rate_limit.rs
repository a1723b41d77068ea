use std::time::Duration;

pub const LIMIT_HEADER: &str = "X-Rate-Limit-Limit";
pub const REMAINING_HEADER: &str = "X-Rate-Limit-Remaining";
pub const RESET_HEADER: &str = "X-Rate-Limit-Reset";

/// Rate limit headers of a single response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    /// Unix epoch seconds at which the window resets.
    pub reset_epoch: Option<i64>,
}

impl RateLimitInfo {
    pub fn from_headers<'a, F>(header: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        Self {
            limit: header(LIMIT_HEADER).and_then(|v| v.trim().parse().ok()),
            remaining: header(REMAINING_HEADER).and_then(|v| v.trim().parse().ok()),
            reset_epoch: header(RESET_HEADER).and_then(|v| v.trim().parse().ok()),
        }
    }

    pub fn from_response(resp: &ureq::Response) -> Self {
        Self::from_headers(|name| resp.header(name))
    }

    /// How long to wait before retrying a rate-limited request.
    ///
    /// `max(0, reset - now)`; when no reset is advertised the whole
    /// `default_window` is waited.
    pub fn wait_duration(&self, now_epoch: i64, default_window: Duration) -> Duration {
        match self.reset_epoch {
            Some(reset) => Duration::from_secs(reset.saturating_sub(now_epoch).max(0) as u64),
            None => default_window,
        }
    }
}
