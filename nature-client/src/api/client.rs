use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;

use super::rate_limit::RateLimitInfo;
use crate::domain::{appliance::EchonetAppliancesResponse, Appliance, Device, EchonetAppliance};

pub const DEFAULT_BASE_URL: &str = "https://api.nature.global";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(300);

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("authentication failed (HTTP 401), check the access token")]
    Unauthorized,
    #[error("rate limit exceeded even after retry")]
    RateLimited,
    #[error("HTTP error {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Everything except bad credentials is worth polling again.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ApiError::Unauthorized)
    }
}

/// Blocking client for the Nature Remo Cloud API.
///
/// A 429 response is retried exactly once, after waiting until the advertised
/// `X-Rate-Limit-Reset`. The wait blocks the calling thread.
#[derive(Clone)]
pub struct NatureClient {
    agent: ureq::Agent,
    base_url: String,
    access_token: String,
    default_rate_limit_wait: Duration,
}

impl NatureClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            default_rate_limit_wait: DEFAULT_RATE_LIMIT_WAIT,
        }
    }

    pub fn with_default_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.default_rate_limit_wait = wait;
        self
    }

    pub fn devices(&self) -> Result<Vec<Device>, ApiError> {
        tracing::debug!("fetching devices");
        let devices: Vec<Device> = self.get_json("/1/devices")?;
        tracing::debug!(count = devices.len(), "devices fetched");
        Ok(devices)
    }

    pub fn appliances(&self) -> Result<Vec<Appliance>, ApiError> {
        tracing::debug!("fetching appliances");
        self.get_json("/1/appliances")
    }

    pub fn echonetlite_appliances(&self) -> Result<Vec<EchonetAppliance>, ApiError> {
        let resp: EchonetAppliancesResponse = self.get_json("/1/echonetlite/appliances")?;
        let appliances: Vec<EchonetAppliance> = resp.into();
        tracing::debug!(count = appliances.len(), "ECHONET Lite appliances fetched");
        Ok(appliances)
    }

    /// Look up one ECHONET appliance by id. `Ok(None)` when it is not listed.
    pub fn echonetlite_appliance(&self, appliance_id: &str) -> Result<Option<EchonetAppliance>, ApiError> {
        Ok(self
            .echonetlite_appliances()?
            .into_iter()
            .find(|a| a.id == appliance_id))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let result = match self.call(&url) {
            Err(ureq::Error::Status(429, resp)) => {
                let info = RateLimitInfo::from_response(&resp);
                let wait = info.wait_duration(now_epoch(), self.default_rate_limit_wait);
                tracing::warn!(
                    path,
                    wait_secs = wait.as_secs(),
                    reset = ?info.reset_epoch,
                    "rate limit exceeded, waiting before retry"
                );
                if !wait.is_zero() {
                    std::thread::sleep(wait);
                }
                self.call(&url)
            }
            other => other,
        };

        match result {
            Ok(resp) => {
                let info = RateLimitInfo::from_response(&resp);
                if let Some(limit) = info.limit {
                    tracing::debug!(
                        limit,
                        remaining = ?info.remaining,
                        reset = ?info.reset_epoch,
                        "rate limit status"
                    );
                }
                resp.into_json::<T>().map_err(|e| ApiError::Decode(e.to_string()))
            }
            Err(ureq::Error::Status(401, _)) => {
                tracing::error!(path, "authentication failed, check your access token");
                Err(ApiError::Unauthorized)
            }
            Err(ureq::Error::Status(429, _)) => {
                tracing::error!(path, "rate limit exceeded even after retry");
                Err(ApiError::RateLimited)
            }
            Err(ureq::Error::Status(code, _)) => {
                tracing::error!(path, status = code, "HTTP error");
                Err(ApiError::Status(code))
            }
            Err(ureq::Error::Transport(t)) => {
                tracing::error!(path, error = %t, "request failed");
                Err(ApiError::Transport(t.to_string()))
            }
        }
    }

    fn call(&self, url: &str) -> Result<ureq::Response, ureq::Error> {
        self.agent
            .get(url)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Accept", "application/json")
            .call()
    }
}

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
