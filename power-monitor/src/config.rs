use nature_client::NatureClient;
use serde::Deserialize;
use std::{fs, io, time::Duration};

pub const TOKEN_ENV: &str = "NATURE_API_TOKEN";
pub const CONFIG_PATH_ENV: &str = "POWER_MONITOR_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "power-monitor.toml";
const TOKEN_PLACEHOLDER: &str = "your_access_token_here";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
    pub default_rate_limit_wait_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: nature_client::api::DEFAULT_BASE_URL.to_string(),
            access_token: None,
            request_timeout_secs: nature_client::api::DEFAULT_TIMEOUT.as_secs(),
            default_rate_limit_wait_secs: nature_client::api::DEFAULT_RATE_LIMIT_WAIT.as_secs(),
        }
    }
}

/// Timing parameters of the poll scheduler.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// How often the provider refreshes its measurement.
    pub update_interval_secs: f64,
    /// Added on top of the update interval before polling again.
    pub buffer_secs: f64,
    pub backoff_initial_secs: f64,
    pub backoff_multiplier: f64,
    pub backoff_max_secs: f64,
    /// Fixed retry delay used until the first reading arrives.
    pub cold_start_retry_secs: f64,
    pub min_tick_ms: u64,
    pub sleep_slice_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 60.0,
            buffer_secs: 1.0,
            backoff_initial_secs: 5.0,
            backoff_multiplier: 1.5,
            backoff_max_secs: 60.0,
            cold_start_retry_secs: 5.0,
            min_tick_ms: 100,
            sleep_slice_ms: 1_000,
        }
    }
}

impl ScheduleConfig {
    pub fn min_tick(&self) -> Duration {
        Duration::from_millis(self.min_tick_ms)
    }

    pub fn sleep_slice(&self) -> Duration {
        Duration::from_millis(self.sleep_slice_ms.clamp(1, 1_000))
    }

    pub fn cold_start_retry(&self) -> Duration {
        Duration::try_from_secs_f64(self.cold_start_retry_secs).unwrap_or(Duration::from_secs(5))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Pin a specific ECHONET appliance instead of auto-discovering the meter.
    pub appliance_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub schedule: ScheduleConfig,
    pub monitor: MonitorConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from `POWER_MONITOR_CONFIG` (default `power-monitor.toml`).
    ///
    /// A missing default file yields built-in defaults; a missing explicit
    /// file is an error. `NATURE_API_TOKEN` overrides `api.access_token`.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let explicit = env::var(CONFIG_PATH_ENV).ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut cfg = match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound && explicit.is_none() => {
                tracing::debug!(path = %path, "no config file, using defaults");
                AppConfig::default()
            }
            Err(e) => return Err(anyhow::anyhow!("failed to read config {path}: {e}")),
        };

        if let Ok(token) = env::var(TOKEN_ENV) {
            cfg.api.access_token = Some(token);
        }

        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    pub fn build_client(&self) -> anyhow::Result<NatureClient> {
        let client = NatureClient::new(
            self.api.base_url.as_str(),
            self.access_token()?,
            Duration::from_secs(self.api.request_timeout_secs),
        )
        .with_default_rate_limit_wait(Duration::from_secs(self.api.default_rate_limit_wait_secs));
        Ok(client)
    }

    /// The configured bearer token, rejecting blanks and the sample placeholder.
    pub fn access_token(&self) -> anyhow::Result<&str> {
        match self.api.access_token.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() && t != TOKEN_PLACEHOLDER => Ok(t),
            _ => anyhow::bail!("{TOKEN_ENV} is not set (or api.access_token in the config file)"),
        }
    }
}
