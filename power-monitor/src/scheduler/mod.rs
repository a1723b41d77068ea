//! Adaptive poll scheduler.
//!
//! Each cycle fetches one reading and classifies it against [`PollState`]:
//!
//! - new data: resync to the provider's cadence, waking at
//!   `updated_at + update_interval + buffer`;
//! - stale data: exponential backoff, capped;
//! - error: a fixed cold-start retry until the first reading arrives, the
//!   stale backoff afterwards.
//!
//! Every sleep is sliced so a shutdown request is seen within a second.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use nature_client::domain::{parse_provider_timestamp, Reading};

use crate::{
    config::ScheduleConfig,
    pipeline::{EventSink, PollError, PollEvent, ReadingSource},
    shutdown::{Shutdown, SleepOutcome},
};

/// Wall-clock source, in Unix epoch seconds.
pub trait Clock: Send + Sync {
    fn now_epoch(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    New,
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollState {
    pub last_updated_at: Option<String>,
    pub last_updated_epoch: Option<f64>,
    pub backoff_count: u32,
}

impl PollState {
    /// Compares raw timestamp strings; does not touch the state.
    pub fn classify(&self, reading: &Reading) -> Freshness {
        match &self.last_updated_at {
            Some(last) if *last == reading.updated_at => Freshness::Stale,
            _ => Freshness::New,
        }
    }

    pub fn has_reading(&self) -> bool {
        self.last_updated_epoch.is_some()
    }

    fn record_new(&mut self, reading: &Reading, epoch: f64) {
        self.last_updated_at = Some(reading.updated_at.clone());
        self.last_updated_epoch = Some(epoch);
        self.backoff_count = 0;
    }

    fn record_stale(&mut self) -> u32 {
        self.backoff_count = self.backoff_count.saturating_add(1);
        self.backoff_count
    }
}

/// `min(max, initial * multiplier^(count - 1))`.
pub fn backoff_delay(cfg: &ScheduleConfig, backoff_count: u32) -> Duration {
    let max = Duration::try_from_secs_f64(cfg.backoff_max_secs).unwrap_or(Duration::from_secs(60));
    let exp = backoff_count.saturating_sub(1).min(i32::MAX as u32) as i32;
    let secs = cfg.backoff_initial_secs * cfg.backoff_multiplier.powi(exp);
    Duration::try_from_secs_f64(secs.min(cfg.backoff_max_secs))
        .unwrap_or(max)
        .min(max)
}

/// When the provider is next expected to have fresh data.
pub fn next_wake_epoch(cfg: &ScheduleConfig, last_updated_epoch: f64) -> f64 {
    last_updated_epoch + cfg.update_interval_secs + cfg.buffer_secs
}

/// Time left until [`next_wake_epoch`]; the minimal tick once that has passed.
///
/// Never more than one cadence from now, so a future-dated `updated_at`
/// cannot park the loop.
pub fn resync_delay(cfg: &ScheduleConfig, last_updated_epoch: f64, now_epoch: f64) -> Duration {
    let cadence = cfg.update_interval_secs + cfg.buffer_secs;
    let remaining = (next_wake_epoch(cfg, last_updated_epoch) - now_epoch).min(cadence);
    if remaining > 0.0 {
        Duration::try_from_secs_f64(remaining).unwrap_or_else(|_| cfg.min_tick())
    } else {
        cfg.min_tick()
    }
}

pub struct Scheduler<S, K, C = SystemClock> {
    source: S,
    sink: K,
    clock: C,
    config: ScheduleConfig,
    state: PollState,
}

impl<S, K> Scheduler<S, K, SystemClock>
where
    S: ReadingSource,
    K: EventSink,
{
    pub fn new(source: S, sink: K, config: ScheduleConfig) -> Self {
        Self {
            source,
            sink,
            clock: SystemClock,
            config,
            state: PollState::default(),
        }
    }
}

impl<S, K, C> Scheduler<S, K, C>
where
    S: ReadingSource,
    K: EventSink,
    C: Clock,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Scheduler<S, K, C2> {
        Scheduler {
            source: self.source,
            sink: self.sink,
            clock,
            config: self.config,
            state: self.state,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Poll until shutdown. Returns `Err` only for a fatal error.
    pub async fn run(mut self, shutdown: &Shutdown) -> Result<PollState, PollError> {
        tracing::info!("monitoring started");
        let slice = self.config.sleep_slice();

        while !shutdown.is_triggered() {
            let event = match self.poll_once().await {
                Ok(event) => event,
                Err(error) => {
                    self.sink.emit(&PollEvent::Error {
                        error: error.clone(),
                        backoff_count: None,
                        sleep: Duration::ZERO,
                    });
                    return Err(error);
                }
            };
            self.sink.emit(&event);

            if shutdown.sleep_sliced(event.sleep(), slice).await == SleepOutcome::Cancelled {
                break;
            }
        }

        tracing::info!(backoff_count = self.state.backoff_count, "monitoring stopped");
        Ok(self.state)
    }

    /// Run a single fetch-and-classify cycle without sleeping.
    pub async fn poll_once(&mut self) -> Result<PollEvent, PollError> {
        metrics::counter!("poll_cycles_total").increment(1);

        match self.source.fetch_reading().await {
            Ok(reading) => Ok(self.on_reading(reading)),
            Err(e) if e.is_fatal() => {
                metrics::counter!("poll_errors_total", "kind" => e.kind()).increment(1);
                tracing::error!(error = %e, "fatal error, stopping");
                Err(e)
            }
            Err(e) => Ok(self.on_error(e)),
        }
    }

    fn on_reading(&mut self, reading: Reading) -> PollEvent {
        match self.state.classify(&reading) {
            Freshness::New => {
                let now = self.clock.now_epoch();
                let epoch = match parse_provider_timestamp(&reading.updated_at) {
                    Some(ts) => ts.unix_timestamp() as f64 + f64::from(ts.nanosecond()) / 1e9,
                    None => {
                        tracing::warn!(
                            updated_at = %reading.updated_at,
                            "unparsable provider timestamp, scheduling from now"
                        );
                        now
                    }
                };
                self.state.record_new(&reading, epoch);
                let sleep = resync_delay(&self.config, epoch, now);

                metrics::counter!("poll_new_data_total").increment(1);
                metrics::gauge!("meter_power_watts").set(reading.power_watts as f64);
                tracing::debug!(
                    watts = reading.power_watts,
                    updated_at = %reading.updated_at,
                    sleep_ms = sleep.as_millis() as u64,
                    "new reading"
                );

                PollEvent::NewData { reading, sleep }
            }
            Freshness::Stale => {
                let backoff_count = self.state.record_stale();
                let sleep = backoff_delay(&self.config, backoff_count);

                metrics::counter!("poll_stale_total").increment(1);
                tracing::debug!(backoff_count, sleep_ms = sleep.as_millis() as u64, "no new data");

                PollEvent::Stale {
                    reading,
                    backoff_count,
                    sleep,
                }
            }
        }
    }

    fn on_error(&mut self, error: PollError) -> PollEvent {
        metrics::counter!("poll_errors_total", "kind" => error.kind()).increment(1);

        if !self.state.has_reading() {
            let sleep = self.config.cold_start_retry();
            tracing::warn!(error = %error, sleep_ms = sleep.as_millis() as u64, "no reading yet, retrying");
            return PollEvent::Error {
                error,
                backoff_count: None,
                sleep,
            };
        }

        let backoff_count = self.state.record_stale();
        let sleep = backoff_delay(&self.config, backoff_count);
        tracing::warn!(error = %error, backoff_count, sleep_ms = sleep.as_millis() as u64, "poll failed, backing off");
        PollEvent::Error {
            error,
            backoff_count: Some(backoff_count),
            sleep,
        }
    }
}
