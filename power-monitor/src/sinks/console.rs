use std::io::Write;

use time::{macros::format_description, OffsetDateTime};

use crate::pipeline::{EventSink, PollEvent};

/// Prints one timestamped line per poll cycle to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

pub fn render_event(event: &PollEvent, at: OffsetDateTime) -> String {
    let stamp = at
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| at.unix_timestamp().to_string());

    match event {
        PollEvent::NewData { reading, sleep } => format!(
            "[{stamp}] {} W ({:.3} kW) | {} | updated {} | next poll in {:.1}s",
            reading.power_watts,
            reading.power_kw,
            reading.appliance_name,
            reading.updated_at,
            sleep.as_secs_f64()
        ),
        PollEvent::Stale {
            reading,
            backoff_count,
            sleep,
        } => format!(
            "[{stamp}] waiting for new data (last {} W at {}) | backoff #{backoff_count}, retry in {:.1}s",
            reading.power_watts,
            reading.updated_at,
            sleep.as_secs_f64()
        ),
        PollEvent::Error { error, .. } if error.is_fatal() => {
            format!("[{stamp}] error ({}): {error} | stopping", error.kind())
        }
        PollEvent::Error {
            error,
            backoff_count: None,
            sleep,
        } => format!(
            "[{stamp}] error ({}): {error} | no reading yet, retry in {:.1}s",
            error.kind(),
            sleep.as_secs_f64()
        ),
        PollEvent::Error {
            error,
            backoff_count: Some(n),
            sleep,
        } => format!(
            "[{stamp}] error ({}): {error} | backoff #{n}, retry in {:.1}s",
            error.kind(),
            sleep.as_secs_f64()
        ),
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: &PollEvent) {
        let line = render_event(event, OffsetDateTime::now_utc());
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "failed to write to stdout");
        }
    }
}
