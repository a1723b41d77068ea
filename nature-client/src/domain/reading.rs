use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime, PrimitiveDateTime};

/// One instantaneous power sample taken from a smart meter.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub power_watts: i64,
    pub power_kw: f64,
    pub appliance_id: String,
    pub appliance_name: String,
    /// Provider-supplied timestamp, kept verbatim for staleness comparison.
    pub updated_at: String,
}

impl Reading {
    pub fn new(
        power_watts: i64,
        appliance_id: impl Into<String>,
        appliance_name: impl Into<String>,
        updated_at: impl Into<String>,
    ) -> Self {
        Self {
            power_watts,
            power_kw: power_watts as f64 / 1000.0,
            appliance_id: appliance_id.into(),
            appliance_name: appliance_name.into(),
            updated_at: updated_at.into(),
        }
    }
}

/// Parse a provider timestamp.
///
/// Accepts RFC 3339 (`2024-05-01T12:34:56Z`, offsets, fractional seconds) and
/// falls back to a zone-less `YYYY-MM-DDTHH:MM:SS`, read as UTC.
pub fn parse_provider_timestamp(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(ts);
    }

    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    PrimitiveDateTime::parse(s, naive)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}
