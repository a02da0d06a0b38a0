//! Data-age policy: which station measurements are still usable

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use super::StationReading;
use super::client::StationDocument;

/// Locate `phenomenon` among the station's sensor channels (case-sensitive
/// exact title match) and pull its last measurement.
///
/// Absence of the channel, the measurement, or a parseable value/timestamp
/// is not an error; the station simply contributes nothing.
pub fn extract_reading(document: &StationDocument, phenomenon: &str) -> Option<StationReading> {
    let sensor = document.sensors.iter().find(|s| s.title == phenomenon)?;
    let measurement = sensor.last_measurement.as_ref()?;

    let raw_value = measurement.value.as_deref()?;
    let value = match raw_value.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            debug!(phenomenon, raw_value, "Measurement value is not numeric");
            return None;
        }
    };

    let raw_timestamp = measurement.created_at.as_deref()?;
    let observed_at = match parse_timestamp(raw_timestamp) {
        Some(ts) => ts,
        None => {
            debug!(phenomenon, raw_timestamp, "Measurement timestamp is unparseable");
            return None;
        }
    };

    Some(StationReading { value, observed_at })
}

/// Parse the API's ISO 8601 timestamps. The upstream emits both the `Z`
/// suffix and the explicit `+00:00` offset form; both are accepted.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// True iff the reading is no older than `max_age_seconds`. The boundary is
/// inclusive: a reading exactly `max_age_seconds` old is still fresh.
pub fn is_fresh(observed_at: DateTime<Utc>, now: DateTime<Utc>, max_age_seconds: u64) -> bool {
    now.signed_duration_since(observed_at) <= TimeDelta::seconds(max_age_seconds as i64)
}
