use anyhow::Context;
use chrono::{DateTime, Utc};
use sarwatch_core::json::normalize_numbers;
use sarwatch_core::models::timestamp;
use sarwatch_core::Event;
use serde::Serialize;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Pretty JSON with catalog numbers normalized.
pub fn to_pretty_json(value: &impl Serialize) -> anyhow::Result<String> {
    let value = serde_json::to_value(value).context("Serialize output")?;
    serde_json::to_string_pretty(&normalize_numbers(value)).context("Serialize output")
}

pub fn parse_time(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    timestamp::parse(raw).with_context(|| format!("Invalid timestamp '{}'", raw))
}

/// Build an event record from command-line arguments.
pub fn build_event(
    event_id: &str,
    start: &str,
    end: Option<&str>,
    wkt: Option<String>,
) -> anyhow::Result<Event> {
    if event_id.trim().is_empty() {
        anyhow::bail!("Event id must not be empty");
    }

    let mut event = Event::new(event_id, parse_time(start)?);
    if let Some(end) = end {
        let end = parse_time(end)?;
        if end < event.processing_timeframe.start {
            anyhow::bail!("End of the processing timeframe is before its start");
        }
        event.processing_timeframe.end = Some(end);
    }
    event.wkt = wkt;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn build_event_with_open_end() {
        let event = build_event("quake", "2021-08-14T12:29:00Z", None, None).unwrap();
        assert_eq!(
            event.processing_timeframe.start,
            Utc.with_ymd_and_hms(2021, 8, 14, 12, 29, 0).unwrap()
        );
        assert!(event.processing_timeframe.end.is_none());
        assert!(event.wkt.is_none());
    }

    #[test]
    fn build_event_rejects_reversed_timeframe() {
        let err = build_event(
            "quake",
            "2021-08-14T00:00:00",
            Some("2021-08-01T00:00:00"),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("before its start"));
    }

    #[test]
    fn build_event_rejects_bad_time() {
        assert!(build_event("quake", "yesterday", None, None).is_err());
        assert!(build_event("  ", "2021-08-14T00:00:00", None, None).is_err());
    }

    #[test]
    fn pretty_json_normalizes_numbers() {
        let out = to_pretty_json(&serde_json::json!({"a": 3.0, "b": 0.5})).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(value["a"].is_i64());
        assert!(value["b"].is_f64());
    }
}
