use chrono::{DateTime, SecondsFormat, Utc};

pub mod patient;
pub mod health_metric;
pub mod prediction;

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that string
/// ordering in SQL matches chronological ordering.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp back into UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}
