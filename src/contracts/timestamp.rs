use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Accepts the ISO-8601 shapes producers actually emit: RFC 3339, date-time
/// with `T` or space separator (offset optional, `Z` allowed), or a bare date.
pub fn is_iso8601(value: &str) -> bool {
    let s = value.trim();
    if s.is_empty() {
        return false;
    }
    let normalized = match s.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => s.to_string(),
    };

    if DateTime::parse_from_rfc3339(&normalized).is_ok() {
        return true;
    }
    if OFFSET_FORMATS
        .iter()
        .any(|f| DateTime::parse_from_str(&normalized, f).is_ok())
    {
        return true;
    }
    if NAIVE_FORMATS
        .iter()
        .any(|f| NaiveDateTime::parse_from_str(&normalized, f).is_ok())
    {
        return true;
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").is_ok()
}

/// Current wall-clock time as an ISO-8601 string.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
