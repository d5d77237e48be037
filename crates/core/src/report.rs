use chrono::{DateTime, SecondsFormat, Utc};

/// Format the `generated_at` field of a report
///
/// ISO-8601 in UTC with microsecond precision and an explicit `+00:00` offset,
/// e.g. `2025-01-15T10:30:00.123456+00:00`.
pub fn generated_at(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, false)
}
