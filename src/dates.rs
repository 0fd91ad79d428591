use chrono::{DateTime, Utc};

/// Parse a catalog "added at" timestamp (`2021-03-04T05:06:07Z`).
pub fn parse_added_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render a date as "4 of March, 2021".
pub fn format_pretty_date(dt: &DateTime<Utc>) -> String {
    dt.format("%-d of %B, %Y").to_string()
}

/// Whole days from `start` to `end`, rounded toward negative infinity.
pub fn days_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> i64 {
    (*end - *start).num_seconds().div_euclid(86_400)
}
